//! GraphQL client for the proving hub.
//!
//! The hub accepts an artifact id plus an input file, runs the proof
//! asynchronously and reports status, proof and public instances by job id.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::SpinError,
    types::{ProofHandle, ProofRequest, ProofSnapshot},
};

/// Default hub endpoint.
pub const DEFAULT_HUB_URL: &str = "https://hub-staging.ezkl.xyz/graphql";

/// Remote proving service.
#[async_trait]
pub trait ProofService: Send + Sync {
    /// Start a proof job. Called exactly once per request.
    async fn initiate(&self, request: &ProofRequest) -> Result<ProofHandle, SpinError>;

    /// Fetch the current state of a proof job.
    async fn fetch(&self, handle: &ProofHandle) -> Result<ProofSnapshot, SpinError>;
}

/// Proving hub GraphQL client.
#[derive(Clone, Debug)]
pub struct HubClient {
    /// HTTP client.
    client: reqwest::Client,
    /// GraphQL endpoint URL.
    endpoint: String,
}

impl HubClient {
    /// Create a client with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self, SpinError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SpinError::Submission(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Create a client for a specific URL with a 30 second request timeout.
    pub fn with_url(endpoint: impl Into<String>) -> Result<Self, SpinError> {
        Self::new(endpoint, Duration::from_secs(30))
    }

    /// Get the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute a GraphQL operation and return its `data` object.
    async fn execute(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<serde_json::Value, String> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {}", status, text));
        }

        let envelope: GraphQLResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse JSON: {}", e))?;

        if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(messages.join("; "));
        }

        envelope.data.ok_or_else(|| "response has no data".to_string())
    }
}

#[async_trait]
impl ProofService for HubClient {
    async fn initiate(&self, request: &ProofRequest) -> Result<ProofHandle, SpinError> {
        let mutation = r#"
            mutation($artifactId: String!, $inputFile: String!) {
                initiateProof(artifactId: $artifactId, inputFile: $inputFile) {
                    id
                }
            }
        "#;

        let variables = serde_json::json!({
            "artifactId": request.artifact_id,
            "inputFile": request.input.input_file()?,
        });

        let data = self
            .execute(mutation, variables)
            .await
            .map_err(SpinError::Submission)?;

        let data: InitiateProofData = serde_json::from_value(data)
            .map_err(|e| SpinError::Submission(format!("unexpected response: {}", e)))?;

        debug!(id = %data.initiate_proof.id, "hub accepted proof job");
        Ok(data.initiate_proof)
    }

    async fn fetch(&self, handle: &ProofHandle) -> Result<ProofSnapshot, SpinError> {
        let query = r#"
            query($id: String!) {
                getProof(id: $id) {
                    id
                    status
                    proof
                    instances
                }
            }
        "#;

        let variables = serde_json::json!({ "id": handle.id });

        let data = self
            .execute(query, variables)
            .await
            .map_err(|reason| SpinError::PollFailed {
                id: handle.id.clone(),
                attempts: 1,
                reason,
            })?;

        let data: GetProofData = serde_json::from_value(data)?;
        Ok(data.get_proof)
    }
}

// === Response types ===

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<serde_json::Value>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct InitiateProofData {
    #[serde(rename = "initiateProof")]
    initiate_proof: ProofHandle,
}

#[derive(Debug, Deserialize)]
struct GetProofData {
    #[serde(rename = "getProof")]
    get_proof: ProofSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProofStatus;

    #[test]
    fn test_client_creation() {
        let client = HubClient::with_url(DEFAULT_HUB_URL).unwrap();
        assert_eq!(client.endpoint(), DEFAULT_HUB_URL);
    }

    #[test]
    fn test_get_proof_payload_parses() {
        let data: GetProofData = serde_json::from_value(serde_json::json!({
            "getProof": {
                "id": "job-1",
                "status": "PENDING",
                "proof": null,
                "instances": null
            }
        }))
        .unwrap();
        assert_eq!(data.get_proof.status, ProofStatus::Pending);
        assert!(data.get_proof.instances.is_none());
    }

    #[test]
    fn test_graphql_errors_parse() {
        let envelope: GraphQLResponse = serde_json::from_value(serde_json::json!({
            "data": null,
            "errors": [{ "message": "artifact not found", "path": ["initiateProof"] }]
        }))
        .unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.errors.unwrap()[0].message, "artifact not found");
    }
}
