//! Data model shared by the polling client, the decoder and the controller.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SpinError;

/// Orientation the controller starts from before any proof has been applied.
pub const INITIAL_ORIENTATION: [&str; 4] = ["1.0", "0.0", "0.0", "1.0"];

/// Flattened 2×2 orientation matrix `[a, b, c, d]`, kept as decimal text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct OrientationVector([String; 4]);

impl OrientationVector {
    /// Build an orientation from four decimal numerals.
    pub fn new<S: AsRef<str>>(values: [S; 4]) -> Result<Self, SpinError> {
        let values = values.map(|v| v.as_ref().trim().to_string());
        for value in &values {
            parse_decimal(value)?;
        }
        Ok(Self(values))
    }

    /// Stringify a decoded vector into the next orientation.
    pub fn from_decoded(decoded: &DecodedVector) -> Self {
        Self(decoded.0.map(|v| v.to_string()))
    }

    pub fn as_strs(&self) -> [&str; 4] {
        [
            self.0[0].as_str(),
            self.0[1].as_str(),
            self.0[2].as_str(),
            self.0[3].as_str(),
        ]
    }

    /// Parse all four numerals.
    pub fn values(&self) -> Result<[f64; 4], SpinError> {
        Ok([
            parse_decimal(&self.0[0])?,
            parse_decimal(&self.0[1])?,
            parse_decimal(&self.0[2])?,
            parse_decimal(&self.0[3])?,
        ])
    }

    /// The first column of the matrix, the axis the rotation angle is read from.
    pub fn axis(&self) -> Result<[f64; 2], SpinError> {
        let [a, b, _, _] = self.values()?;
        Ok([a, b])
    }

    /// Render the service input file: `{"input_data": [[a, b, c, d]]}`.
    pub fn input_file(&self) -> Result<String, SpinError> {
        let values = self.values()?;
        let file = serde_json::json!({ "input_data": [values] });
        Ok(serde_json::to_string(&file)?)
    }
}

impl Default for OrientationVector {
    fn default() -> Self {
        Self(INITIAL_ORIENTATION.map(String::from))
    }
}

impl TryFrom<Vec<String>> for OrientationVector {
    type Error = SpinError;

    fn try_from(values: Vec<String>) -> Result<Self, Self::Error> {
        let values: [String; 4] = values.try_into().map_err(|v: Vec<String>| {
            SpinError::MalformedNumeral(format!(
                "orientation needs 4 values, got {}",
                v.len()
            ))
        })?;
        Self::new(values)
    }
}

impl fmt::Display for OrientationVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

fn parse_decimal(value: &str) -> Result<f64, SpinError> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| SpinError::MalformedNumeral(format!("invalid decimal: {:?}", value)))?;
    if !parsed.is_finite() {
        return Err(SpinError::MalformedNumeral(format!(
            "non-finite decimal: {:?}",
            value
        )));
    }
    Ok(parsed)
}

/// A proof job to submit to the hub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofRequest {
    pub artifact_id: String,
    pub input: OrientationVector,
}

/// Identifier returned by the hub when a proof job is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProofHandle {
    pub id: String,
}

impl ProofHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Status reported by the hub for a proof job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProofStatus {
    Pending,
    Success,
    Failure,
    /// Any status the hub reports that we do not recognise. Treated as still running.
    Other(String),
}

impl ProofStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProofStatus::Success | ProofStatus::Failure)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProofStatus::Pending => "PENDING",
            ProofStatus::Success => "SUCCESS",
            ProofStatus::Failure => "FAILURE",
            ProofStatus::Other(s) => s,
        }
    }
}

impl From<&str> for ProofStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => ProofStatus::Pending,
            "SUCCESS" => ProofStatus::Success,
            "FAILURE" | "FAILED" | "ERROR" => ProofStatus::Failure,
            _ => ProofStatus::Other(value.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for ProofStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ProofStatus::from(raw.as_str()))
    }
}

impl Serialize for ProofStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One poll response, before validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofSnapshot {
    pub status: ProofStatus,
    #[serde(default)]
    pub proof: Option<String>,
    #[serde(default)]
    pub instances: Option<Vec<String>>,
}

impl ProofSnapshot {
    pub fn pending() -> Self {
        Self {
            status: ProofStatus::Pending,
            proof: None,
            instances: None,
        }
    }
}

/// A completed proof with its public outputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofResult {
    pub status: ProofStatus,
    pub proof: Vec<u8>,
    pub instances: Vec<String>,
}

impl ProofResult {
    /// Validate a successful snapshot: the proof must be hex and there must be
    /// at least four instances.
    pub fn from_snapshot(snapshot: ProofSnapshot) -> Result<Self, SpinError> {
        let proof_hex = snapshot
            .proof
            .ok_or_else(|| SpinError::MalformedResponse("missing proof".into()))?;
        let instances = snapshot
            .instances
            .ok_or_else(|| SpinError::MalformedResponse("missing instances".into()))?;

        if instances.len() < 4 {
            return Err(SpinError::MalformedResponse(format!(
                "expected at least 4 instances, got {}",
                instances.len()
            )));
        }

        let proof = hex::decode(proof_hex.trim().trim_start_matches("0x"))
            .map_err(|e| SpinError::MalformedResponse(format!("proof is not hex: {}", e)))?;

        Ok(Self {
            status: snapshot.status,
            proof,
            instances,
        })
    }

    /// The instances carrying the next orientation.
    pub fn orientation_instances(&self) -> &[String] {
        &self.instances[self.instances.len() - 4..]
    }
}

/// Four reals decoded from the tail of a proof's instances.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodedVector(pub [f64; 4]);

impl DecodedVector {
    pub fn axis(&self) -> [f64; 2] {
        [self.0[0], self.0[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_orientation() {
        let orientation = OrientationVector::default();
        assert_eq!(orientation.as_strs(), INITIAL_ORIENTATION);
        assert_eq!(orientation.values().unwrap(), [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_input_file_format() {
        let orientation = OrientationVector::default();
        assert_eq!(
            orientation.input_file().unwrap(),
            r#"{"input_data":[[1.0,0.0,0.0,1.0]]}"#
        );
    }

    #[test]
    fn test_orientation_rejects_bad_numerals() {
        assert!(matches!(
            OrientationVector::new(["1.0", "abc", "0", "1"]),
            Err(SpinError::MalformedNumeral(_))
        ));
        assert!(OrientationVector::new(["1.0", "inf", "0", "1"]).is_err());
    }

    #[test]
    fn test_orientation_from_vec_requires_four() {
        let short = vec!["1.0".to_string(), "0.0".to_string()];
        assert!(OrientationVector::try_from(short).is_err());

        let full: Vec<String> = INITIAL_ORIENTATION.iter().map(|s| s.to_string()).collect();
        assert!(OrientationVector::try_from(full).is_ok());
    }

    #[test]
    fn test_orientation_deserialize_validates() {
        let parsed: OrientationVector =
            serde_json::from_str(r#"["0.5", "-0.5", "0", "1"]"#).unwrap();
        assert_eq!(parsed.values().unwrap(), [0.5, -0.5, 0.0, 1.0]);

        assert!(serde_json::from_str::<OrientationVector>(r#"["1.0", "abc", "0", "1"]"#).is_err());
        assert!(serde_json::from_str::<OrientationVector>(r#"["1.0", "0"]"#).is_err());
    }

    #[test]
    fn test_from_decoded_round_trips_values() {
        let decoded = DecodedVector([0.5, -0.25, 0.0, 1.0]);
        let orientation = OrientationVector::from_decoded(&decoded);
        assert_eq!(orientation.values().unwrap(), decoded.0);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(ProofStatus::from("SUCCESS"), ProofStatus::Success);
        assert_eq!(ProofStatus::from("pending"), ProofStatus::Pending);
        assert_eq!(ProofStatus::from("FAILED"), ProofStatus::Failure);
        assert_eq!(
            ProofStatus::from("QUEUED"),
            ProofStatus::Other("QUEUED".into())
        );
        assert!(!ProofStatus::Other("QUEUED".into()).is_terminal());
    }

    #[test]
    fn test_snapshot_deserialize() {
        let snapshot: ProofSnapshot = serde_json::from_value(serde_json::json!({
            "status": "SUCCESS",
            "proof": "0xdead",
            "instances": ["1", "2", "3", "4", "5"]
        }))
        .unwrap();
        let result = ProofResult::from_snapshot(snapshot).unwrap();
        assert_eq!(result.proof, vec![0xde, 0xad]);
        assert_eq!(result.orientation_instances(), ["2", "3", "4", "5"]);
    }

    #[test]
    fn test_result_requires_four_instances() {
        let snapshot = ProofSnapshot {
            status: ProofStatus::Success,
            proof: Some("00".into()),
            instances: Some(vec!["1".into(), "2".into(), "3".into()]),
        };
        assert!(matches!(
            ProofResult::from_snapshot(snapshot),
            Err(SpinError::MalformedResponse(_))
        ));
    }
}
