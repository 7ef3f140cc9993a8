//! Driver configuration.

use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use zkspin_core::{
    ControllerConfig, PollingConfig, SchedulerConfig, DEFAULT_ARTIFACT_ID, DEFAULT_HUB_URL,
    DEFAULT_SCALE_EXPONENT,
};

/// Verifier contract the rotation circuit was deployed with.
pub const DEFAULT_VERIFIER_ADDRESS: &str = "0xf2607430e752cBd67bA0207b21DEe3e634b7306D";

/// Driver configuration.
#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Proving hub GraphQL endpoint.
    pub hub_url: String,
    /// Controller settings (artifact, scale, polling, animation).
    pub controller: ControllerConfig,
    /// Number of rotations to run before exiting.
    pub rotations: u32,
    /// RPC URL of the chain hosting the verifier contract.
    pub verifier_rpc_url: Option<String>,
    /// Verifier contract address.
    pub verifier_address: String,
    /// Key used to sign verifier transactions.
    pub verifier_private_key: Option<String>,
    /// Confirmations to wait for before animating.
    pub verifier_confirmations: usize,
    /// Emit JSON logs.
    pub log_json: bool,
}

impl DriverConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let hub_url = lookup("ZKSPIN_HUB_URL").unwrap_or_else(|| DEFAULT_HUB_URL.to_string());
        let artifact_id =
            lookup("ZKSPIN_ARTIFACT_ID").unwrap_or_else(|| DEFAULT_ARTIFACT_ID.to_string());

        let poll_interval_ms: u64 = parse_or(&lookup, "POLL_INTERVAL_MS", 2_000)?;
        let poll_deadline_secs: Option<u64> = parse_opt(&lookup, "POLL_DEADLINE_SECS")?;
        let max_poll_errors: u32 = parse_or(&lookup, "MAX_POLL_ERRORS", 3)?;
        let scale_exponent: u32 = parse_or(&lookup, "SCALE_EXPONENT", DEFAULT_SCALE_EXPONENT)?;

        let tick_period_ms: u64 = parse_or(&lookup, "TICK_PERIOD_MS", 10)?;
        let tick_budget: u32 = parse_or(&lookup, "TICK_BUDGET", 300)?;
        let tick_divisor: u32 = parse_or(&lookup, "TICK_DIVISOR", 15)?;
        if tick_divisor == 0 {
            bail!("TICK_DIVISOR must be greater than zero");
        }
        if tick_period_ms == 0 {
            bail!("TICK_PERIOD_MS must be greater than zero");
        }

        let rotations: u32 = parse_or(&lookup, "ROTATIONS", 1)?;

        let verifier_rpc_url = lookup("VERIFIER_RPC_URL");
        let verifier_address = lookup("VERIFIER_ADDRESS")
            .unwrap_or_else(|| DEFAULT_VERIFIER_ADDRESS.to_string());
        let verifier_private_key = lookup("VERIFIER_PRIVATE_KEY");
        let verifier_confirmations: usize = parse_or(&lookup, "VERIFIER_CONFIRMATIONS", 3)?;

        let log_json = matches!(
            lookup("ZKSPIN_LOG_JSON").as_deref(),
            Some("1") | Some("true")
        );

        Ok(Self {
            hub_url,
            controller: ControllerConfig {
                artifact_id,
                scale_exponent,
                polling: PollingConfig {
                    interval: Duration::from_millis(poll_interval_ms),
                    deadline: poll_deadline_secs.map(Duration::from_secs),
                    max_consecutive_poll_errors: max_poll_errors,
                },
                scheduler: SchedulerConfig {
                    tick_period: Duration::from_millis(tick_period_ms),
                    tick_budget,
                    tick_divisor,
                },
            },
            rotations,
            verifier_rpc_url,
            verifier_address,
            verifier_private_key,
            verifier_confirmations,
            log_json,
        })
    }
}

fn parse_opt<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("{} has invalid value {:?}", key, raw))
        })
        .transpose()
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<DriverConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DriverConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.hub_url, DEFAULT_HUB_URL);
        assert_eq!(config.controller.artifact_id, DEFAULT_ARTIFACT_ID);
        assert_eq!(config.controller.scale_exponent, 14);
        assert_eq!(config.controller.polling.interval, Duration::from_millis(2_000));
        assert!(config.controller.polling.deadline.is_none());
        assert_eq!(config.controller.scheduler.tick_budget, 300);
        assert_eq!(config.controller.scheduler.tick_divisor, 15);
        assert_eq!(config.rotations, 1);
        assert_eq!(config.verifier_address, DEFAULT_VERIFIER_ADDRESS);
        assert_eq!(config.verifier_confirmations, 3);
        assert!(config.verifier_rpc_url.is_none());
        assert!(!config.log_json);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("ZKSPIN_HUB_URL", "http://localhost:8080/graphql"),
            ("POLL_INTERVAL_MS", "500"),
            ("POLL_DEADLINE_SECS", "60"),
            ("TICK_BUDGET", "700"),
            ("ROTATIONS", "4"),
            ("ZKSPIN_LOG_JSON", "1"),
        ])
        .unwrap();
        assert_eq!(config.hub_url, "http://localhost:8080/graphql");
        assert_eq!(config.controller.polling.interval, Duration::from_millis(500));
        assert_eq!(config.controller.polling.deadline, Some(Duration::from_secs(60)));
        assert_eq!(config.controller.scheduler.tick_budget, 700);
        assert_eq!(config.rotations, 4);
        assert!(config.log_json);
    }

    #[test]
    fn test_invalid_numbers_are_errors() {
        let err = load(&[("TICK_BUDGET", "lots")]).unwrap_err();
        assert!(err.to_string().contains("TICK_BUDGET"));
    }

    #[test]
    fn test_zero_divisor_rejected() {
        assert!(load(&[("TICK_DIVISOR", "0")]).is_err());
    }
}
