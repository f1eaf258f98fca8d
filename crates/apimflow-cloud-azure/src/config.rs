//! ARM client configuration

use crate::error::{AzureError, Result};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Configuration for the ARM API client
///
/// The access token is used as-is; obtaining and refreshing it is up to the
/// caller.
#[derive(Debug, Clone)]
pub struct ArmConfig {
    pub subscription_id: String,
    pub access_token: String,
    pub endpoint: String,
    pub request_timeout: Duration,
    pub poll: PollConfig,
}

/// Long-running operation polling
///
/// `interval * max_attempts` must stay below
/// [`apimflow_cloud::STALE_LOCK_AFTER`], or another run may take over the
/// state lock mid-operation.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay before each status check
    pub interval: Duration,

    /// Checks before giving up
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        // API Management provisioning routinely takes 30-45 minutes
        Self {
            interval: Duration::from_secs(15),
            max_attempts: 360,
        }
    }
}

impl ArmConfig {
    pub fn new(subscription_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            access_token: access_token.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(60),
            poll: PollConfig::default(),
        }
    }

    /// Create ArmConfig from environment variables
    ///
    /// `ARM_SUBSCRIPTION_ID` and `ARM_ACCESS_TOKEN` are required,
    /// `ARM_ENDPOINT` overrides the management endpoint.
    pub fn from_env() -> Result<Self> {
        let subscription_id = std::env::var("ARM_SUBSCRIPTION_ID")
            .map_err(|_| AzureError::MissingEnvVar("ARM_SUBSCRIPTION_ID".to_string()))?;
        let access_token = std::env::var("ARM_ACCESS_TOKEN")
            .map_err(|_| AzureError::MissingEnvVar("ARM_ACCESS_TOKEN".to_string()))?;

        for (var, value) in [
            ("ARM_SUBSCRIPTION_ID", &subscription_id),
            ("ARM_ACCESS_TOKEN", &access_token),
        ] {
            if value.trim().is_empty() {
                return Err(AzureError::InvalidConfig(format!("{} is empty", var)));
            }
        }

        let mut config = Self::new(subscription_id, access_token);
        if let Ok(endpoint) = std::env::var("ARM_ENDPOINT") {
            config = config.with_endpoint(endpoint);
        }
        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env() {
        temp_env::with_vars(
            [
                ("ARM_SUBSCRIPTION_ID", Some("sub")),
                ("ARM_ACCESS_TOKEN", Some("token")),
                ("ARM_ENDPOINT", Some("https://management.example.com/")),
            ],
            || {
                let config = ArmConfig::from_env().unwrap();
                assert_eq!(config.subscription_id, "sub");
                assert_eq!(config.access_token, "token");
                assert_eq!(config.endpoint, "https://management.example.com");
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_default_endpoint() {
        temp_env::with_vars(
            [
                ("ARM_SUBSCRIPTION_ID", Some("sub")),
                ("ARM_ACCESS_TOKEN", Some("token")),
                ("ARM_ENDPOINT", None),
            ],
            || {
                let config = ArmConfig::from_env().unwrap();
                assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_missing_token() {
        temp_env::with_vars(
            [
                ("ARM_SUBSCRIPTION_ID", Some("sub")),
                ("ARM_ACCESS_TOKEN", None::<&str>),
            ],
            || {
                let err = ArmConfig::from_env().unwrap_err();
                assert!(matches!(err, AzureError::MissingEnvVar(v) if v == "ARM_ACCESS_TOKEN"));
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_empty_values_are_invalid() {
        for (subscription, token, var) in [
            ("", "token", "ARM_SUBSCRIPTION_ID"),
            ("sub", "", "ARM_ACCESS_TOKEN"),
            ("sub", "   ", "ARM_ACCESS_TOKEN"),
        ] {
            temp_env::with_vars(
                [
                    ("ARM_SUBSCRIPTION_ID", Some(subscription)),
                    ("ARM_ACCESS_TOKEN", Some(token)),
                ],
                || {
                    let err = ArmConfig::from_env().unwrap_err();
                    assert!(
                        matches!(&err, AzureError::InvalidConfig(msg) if msg.starts_with(var)),
                        "expected {} to be rejected, got {:?}",
                        var,
                        err
                    );
                },
            );
        }
    }

    #[test]
    fn test_default_poll_budget_fits_inside_lock_lifetime() {
        let poll = PollConfig::default();
        let budget = poll.interval * poll.max_attempts;

        assert!(budget < apimflow_cloud::STALE_LOCK_AFTER);
    }
}
