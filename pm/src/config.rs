// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::anyhow;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SenderMonitorConfig {
    // The recipient identity used in reserve allocation reads.
    pub claimant: Address,
    // Seconds between cleanup sweeps over tracked senders.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    // Seconds of idleness before a tracked sender is evicted.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: i64,
    // Number of acceptable ticket errors tolerated per sender.
    #[serde(default = "default_max_acceptable_errors")]
    pub max_acceptable_errors: u32,
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

fn default_ttl_secs() -> i64 {
    3600
}

fn default_max_acceptable_errors() -> u32 {
    10
}

impl SenderMonitorConfig {
    pub fn new(claimant: Address) -> Self {
        Self {
            claimant,
            cleanup_interval_secs: default_cleanup_interval_secs(),
            ttl_secs: default_ttl_secs(),
            max_acceptable_errors: default_max_acceptable_errors(),
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cleanup_interval_secs == 0 {
            return Err(anyhow!("cleanup-interval-secs must be non-zero"));
        }
        if self.ttl_secs <= 0 {
            return Err(anyhow!(
                "ttl-secs must be positive, got {}",
                self.ttl_secs
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SenderMonitorConfig::new(Address::random());
        assert_eq!(config.cleanup_interval_secs, 300);
        assert_eq!(config.cleanup_interval(), Duration::from_secs(300));
        assert_eq!(config.ttl_secs, 3600);
        assert_eq!(config.max_acceptable_errors, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = SenderMonitorConfig::new(Address::random());
        config.cleanup_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive_ttl() {
        let mut config = SenderMonitorConfig::new(Address::random());
        config.ttl_secs = 0;
        assert!(config.validate().is_err());
        config.ttl_secs = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_kebab_case_with_defaults() {
        let config: SenderMonitorConfig = serde_json::from_str(
            r#"{
                "claimant": "0x0000000000000000000000000000000000000001",
                "ttl-secs": 60
            }"#,
        )
        .unwrap();
        assert_eq!(config.ttl_secs, 60);
        assert_eq!(config.cleanup_interval_secs, 300);
    }
}
