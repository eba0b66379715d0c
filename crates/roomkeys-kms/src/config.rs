//! KMS configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::credential::KmsCredential;

/// Which KMS to use and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KmsConfig {
    /// Backend credential. `None` leaves the KMS unconfigured.
    pub credential: Option<KmsCredential>,

    /// Per-request timeout for provider calls.
    pub request_timeout_ms: u64,
}

impl Default for KmsConfig {
    fn default() -> Self {
        Self {
            credential: None,
            request_timeout_ms: 5_000,
        }
    }
}

impl KmsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
