//! API types for the Solana Ledger signer
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Parsed reply of `INS_GET_APP_CONFIG`.
///
/// The firmware prepends settings flags to the version triple, and the flag
/// count has varied across app releases; the version is always the last three
/// bytes, so everything before it is kept raw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub raw: Vec<u8>,
}

impl AppConfig {
    pub fn parse(raw: Vec<u8>) -> Option<Self> {
        if raw.len() < 3 {
            return None;
        }
        let version = &raw[raw.len() - 3..];
        Some(Self {
            major: version[0],
            minor: version[1],
            patch: version[2],
            raw,
        })
    }

    pub fn version(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// One entry of a `getSignatureStatuses` RPC reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    pub confirmations: Option<u64>,
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

/// Outcome of one submit-and-confirm attempt.
///
/// `status` stays `None` when the poll deadline elapsed before the ledger
/// reported anything; that is a normal return, and the caller decides what
/// "unconfirmed" means for its use case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationResult {
    pub status: Option<SignatureStatus>,
    pub signature: String,
}

/// Poll budget for confirmation.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmOptions {
    /// Total wall-clock budget for the poll loop.
    pub timeout: Duration,
    /// Sleep between consecutive status queries.
    pub delay: Duration,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            delay: Duration::from_secs(5),
        }
    }
}
