//! Error types for the Solana Ledger signer

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("No Ledger device found")]
    DeviceNotFound,

    #[error("Failed to connect to Ledger device: {0}")]
    DeviceConnection(String),

    #[error("Ledger transport error: {0}")]
    Transport(#[from] ledger_lib::Error),

    #[error("Received unexpected reply payload during continuation ({len} bytes)")]
    UnexpectedReplyPayload { len: usize },

    #[error("Device reply too short ({len} bytes, need at least the status word)")]
    TruncatedReply { len: usize },

    #[error("User rejected the request on the device")]
    UserRejected,

    #[error("Device rejected the request with status {status:#06x}")]
    DeviceRejection { status: u16 },

    #[error("Failed to serialize transaction: {0}")]
    Serialize(#[from] bincode::Error),

    #[error("RPC request failed: {0}")]
    Rpc(#[from] reqwest::Error),

    #[error("RPC node returned an error: {0}")]
    RpcResponse(String),

    #[error("Device returned a malformed signature: {0}")]
    InvalidSignature(String),

    #[error("Signer {0} is not a required signer of this transaction")]
    UnknownSigner(String),
}
