//! Solana JSON-RPC network collaborator.
//!
//! The workflow depends only on [`SolanaRpc`]; [`HttpRpc`] is the real
//! `reqwest`-backed client. Submission deliberately goes through the
//! raw-bytes `sendTransaction` path: the transaction already carries the
//! device's signature, and any client-side re-signing would invalidate it.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::json;

use crate::errors::AppError;
use crate::types::SignatureStatus;

#[async_trait]
pub trait SolanaRpc: Send + Sync {
    /// Submit an already-signed serialized transaction, returning its
    /// signature string (the submission id used for status queries).
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String, AppError>;

    /// Look up the confirmation status of a submitted transaction.
    /// `None` means the ledger has not recorded an outcome yet.
    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, AppError>;
}

#[derive(Debug, Deserialize)]
struct RpcReply<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC client for a Solana node.
pub struct HttpRpc {
    client: reqwest::Client,
    url: String,
}

impl HttpRpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, AppError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let reply: RpcReply<T> = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = reply.error {
            return Err(AppError::RpcResponse(format!(
                "{method}: {} (code {})",
                err.message, err.code
            )));
        }
        reply
            .result
            .ok_or_else(|| AppError::RpcResponse(format!("{method}: empty result")))
    }
}

#[async_trait]
impl SolanaRpc for HttpRpc {
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String, AppError> {
        let encoded = general_purpose::STANDARD.encode(raw);
        self.call(
            "sendTransaction",
            json!([encoded, { "encoding": "base64" }]),
        )
        .await
    }

    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, AppError> {
        #[derive(Debug, Deserialize)]
        struct StatusValue {
            value: Vec<Option<SignatureStatus>>,
        }

        let reply: StatusValue = self
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;

        Ok(reply.value.into_iter().next().flatten())
    }
}
