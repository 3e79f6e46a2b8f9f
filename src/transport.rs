//! Physical device transport.
//!
//! The framing and workflow layers only see [`ApduTransport`], so tests can
//! substitute a scripted in-memory device. [`LedgerTransport`] is the real
//! implementation on top of `ledger-lib`'s USB HID plumbing.

use std::time::Duration;

use async_trait::async_trait;
use ledger_lib::{Exchange, Filters, LedgerHandle, LedgerProvider, Transport};

use crate::errors::AppError;

/// One APDU command: header plus an already framing-encoded payload.
///
/// `data` must fit a single physical exchange (at most
/// [`crate::constants::MAX_PAYLOAD`] bytes); chunking longer payloads is the
/// framing layer's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl ApduCommand {
    /// Serialize to the raw byte form the device consumes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(5 + self.data.len());
        bytes.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2, self.data.len() as u8]);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

/// Byte-level exchange with the device.
///
/// Replies always include the trailing 2-byte status word; interpreting it is
/// left to the caller.
#[async_trait]
pub trait ApduTransport: Send {
    async fn exchange(&mut self, command: &ApduCommand) -> Result<Vec<u8>, AppError>;
}

/// User confirmation on the device can take a while, so the per-exchange
/// timeout is generous.
const APDU_TIMEOUT: Duration = Duration::from_secs(120);

/// Real Ledger device reached over USB HID.
pub struct LedgerTransport {
    handle: LedgerHandle,
}

impl LedgerTransport {
    /// Connect to the first Ledger device the provider can see.
    pub async fn open() -> Result<Self, AppError> {
        let mut provider = LedgerProvider::init().await;

        // Give the provider worker thread time to initialize
        tokio::time::sleep(Duration::from_millis(100)).await;

        let devices = provider.list(Filters::Any).await?;
        if devices.is_empty() {
            return Err(AppError::DeviceNotFound);
        }

        let handle = provider.connect(devices[0].clone()).await.map_err(|e| {
            AppError::DeviceConnection(format!("Failed to connect to Ledger device: {e}"))
        })?;

        Ok(Self { handle })
    }
}

#[async_trait]
impl ApduTransport for LedgerTransport {
    async fn exchange(&mut self, command: &ApduCommand) -> Result<Vec<u8>, AppError> {
        let reply = self
            .handle
            .exchange(&command.serialize(), APDU_TIMEOUT)
            .await?;
        Ok(reply)
    }
}
