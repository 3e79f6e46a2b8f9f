//! Solana Ledger app client: APDU chunking plus the app's three instructions.

use tracing::trace;

use crate::constants::*;
use crate::errors::AppError;
use crate::transport::{ApduCommand, ApduTransport};

/// Client for the Solana app running on a Ledger device.
///
/// Owns the transport for the duration of one signing session; the device
/// processes a single command at a time, so concurrent callers must serialize
/// around this.
pub struct SolanaApp<T: ApduTransport> {
    transport: T,
}

impl<T: ApduTransport> SolanaApp<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Fetch the app configuration (settings flags plus app version).
    ///
    /// Tiny fixed-size reply, so no chunking is involved.
    pub async fn get_app_config(&mut self) -> Result<Vec<u8>, AppError> {
        let reply = self
            .transport
            .exchange(&ApduCommand {
                cla: SOLANA_CLA,
                ins: INS_GET_APP_CONFIG,
                p1: P1_NON_CONFIRM,
                p2: 0,
                data: Vec::new(),
            })
            .await?;
        strip_status(reply)
    }

    /// Fetch the public key for an encoded derivation path.
    pub async fn get_pubkey(&mut self, derivation_path: &[u8]) -> Result<Vec<u8>, AppError> {
        self.send_chunked(INS_GET_PUBKEY, P1_NON_CONFIRM, derivation_path.to_vec())
            .await
    }

    /// Sign a serialized transaction message under one derivation path.
    ///
    /// Uses `P1_CONFIRM`: the device prompts the operator before signing, and
    /// that prompt is a deliberate security gate, never to be bypassed.
    pub async fn sign_message(
        &mut self,
        derivation_path: &[u8],
        message: &[u8],
    ) -> Result<Vec<u8>, AppError> {
        // The app accepts exactly one derivation path per signing call.
        let mut payload = Vec::with_capacity(1 + derivation_path.len() + message.len());
        payload.push(1);
        payload.extend_from_slice(derivation_path);
        payload.extend_from_slice(message);

        self.send_chunked(INS_SIGN_MESSAGE, P1_CONFIRM, payload).await
    }

    /// Push a logical payload through the fixed-size APDU transport.
    ///
    /// Full-size chunks go out flagged `P2_MORE` and must be answered with a
    /// bare status word; after the first chunk every subsequent one also
    /// carries `P2_EXTEND`. The final slice (possibly empty) goes out with the
    /// continuation flag alone, and its reply minus the status word is the
    /// logical response.
    async fn send_chunked(
        &mut self,
        ins: u8,
        p1: u8,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, AppError> {
        let mut p2 = 0u8;
        let mut offset = 0usize;

        while payload.len() - offset > MAX_PAYLOAD {
            let chunk = payload[offset..offset + MAX_PAYLOAD].to_vec();
            offset += MAX_PAYLOAD;
            trace!(ins, p2 = p2 | P2_MORE, len = chunk.len(), "send chunk");
            let reply = self
                .transport
                .exchange(&ApduCommand {
                    cla: SOLANA_CLA,
                    ins,
                    p1,
                    p2: p2 | P2_MORE,
                    data: chunk,
                })
                .await?;
            if reply.len() != STATUS_LEN {
                return Err(AppError::UnexpectedReplyPayload { len: reply.len() });
            }
            check_status(&reply)?;
            p2 |= P2_EXTEND;
        }

        let chunk = payload[offset..].to_vec();
        trace!(ins, p2, len = chunk.len(), "send final chunk");
        let reply = self
            .transport
            .exchange(&ApduCommand {
                cla: SOLANA_CLA,
                ins,
                p1,
                p2,
                data: chunk,
            })
            .await?;
        strip_status(reply)
    }
}

fn check_status(reply: &[u8]) -> Result<(), AppError> {
    let sw = u16::from_be_bytes([reply[reply.len() - 2], reply[reply.len() - 1]]);
    match sw {
        SW_OK => Ok(()),
        SW_USER_REJECTED => Err(AppError::UserRejected),
        status => Err(AppError::DeviceRejection { status }),
    }
}

/// Validate the trailing status word and return the reply without it.
fn strip_status(mut reply: Vec<u8>) -> Result<Vec<u8>, AppError> {
    if reply.len() < STATUS_LEN {
        return Err(AppError::TruncatedReply { len: reply.len() });
    }
    check_status(&reply)?;
    reply.truncate(reply.len() - STATUS_LEN);
    Ok(reply)
}
