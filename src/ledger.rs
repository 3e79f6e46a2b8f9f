//! Signing workflow and submit-and-confirm orchestration.

use std::time::Instant;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use tracing::{debug, error, info, warn};

use crate::device::SolanaApp;
use crate::errors::AppError;
use crate::path;
use crate::rpc::SolanaRpc;
use crate::transport::ApduTransport;
use crate::types::{AppConfig, ConfirmOptions, ConfirmationResult, SignatureStatus};

/// Sign `tx` on the device under the default derivation path and attach the
/// signature for `signer`.
///
/// Returns whether the attached signature passed local verification. A failed
/// check is reported, not raised: the device is the authority on what it
/// signed, and the caller decides whether a mismatch is fatal.
pub async fn sign_transaction<T: ApduTransport>(
    app: &mut SolanaApp<T>,
    tx: &mut Transaction,
    signer: &Pubkey,
) -> Result<bool, AppError> {
    info!("Begin signing with Ledger");

    let config_raw = app.get_app_config().await?;
    match AppConfig::parse(config_raw.clone()) {
        Some(config) => info!(version = %config.version(), "Solana app config"),
        None => warn!(raw = %hex::encode(&config_raw), "Unrecognized app config reply"),
    }

    let derivation_path = path::derivation_path(None, None);
    // The exact bytes the device will hash and sign; verification below must
    // derive the identical serialization.
    let message = tx.message_data();

    let sig_bytes = app.sign_message(&derivation_path, &message).await?;
    let signature = Signature::try_from(sig_bytes.as_slice()).map_err(|_| {
        AppError::InvalidSignature(format!("expected 64 bytes, got {}", sig_bytes.len()))
    })?;
    debug!(signature = %bs58::encode(&sig_bytes).into_string(), "Device signature");

    attach_signature(tx, signer, signature)?;

    let verified = tx.verify().is_ok();
    info!(verified, "Local signature verification");
    Ok(verified)
}

/// Place `signature` into the signature slot belonging to `signer`.
fn attach_signature(
    tx: &mut Transaction,
    signer: &Pubkey,
    signature: Signature,
) -> Result<(), AppError> {
    let num_required = tx.message.header.num_required_signatures as usize;
    let signer_keys = &tx.message.account_keys[..num_required.min(tx.message.account_keys.len())];
    let position = signer_keys
        .iter()
        .position(|key| key == signer)
        .ok_or_else(|| AppError::UnknownSigner(signer.to_string()))?;

    if tx.signatures.len() < num_required {
        tx.signatures.resize(num_required, Signature::default());
    }
    tx.signatures[position] = signature;
    Ok(())
}

/// Sign on the device, submit the raw transaction, and poll for confirmation.
pub async fn send_and_confirm<T: ApduTransport, R: SolanaRpc + ?Sized>(
    app: &mut SolanaApp<T>,
    rpc: &R,
    tx: &mut Transaction,
    signer: &Pubkey,
    options: &ConfirmOptions,
) -> Result<ConfirmationResult, AppError> {
    sign_transaction(app, tx, signer).await?;
    submit_and_confirm(rpc, tx, options).await
}

/// Submit an already-signed transaction and poll for a terminal status.
///
/// Submission must use the raw-bytes path: the transaction carries the
/// device's signature and re-signing would invalidate it. Errors here are
/// logged in full and propagated unchanged; an exhausted poll budget is a
/// normal return with an absent status.
pub async fn submit_and_confirm<R: SolanaRpc + ?Sized>(
    rpc: &R,
    tx: &Transaction,
    options: &ConfirmOptions,
) -> Result<ConfirmationResult, AppError> {
    let raw = bincode::serialize(tx)?;

    let signature = rpc
        .send_raw_transaction(&raw)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to submit transaction"))?;
    info!(%signature, "Transaction submitted");

    let status = confirm_signature(rpc, &signature, options)
        .await
        .inspect_err(|e| error!(error = %e, %signature, "Status polling failed"))?;

    Ok(ConfirmationResult { status, signature })
}

/// Poll for a non-absent status until `options.timeout` elapses.
pub async fn confirm_signature<R: SolanaRpc + ?Sized>(
    rpc: &R,
    signature: &str,
    options: &ConfirmOptions,
) -> Result<Option<SignatureStatus>, AppError> {
    let started = Instant::now();
    let mut status = None;

    while started.elapsed() < options.timeout {
        status = rpc.get_signature_status(signature).await?;
        if status.is_some() {
            break;
        }
        tokio::time::sleep(options.delay).await;
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use solana_sdk::message::Message;
    use solana_sdk::signature::Keypair;
    use solana_sdk::signer::Signer as _;
    use solana_sdk::system_instruction;

    use super::*;
    use crate::transport::ApduCommand;

    struct ScriptedDevice {
        replies: VecDeque<Vec<u8>>,
    }

    #[async_trait]
    impl ApduTransport for ScriptedDevice {
        async fn exchange(&mut self, _command: &ApduCommand) -> Result<Vec<u8>, AppError> {
            Ok(self.replies.pop_front().expect("script exhausted"))
        }
    }

    struct MockRpc {
        status_calls: AtomicUsize,
        statuses: Mutex<VecDeque<Option<SignatureStatus>>>,
        fail_submit: bool,
    }

    impl MockRpc {
        fn with_statuses(statuses: Vec<Option<SignatureStatus>>) -> Self {
            Self {
                status_calls: AtomicUsize::new(0),
                statuses: Mutex::new(statuses.into()),
                fail_submit: false,
            }
        }
    }

    #[async_trait]
    impl SolanaRpc for MockRpc {
        async fn send_raw_transaction(&self, _raw: &[u8]) -> Result<String, AppError> {
            if self.fail_submit {
                return Err(AppError::RpcResponse("node unavailable".to_string()));
            }
            Ok("5ubm1551onS1gnature".to_string())
        }

        async fn get_signature_status(
            &self,
            _signature: &str,
        ) -> Result<Option<SignatureStatus>, AppError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.statuses.lock().unwrap().pop_front().flatten())
        }
    }

    fn finalized_status() -> SignatureStatus {
        SignatureStatus {
            slot: 1234,
            confirmations: None,
            err: None,
            confirmation_status: Some("finalized".to_string()),
        }
    }

    fn transfer_transaction(payer: &Pubkey) -> Transaction {
        let instruction = system_instruction::transfer(payer, &Pubkey::new_unique(), 1_000);
        let message = Message::new(&[instruction], Some(payer));
        Transaction::new_unsigned(message)
    }

    fn with_status(mut data: Vec<u8>) -> Vec<u8> {
        data.extend_from_slice(&[0x90, 0x00]);
        data
    }

    #[tokio::test]
    async fn polling_stops_on_first_terminal_status() {
        let rpc = MockRpc::with_statuses(vec![None, None, None, Some(finalized_status())]);
        let options = ConfirmOptions {
            timeout: Duration::from_secs(60),
            delay: Duration::ZERO,
        };

        let status = confirm_signature(&rpc, "sig", &options).await.unwrap();

        assert_eq!(status.unwrap().slot, 1234);
        assert_eq!(rpc.status_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn zero_timeout_returns_absent_without_querying() {
        let rpc = MockRpc::with_statuses(vec![]);
        let options = ConfirmOptions {
            timeout: Duration::ZERO,
            delay: Duration::from_secs(5),
        };

        let status = confirm_signature(&rpc, "sig", &options).await.unwrap();

        assert!(status.is_none());
        assert_eq!(rpc.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn submission_error_propagates_before_any_status_query() {
        let mut rpc = MockRpc::with_statuses(vec![Some(finalized_status())]);
        rpc.fail_submit = true;
        let tx = transfer_transaction(&Pubkey::new_unique());

        let err = submit_and_confirm(&rpc, &tx, &ConfirmOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RpcResponse(_)));
        assert_eq!(rpc.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_budget_is_a_normal_return_with_absent_status() {
        let rpc = MockRpc::with_statuses(vec![None, None]);
        let options = ConfirmOptions {
            timeout: Duration::from_millis(5),
            delay: Duration::from_millis(3),
        };

        let result = confirm_signature(&rpc, "sig", &options).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn workflow_attaches_a_verifying_device_signature() {
        // Stand in for the device with a real keypair so local verification
        // has something genuine to check.
        let device_key = Keypair::new();
        let signer = device_key.pubkey();
        let mut tx = transfer_transaction(&signer);

        let device_sig = device_key.sign_message(&tx.message_data());
        let device = ScriptedDevice {
            replies: vec![
                with_status(vec![0x02, 0x01, 1, 4, 2]),
                with_status(device_sig.as_ref().to_vec()),
            ]
            .into(),
        };
        let mut app = SolanaApp::new(device);

        let verified = sign_transaction(&mut app, &mut tx, &signer).await.unwrap();

        assert!(verified);
        assert_eq!(tx.signatures[0], device_sig);
        assert!(tx.verify().is_ok());
    }

    #[tokio::test]
    async fn workflow_reports_unverified_signature_without_failing() {
        let signer = Keypair::new().pubkey();
        let mut tx = transfer_transaction(&signer);

        let device = ScriptedDevice {
            replies: vec![
                with_status(vec![0x02, 0x01, 1, 4, 2]),
                with_status(vec![7u8; 64]),
            ]
            .into(),
        };
        let mut app = SolanaApp::new(device);

        let verified = sign_transaction(&mut app, &mut tx, &signer).await.unwrap();
        assert!(!verified);
    }

    #[tokio::test]
    async fn workflow_rejects_a_signer_outside_the_transaction() {
        let mut tx = transfer_transaction(&Keypair::new().pubkey());
        let stranger = Pubkey::new_unique();

        let device = ScriptedDevice {
            replies: vec![
                with_status(vec![0x02, 0x01, 1, 4, 2]),
                with_status(vec![7u8; 64]),
            ]
            .into(),
        };
        let mut app = SolanaApp::new(device);

        let err = sign_transaction(&mut app, &mut tx, &stranger).await.unwrap_err();
        assert!(matches!(err, AppError::UnknownSigner(_)));
    }

    #[tokio::test]
    async fn end_to_end_sign_submit_and_confirm() {
        let device_key = Keypair::new();
        let signer = device_key.pubkey();
        let mut tx = transfer_transaction(&signer);

        let device_sig = device_key.sign_message(&tx.message_data());
        let device = ScriptedDevice {
            replies: vec![
                with_status(vec![0x02, 0x01, 1, 4, 2]),
                with_status(device_sig.as_ref().to_vec()),
            ]
            .into(),
        };
        let mut app = SolanaApp::new(device);
        let rpc = MockRpc::with_statuses(vec![None, Some(finalized_status())]);
        let options = ConfirmOptions {
            timeout: Duration::from_secs(60),
            delay: Duration::ZERO,
        };

        let result = send_and_confirm(&mut app, &rpc, &mut tx, &signer, &options)
            .await
            .unwrap();

        assert_eq!(result.signature, "5ubm1551onS1gnature");
        assert_eq!(
            result.status.unwrap().confirmation_status.as_deref(),
            Some("finalized")
        );
        assert_eq!(rpc.status_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn malformed_device_signature_is_rejected() {
        let err = Signature::try_from([0u8; 32].as_slice());
        assert!(err.is_err());
    }
}
