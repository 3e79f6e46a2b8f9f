//! Sign Solana transactions with a Ledger hardware wallet.
//!
//! Talks the Solana Ledger app's APDU protocol (chunked command framing,
//! BIP44 hardened derivation paths), submits the signed transaction over
//! JSON-RPC, and polls for a confirmation status within a deadline.
//!
//! The physical transport and the RPC node sit behind the [`ApduTransport`]
//! and [`SolanaRpc`] traits, so the framing and polling logic is testable
//! with in-memory fakes.

pub mod constants;
pub mod device;
pub mod errors;
pub mod ledger;
pub mod path;
pub mod rpc;
pub mod transport;
pub mod types;

pub use device::SolanaApp;
pub use errors::AppError;
pub use ledger::{confirm_signature, send_and_confirm, sign_transaction, submit_and_confirm};
pub use rpc::{HttpRpc, SolanaRpc};
pub use transport::{ApduCommand, ApduTransport, LedgerTransport};
pub use types::{AppConfig, ConfirmOptions, ConfirmationResult, SignatureStatus};
