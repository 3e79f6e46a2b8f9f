//! BIP44 derivation-path encoding for the Solana Ledger app.
//!
//! The app expects a length-prefixed list of hardened 4-byte big-endian
//! segments. The encoding here must stay bit-exact with the firmware: a
//! deviation makes the device derive the wrong key or reject the request.

use crate::constants::{BIP44_COIN_TYPE, BIP44_PURPOSE};

const HARDENED_BIT: u32 = 1 << 31;

fn harden(n: u32) -> u32 {
    n | HARDENED_BIT
}

/// Encode the derivation path `44'/501'[/account'[/change']]`.
///
/// Two fixed leading segments (purpose, coin type) are always present;
/// `account` and `change` append a third and fourth segment when given.
/// `change` is ignored unless `account` is also given, mirroring the
/// firmware's path grammar.
pub fn derivation_path(account: Option<u32>, change: Option<u32>) -> Vec<u8> {
    let mut segments = vec![harden(BIP44_PURPOSE), harden(BIP44_COIN_TYPE)];
    if let Some(account) = account {
        segments.push(harden(account));
        if let Some(change) = change {
            segments.push(harden(change));
        }
    }

    let mut encoded = Vec::with_capacity(1 + segments.len() * 4);
    encoded.push(segments.len() as u8);
    for segment in segments {
        encoded.extend_from_slice(&segment.to_be_bytes());
    }
    encoded
}
