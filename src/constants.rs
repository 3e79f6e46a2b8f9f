//! Constants and protocol definitions for Solana Ledger App communication

/// Application class byte for the Solana Ledger app.
pub const SOLANA_CLA: u8 = 0xE0;

pub const INS_GET_APP_CONFIG: u8 = 0x04;
pub const INS_GET_PUBKEY: u8 = 0x05;
pub const INS_SIGN_MESSAGE: u8 = 0x06;

pub const P1_NON_CONFIRM: u8 = 0x00;
pub const P1_CONFIRM: u8 = 0x01;

/// P2 flag: this chunk extends a payload started earlier.
pub const P2_EXTEND: u8 = 0x01;
/// P2 flag: more chunks follow this one.
pub const P2_MORE: u8 = 0x02;

/// Maximum payload bytes per physical APDU exchange.
pub const MAX_PAYLOAD: usize = 255;

/// Every reply ends with a 2-byte status word.
pub const STATUS_LEN: usize = 2;
pub const SW_OK: u16 = 0x9000;
/// Operator declined the on-device confirmation prompt.
pub const SW_USER_REJECTED: u16 = 0x6985;

/// BIP44 purpose segment (pre-hardening).
pub const BIP44_PURPOSE: u32 = 44;
/// Solana's registered BIP44 coin type (pre-hardening).
pub const BIP44_COIN_TYPE: u32 = 501;
