//! Revert decoding and the table mapping known contract failures to
//! user-facing error kinds.
//!
//! Reverts are normalized into a [`RevertCode`] first (an `Error(string)`
//! reason, lowercased and stripped of node prefixes, or a 4-byte custom error
//! selector) and then looked up by exact match. Anything not in the table
//! stays a generic revert.

use std::fmt;

use alloy::primitives::Bytes;
use alloy::sol_types::{Revert, SolError};
use alloy::transports::{RpcError, TransportErrorKind};
use serde::{Deserialize, Serialize};

use crate::chain::contracts::{IBrainToken, IQnA};

/// Normalized revert payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertCode {
    /// `Error(string)` reason after [`normalize_reason`].
    Reason(String),
    /// Custom error selector.
    Selector([u8; 4]),
}

impl fmt::Display for RevertCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertCode::Reason(reason) => write!(f, "{}", reason),
            RevertCode::Selector(sel) => write!(f, "custom error 0x{}", alloy::primitives::hex::encode(sel)),
        }
    }
}

/// Contract failure conditions the relay reports with an actionable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertKind {
    NotOpen,
    AlreadyAccepted,
    NotAuthorized,
    NotOwner,
    InvalidId,
    InsufficientAllowance,
    InsufficientBalance,
}

impl RevertKind {
    pub fn message(&self) -> &'static str {
        match self {
            RevertKind::NotOpen => "Question is not open (already resolved, cancelled, or expired)",
            RevertKind::AlreadyAccepted => "This question already has an accepted answer",
            RevertKind::NotAuthorized => "Caller is not authorized for this question",
            RevertKind::NotOwner => "Backend wallet is not the contract owner",
            RevertKind::InvalidId => "Invalid question or answer ID",
            RevertKind::InsufficientAllowance => {
                "Insufficient token allowance. Approve the contract to spend your tokens first."
            }
            RevertKind::InsufficientBalance => "Insufficient token balance for this transfer",
        }
    }

    /// Stable identifier used in API error bodies and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            RevertKind::NotOpen => "not_open",
            RevertKind::AlreadyAccepted => "already_accepted",
            RevertKind::NotAuthorized => "not_authorized",
            RevertKind::NotOwner => "not_owner",
            RevertKind::InvalidId => "invalid_id",
            RevertKind::InsufficientAllowance => "insufficient_allowance",
            RevertKind::InsufficientBalance => "insufficient_balance",
        }
    }
}

/// Known `Error(string)` reasons, already normalized.
const REASON_TABLE: &[(&str, RevertKind)] = &[
    ("not open", RevertKind::NotOpen),
    ("already accepted", RevertKind::AlreadyAccepted),
    ("not asker", RevertKind::NotAuthorized),
    ("not authorized", RevertKind::NotAuthorized),
    ("ownable: caller is not the owner", RevertKind::NotOwner),
    ("invalid answer", RevertKind::InvalidId),
    ("invalid question", RevertKind::InvalidId),
    ("invalid id", RevertKind::InvalidId),
    ("erc20: insufficient allowance", RevertKind::InsufficientAllowance),
    ("erc20: transfer amount exceeds balance", RevertKind::InsufficientBalance),
];

/// Known custom errors.
const SELECTOR_TABLE: &[([u8; 4], RevertKind)] = &[
    (IQnA::NotOpen::SELECTOR, RevertKind::NotOpen),
    (IQnA::AlreadyAccepted::SELECTOR, RevertKind::AlreadyAccepted),
    (IQnA::NotAuthorized::SELECTOR, RevertKind::NotAuthorized),
    (IQnA::InvalidQuestion::SELECTOR, RevertKind::InvalidId),
    (IQnA::InvalidAnswer::SELECTOR, RevertKind::InvalidId),
    (IBrainToken::OwnableUnauthorizedAccount::SELECTOR, RevertKind::NotOwner),
    (IBrainToken::ERC20InsufficientAllowance::SELECTOR, RevertKind::InsufficientAllowance),
    (IBrainToken::ERC20InsufficientBalance::SELECTOR, RevertKind::InsufficientBalance),
];

/// Look up a normalized code in the mapping table.
pub fn classify(code: &RevertCode) -> Option<RevertKind> {
    match code {
        RevertCode::Reason(reason) => REASON_TABLE
            .iter()
            .find(|(known, _)| *known == reason.as_str())
            .map(|(_, kind)| *kind),
        RevertCode::Selector(sel) => SELECTOR_TABLE
            .iter()
            .find(|(known, _)| known == sel)
            .map(|(_, kind)| *kind),
    }
}

/// Lowercase, trim, and strip the prefixes nodes put in front of reasons.
pub fn normalize_reason(raw: &str) -> String {
    let mut reason = raw.trim().to_ascii_lowercase();
    for prefix in ["execution reverted:", "execution reverted", "reverted:"] {
        if let Some(rest) = reason.strip_prefix(prefix) {
            reason = rest.trim().to_string();
            break;
        }
    }
    reason.trim_end_matches('.').trim().to_string()
}

/// Decode ABI revert data into a normalized code.
pub fn decode_revert_data(data: &[u8]) -> Option<RevertCode> {
    if data.len() < 4 {
        return None;
    }
    if data[..4] == Revert::SELECTOR {
        return Revert::abi_decode(data)
            .ok()
            .map(|revert| RevertCode::Reason(normalize_reason(&revert.reason)));
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&data[..4]);
    Some(RevertCode::Selector(selector))
}

/// Extract a revert code from a JSON-RPC error response, if it carries one.
pub fn revert_from_rpc_error(err: &RpcError<TransportErrorKind>) -> Option<RevertCode> {
    let payload = err.as_error_resp()?;
    if let Some(data) = payload.as_revert_data() {
        if let Some(code) = decode_revert_data(&data) {
            return Some(code);
        }
    }
    let message = payload.message.as_ref();
    if message.to_ascii_lowercase().starts_with("execution reverted") {
        let reason = normalize_reason(message);
        if !reason.is_empty() {
            return Some(RevertCode::Reason(reason));
        }
    }
    None
}

/// Convenience for encoded revert bytes held as [`Bytes`].
pub fn decode_revert_bytes(data: &Bytes) -> Option<RevertCode> {
    decode_revert_data(data.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    #[test]
    fn test_normalize_strips_node_prefix() {
        assert_eq!(normalize_reason("execution reverted: Not open"), "not open");
        assert_eq!(normalize_reason("  Already accepted. "), "already accepted");
        assert_eq!(normalize_reason("Ownable: caller is not the owner"), "ownable: caller is not the owner");
    }

    #[test]
    fn test_reason_lookup_is_exact() {
        let known = RevertCode::Reason("not open".to_string());
        assert_eq!(classify(&known), Some(RevertKind::NotOpen));

        // A reason that merely contains a known phrase is not matched
        let unknown = RevertCode::Reason("question not open yet but soon".to_string());
        assert_eq!(classify(&unknown), None);
    }

    #[test]
    fn test_error_string_revert_data_decoded() {
        let data = Revert::from("Already accepted").abi_encode();
        let code = decode_revert_data(&data).unwrap();
        assert_eq!(code, RevertCode::Reason("already accepted".to_string()));
        assert_eq!(classify(&code), Some(RevertKind::AlreadyAccepted));
    }

    #[test]
    fn test_custom_error_selector_decoded() {
        let data = IBrainToken::ERC20InsufficientAllowance {
            spender: Address::ZERO,
            allowance: U256::ZERO,
            needed: U256::from(5),
        }
        .abi_encode();
        let code = decode_revert_bytes(&Bytes::from(data)).unwrap();
        assert_eq!(classify(&code), Some(RevertKind::InsufficientAllowance));

        let code = decode_revert_data(&IQnA::NotOpen {}.abi_encode()).unwrap();
        assert_eq!(classify(&code), Some(RevertKind::NotOpen));
    }

    #[test]
    fn test_unknown_selector_stays_generic() {
        let code = decode_revert_data(&[0xde, 0xad, 0xbe, 0xef]).unwrap();
        assert_eq!(classify(&code), None);
        assert_eq!(code.to_string(), "custom error 0xdeadbeef");
    }

    #[test]
    fn test_short_data_ignored() {
        assert!(decode_revert_data(&[0x01, 0x02]).is_none());
    }
}
