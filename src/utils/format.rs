//! Formatting helpers for command output.

use crate::crypto::Hash256;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};

/// Format a hash as a short hex string (first 8 characters)
pub fn format_hash_short(hash: &Hash256) -> String {
    format!("{}...", &hash.to_hex()[..8])
}

/// Format a Unix timestamp in seconds as RFC 3339
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| format!("{}s", timestamp))
}

/// Render bytes as UTF-8 when printable, hex otherwise
pub fn format_item(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if !s.chars().any(char::is_control) => s.to_string(),
        _ => format!("0x{}", hex::encode(bytes)),
    }
}

/// Parse a hex string, with or without a `0x` prefix
pub fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| LedgerError::Crypto(format!("Invalid hex: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hash_short() {
        assert_eq!(format_hash_short(&Hash256::zero()), "00000000...");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(744768000), "1993-08-08T00:00:00+00:00");
    }

    #[test]
    fn test_format_item() {
        assert_eq!(format_item(b"lynn"), "lynn");
        assert_eq!(format_item(&[0x00, 0xff]), "0x00ff");
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("0xabcd").unwrap(), vec![0xab, 0xcd]);
        assert_eq!(parse_hex("01").unwrap(), vec![0x01]);
        assert!(parse_hex("zz").is_err());
    }
}
