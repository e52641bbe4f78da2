// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use std::str::FromStr;

use alloy::primitives::Address;

use crate::error::{CustodyError, CustodyResult};

/// Gas limit of a plain value transfer.
pub const DEFAULT_GAS_LIMIT: u64 = 21_000;

/// Default RPC endpoint (local development node).
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// How a user-supplied string is turned into bytes before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataEncoding {
    /// Raw UTF-8 text
    #[default]
    Utf8,
    /// Hexadecimal, with or without `0x` prefix
    Hex,
}

impl DataEncoding {
    /// Decode `data` into bytes according to this encoding.
    pub fn decode(self, data: &str) -> CustodyResult<Vec<u8>> {
        match self {
            DataEncoding::Utf8 => Ok(data.as_bytes().to_vec()),
            DataEncoding::Hex => alloy::hex::decode(data.trim())
                .map_err(|e| CustodyError::validation(format!("Invalid hex data: {e}"))),
        }
    }
}

impl FromStr for DataEncoding {
    type Err = CustodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "utf8" | "utf-8" | "text" => Ok(DataEncoding::Utf8),
            "hex" => Ok(DataEncoding::Hex),
            other => Err(CustodyError::validation(format!(
                "Unsupported encoding `{other}` (expected `utf8` or `hex`)"
            ))),
        }
    }
}

/// Parse an EVM address (0x + 40 hex chars). Checksum casing is not enforced.
pub fn parse_address(raw: &str) -> CustodyResult<Address> {
    let raw = raw.trim();
    if !raw.starts_with("0x") || raw.len() != 42 {
        return Err(CustodyError::validation(format!(
            "Address must be 0x followed by 40 hex characters: `{raw}`"
        )));
    }
    Address::from_str(raw).map_err(|e| CustodyError::validation(format!("Invalid address `{raw}`: {e}")))
}

/// Parse a list of addresses, failing on the first malformed entry.
pub fn parse_address_list<I, S>(raw: I) -> CustodyResult<Vec<Address>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter(|s| !s.as_ref().trim().is_empty())
        .map(|s| parse_address(s.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_parses_names() {
        assert_eq!("utf8".parse::<DataEncoding>().unwrap(), DataEncoding::Utf8);
        assert_eq!("".parse::<DataEncoding>().unwrap(), DataEncoding::Utf8);
        assert_eq!("HEX".parse::<DataEncoding>().unwrap(), DataEncoding::Hex);
        assert!("base64".parse::<DataEncoding>().is_err());
    }

    #[test]
    fn hex_encoding_accepts_prefix() {
        assert_eq!(DataEncoding::Hex.decode("0x6869").unwrap(), b"hi".to_vec());
        assert_eq!(DataEncoding::Hex.decode("6869").unwrap(), b"hi".to_vec());
        assert!(DataEncoding::Hex.decode("0xzz").is_err());
        assert_eq!(DataEncoding::Utf8.decode("0x6869").unwrap(), b"0x6869".to_vec());
    }

    #[test]
    fn addresses_compare_by_value() {
        let lower = parse_address("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap();
        let mixed = parse_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap();
        assert_eq!(lower, mixed);
    }

    #[test]
    fn malformed_addresses_rejected() {
        assert!(parse_address("f39fd6e51aad88f6f4ce6ab8827279cfffb92266").is_err());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xg39fd6e51aad88f6f4ce6ab8827279cfffb92266").is_err());
    }

    #[test]
    fn address_list_skips_blanks() {
        let list = parse_address_list(["0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266", " "]).unwrap();
        assert_eq!(list.len(), 1);
        assert!(parse_address_list(["nope"]).is_err());
    }
}
