//! Single-byte XOR stream cipher for payload lines.
//!
//! # Wire Format
//!
//! Each ciphertext byte travels as its decimal value, tokens separated by
//! single spaces:
//!
//! ```text
//! "Hey" ^ 0x00  ->  "72 101 121"
//! ```
//!
//! The cipher carries no authentication tag. A corrupted token that is still
//! a valid byte value decodes to a corrupted byte without detection.

use crate::error::{ProtocolError, Result};

/// Separator between ciphertext tokens on the wire.
pub const TOKEN_SEPARATOR: char = ' ';

/// Byte-valued key applied uniformly to every payload byte of a session.
///
/// A key of 0 is accepted and makes the cipher a pass-through.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CipherKey(u8);

impl CipherKey {
    /// Wraps a raw key byte.
    #[inline]
    pub fn new(key: u8) -> Self {
        Self(key)
    }

    /// Raw key byte.
    #[inline]
    pub fn value(self) -> u8 {
        self.0
    }

    /// XORs every plaintext byte with the key.
    pub fn encode(self, plaintext: &[u8]) -> Vec<u8> {
        plaintext.iter().map(|b| b ^ self.0).collect()
    }

    /// Reverses [`encode`](Self::encode). The scheme is an involution.
    pub fn decode(self, ciphertext: &[u8]) -> Vec<u8> {
        self.encode(ciphertext)
    }

    /// Encodes plaintext and renders it as a wire line (without newline).
    pub fn encode_line(self, plaintext: &[u8]) -> String {
        self.encode(plaintext)
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parses a wire line of decimal tokens and decodes it.
    ///
    /// Extra whitespace between tokens is tolerated. Any token that is not a
    /// decimal integer in `[0, 255]` rejects the whole line.
    pub fn decode_line(self, line: &str) -> Result<Vec<u8>> {
        let tokens = parse_tokens(line)?;
        Ok(self.decode(&tokens))
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey([REDACTED])")
    }
}

/// Splits a payload line into ciphertext bytes.
pub fn parse_tokens(line: &str) -> Result<Vec<u8>> {
    line.split_whitespace()
        .map(|token| {
            token.parse::<u8>().map_err(|_| {
                ProtocolError::MalformedPayload(format!("token '{}' is not a byte value", token))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_key_is_pass_through() {
        let key = CipherKey::new(0);
        assert_eq!(key.encode(b"Hey"), b"Hey".to_vec());
        assert_eq!(key.encode_line(b"Hey"), "72 101 121");
    }

    #[test]
    fn test_involution_for_every_key() {
        let samples: [&[u8]; 4] = [b"", b"Hello, world!", &[0, 1, 127, 128, 255], b"\n\r\t"];
        for k in 0..=255u8 {
            let key = CipherKey::new(k);
            for sample in samples {
                assert_eq!(key.decode(&key.encode(sample)), sample.to_vec(), "key {}", k);
                let line = key.encode_line(sample);
                assert_eq!(key.decode_line(&line).unwrap(), sample.to_vec(), "key {}", k);
            }
        }
    }

    #[test]
    fn test_known_ciphertext() {
        let key = CipherKey::new(246);
        let line = key.encode_line(b"Hey");
        assert_eq!(line, "190 147 143");
        assert_eq!(key.decode_line("190 147 143").unwrap(), b"Hey".to_vec());
    }

    #[test]
    fn test_decode_tolerates_extra_whitespace() {
        let key = CipherKey::new(0);
        assert_eq!(key.decode_line("  72   101 121 ").unwrap(), b"Hey".to_vec());
        assert!(key.decode_line("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_non_numeric_token() {
        let key = CipherKey::new(9);
        let err = key.decode_line("72 hello 121").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedPayload(_)));
    }

    #[test]
    fn test_decode_rejects_out_of_range_token() {
        let key = CipherKey::new(9);
        assert!(key.decode_line("72 256").is_err());
        assert!(key.decode_line("-1").is_err());
    }

    #[test]
    fn test_wrong_key_garbles_plaintext() {
        let line = CipherKey::new(17).encode_line(b"secret");
        let decoded = CipherKey::new(18).decode_line(&line).unwrap();
        assert_ne!(decoded, b"secret".to_vec());
    }

    #[test]
    fn test_debug_redacts_key() {
        assert_eq!(format!("{:?}", CipherKey::new(42)), "CipherKey([REDACTED])");
    }
}
