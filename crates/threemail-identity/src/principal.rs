//! Canonical account identifiers.
//!
//! A principal is an opaque byte string of at most 29 bytes. Its textual form
//! is the lower-case RFC 4648 base32 encoding (no padding) of the big-endian
//! CRC-32 of the bytes followed by the bytes themselves, split into groups of
//! five characters joined by `-`:
//!
//! ```text
//! []      -> aaaaa-aa
//! [0x04]  -> 2vxsx-fae
//! ```
//!
//! Only the exact canonical text parses. Upper-case input, missing or
//! misplaced dashes and trailing garbage bits are all rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha224};

/// Maximum number of raw bytes in a principal.
pub const MAX_LENGTH: usize = 29;

/// Trailing tag byte of principals derived from a public key.
const SELF_AUTHENTICATING_TAG: u8 = 0x02;

/// The single byte of the anonymous principal.
const ANONYMOUS_TAG: u8 = 0x04;

const CHECKSUM_LENGTH: usize = 4;
const GROUP_LENGTH: usize = 5;
const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Reasons a principal could not be built or parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrincipalError {
    /// More than [`MAX_LENGTH`] raw bytes.
    #[error("principal is {0} bytes long, the maximum is 29")]
    TooLong(usize),

    /// The text decodes to fewer bytes than the checksum needs.
    #[error("text is too short to hold a checksum")]
    TooShort,

    /// A character outside the base32 alphabet.
    #[error("text is not valid base32")]
    InvalidBase32,

    /// The embedded checksum does not match the bytes.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// Decodes correctly but is not spelled canonically.
    #[error("text is not in canonical form (expected {expected})")]
    NotCanonical {
        /// The canonical spelling of the decoded principal.
        expected: String,
    },
}

/// Canonical account identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Principal(Vec<u8>);

impl Principal {
    /// Creates a principal from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PrincipalError::TooLong`] for more than 29 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PrincipalError> {
        if bytes.len() > MAX_LENGTH {
            return Err(PrincipalError::TooLong(bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// The anonymous principal (`2vxsx-fae`).
    #[must_use]
    pub fn anonymous() -> Self {
        Self(vec![ANONYMOUS_TAG])
    }

    /// Derives the principal owned by a DER-encoded public key.
    #[must_use]
    pub fn self_authenticating(public_key: &[u8]) -> Self {
        let mut bytes = Sha224::digest(public_key).to_vec();
        bytes.push(SELF_AUTHENTICATING_TAG);
        Self(bytes)
    }

    /// Parses the canonical textual form.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not the canonical encoding of some
    /// principal.
    pub fn from_text(text: &str) -> Result<Self, PrincipalError> {
        let compact: String = text
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let decoded = base32_decode(&compact).ok_or(PrincipalError::InvalidBase32)?;
        if decoded.len() < CHECKSUM_LENGTH {
            return Err(PrincipalError::TooShort);
        }

        let (checksum, bytes) = decoded.split_at(CHECKSUM_LENGTH);
        let principal = Self::from_slice(bytes)?;
        if checksum != crc32(bytes).to_be_bytes() {
            return Err(PrincipalError::ChecksumMismatch);
        }

        let expected = principal.to_text();
        if expected != text {
            return Err(PrincipalError::NotCanonical { expected });
        }

        Ok(principal)
    }

    /// Returns the canonical textual form.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut data = Vec::with_capacity(CHECKSUM_LENGTH + self.0.len());
        data.extend_from_slice(&crc32(&self.0).to_be_bytes());
        data.extend_from_slice(&self.0);

        let encoded = base32_encode(&data);
        let mut text = String::with_capacity(encoded.len() + encoded.len() / GROUP_LENGTH);
        for (i, c) in encoded.chars().enumerate() {
            if i > 0 && i % GROUP_LENGTH == 0 {
                text.push('-');
            }
            text.push(c);
        }
        text
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns true for the anonymous principal.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0 == [ANONYMOUS_TAG]
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.to_text())
    }
}

impl FromStr for Principal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

impl Serialize for Principal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_text())
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::from_text(&text).map_err(serde::de::Error::custom)
    }
}

const CRC32_TABLE: [u32; 256] = crc32_table();

#[allow(clippy::cast_possible_truncation)]
const fn crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 == 0 {
                crc >> 1
            } else {
                0xEDB8_8320 ^ (crc >> 1)
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// CRC-32 (IEEE 802.3).
fn crc32(data: &[u8]) -> u32 {
    let mut crc = u32::MAX;
    for &byte in data {
        let index = (crc ^ u32::from(byte)) & 0xFF;
        crc = CRC32_TABLE[index as usize] ^ (crc >> 8);
    }
    !crc
}

fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(char::from(BASE32_ALPHABET[((buffer >> bits) & 0x1F) as usize]));
        }
        buffer &= (1 << bits) - 1;
    }

    if bits > 0 {
        out.push(char::from(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1F) as usize]));
    }
    out
}

#[allow(clippy::cast_possible_truncation)]
fn base32_decode(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for c in text.bytes() {
        let value = match c {
            b'a'..=b'z' => c - b'a',
            b'2'..=b'7' => c - b'2' + 26,
            _ => return None,
        };
        buffer = (buffer << 5) | u32::from(value);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
        buffer &= (1 << bits) - 1;
    }

    Some(out)
}
