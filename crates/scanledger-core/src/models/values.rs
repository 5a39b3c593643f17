//! Validated value types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// SHA-256 content hash as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentHash(String);

impl DocumentHash {
    /// Length of a hex-encoded SHA-256 digest.
    pub const LEN: usize = 64;

    /// Parse and normalize a hash. Surrounding whitespace is ignored and
    /// letters are lowercased.
    pub fn parse(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        if normalized.len() != Self::LEN {
            return Err(IngestError::Validation(format!(
                "document hash must be {} hex characters, got {}",
                Self::LEN,
                normalized.len()
            )));
        }
        if !normalized.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IngestError::Validation(
                "document hash contains non-hex characters".to_string(),
            ));
        }
        Ok(Self(normalized))
    }

    /// Build from a raw 32-byte digest.
    pub fn from_digest(digest: &[u8]) -> Result<Self> {
        Self::parse(&hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentHash {
    type Error = IngestError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DocumentHash> for String {
    fn from(hash: DocumentHash) -> Self {
        hash.0
    }
}

/// Confidence in the closed range [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ConfidenceScore(f64);

impl ConfidenceScore {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(IngestError::Validation(format!("confidence must be finite, got {}", value)));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(IngestError::Validation(format!(
                "confidence must be between 0 and 1, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Clamp an arbitrary value into range. NaN becomes zero.
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for ConfidenceScore {
    type Error = IngestError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ConfidenceScore> for f64 {
    fn from(score: ConfidenceScore) -> Self {
        score.0
    }
}

impl fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
