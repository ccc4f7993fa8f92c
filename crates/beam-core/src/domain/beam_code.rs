//! The beam code: the shared secret an absorber must present.
//!
//! Codes are short enough to read out loud: eight lowercase hex characters
//! split in two groups, e.g. `3fa9-07c2`, taken from a random UUID v4.
//! Comparison is exact and byte-for-byte; no normalisation happens on either
//! side beyond trimming surrounding whitespace when parsing user input.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

use crate::protocol::messages::MAX_PAYLOAD_SIZE;

/// Why a string could not be used as a beam code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BeamCodeError {
    #[error("beam code is empty")]
    Empty,

    #[error("beam code is {0} bytes, more than a frame can carry")]
    TooLong(usize),
}

/// A validated beam code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BeamCode(String);

impl BeamCode {
    /// Generates a fresh random code.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", &hex[..4], &hex[4..8]))
    }

    /// Validates a user-supplied code.
    ///
    /// # Errors
    ///
    /// Returns [`BeamCodeError`] if the trimmed input is empty or longer than
    /// one frame payload.
    pub fn parse(input: &str) -> Result<Self, BeamCodeError> {
        let code = input.trim();
        if code.is_empty() {
            return Err(BeamCodeError::Empty);
        }
        if code.len() > MAX_PAYLOAD_SIZE {
            return Err(BeamCodeError::TooLong(code.len()));
        }
        Ok(Self(code.to_string()))
    }

    /// `true` if `presented` (a `BEAM_CODE` payload) is exactly this code.
    pub fn matches(&self, presented: &[u8]) -> bool {
        self.0.as_bytes() == presented
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for BeamCode {
    type Err = BeamCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BeamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
