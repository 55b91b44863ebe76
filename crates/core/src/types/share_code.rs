//! Share code (capability token) type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShareCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareCodeError {
    /// The input is shorter than the minimum token length.
    #[error("share code must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input is longer than the maximum token length.
    #[error("share code must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains characters outside the URL-safe alphabet.
    #[error("share code contains characters outside [A-Za-z0-9_-]")]
    InvalidCharacters,
}

/// An opaque bearer token granting read access to one customer's shared view.
///
/// Codes are unique across every tenant and carry no tenant or customer
/// information. `Debug` output is redacted; use [`ShareCode::as_str`] or
/// `Display` only where the code is meant to be shown (links).
///
/// ## Constraints
///
/// - Length: 12-64 characters
/// - Alphabet: `A-Z a-z 0-9 - _` (URL-safe, no padding)
///
/// ## Examples
///
/// ```
/// use salon_crm_core::ShareCode;
///
/// assert!(ShareCode::parse("q3Vx9_Lm-0aZ7rTw").is_ok());
/// assert!(ShareCode::parse("short").is_err());
/// assert!(ShareCode::parse("has spaces in it!").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareCode(String);

impl ShareCode {
    /// Minimum length of a share code.
    pub const MIN_LENGTH: usize = 12;

    /// Maximum length of a share code.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `ShareCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is outside 12-64 characters or uses
    /// characters outside the URL-safe alphabet.
    pub fn parse(s: &str) -> Result<Self, ShareCodeError> {
        if s.len() < Self::MIN_LENGTH {
            return Err(ShareCodeError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(ShareCodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(ShareCodeError::InvalidCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ShareCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShareCode([REDACTED])")
    }
}

impl fmt::Display for ShareCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ShareCode {
    type Err = ShareCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ShareCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl_pg_text!(ShareCode);
