//! Newtype IDs for tenants, customers and visits.
//!
//! Customer identifiers are compact per-tenant numerals (`"0001"`..`"9999"`),
//! with `"0000"` reserved for the tenant owner's own record. Older records may
//! carry non-numeral identifiers; those are accepted but never allocated.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur when parsing an identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty.
    #[error("identifier cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("identifier must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains characters outside the allowed set.
    #[error("identifier contains invalid characters")]
    InvalidCharacters,
    /// The number does not fit in the four-digit customer id space.
    #[error("customer number {0} is outside 0000-9999")]
    OutOfRange(u32),
    /// The input is not a UUID.
    #[error("invalid uuid: {0}")]
    InvalidUuid(#[from] uuid::Error),
}

/// Maximum identifier length accepted for tenant and legacy customer IDs.
const MAX_ID_LENGTH: usize = 128;

fn validate_text_id(s: &str) -> Result<&str, IdError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(IdError::Empty);
    }
    if s.len() > MAX_ID_LENGTH {
        return Err(IdError::TooLong { max: MAX_ID_LENGTH });
    }
    if s.chars().any(|c| c.is_control() || c == '/') {
        return Err(IdError::InvalidCharacters);
    }
    Ok(s)
}

/// Identity of the tenant (salon account) that owns a set of customers.
///
/// Supplied by the caller's authentication layer; this crate never derives
/// it from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Parse a tenant ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, or contains control
    /// characters or `/`.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        validate_text_id(s).map(|s| Self(s.to_owned()))
    }

    /// Returns the tenant ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl_pg_text!(TenantId);

/// Per-tenant customer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    /// Number of digits in an allocated identifier.
    pub const WIDTH: usize = 4;

    /// Largest allocatable customer number.
    pub const MAX_NUMBER: u16 = 9999;

    const OWNER: &'static str = "0000";

    /// Parse a customer ID, accepting both numerals and legacy identifiers.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, or contains control
    /// characters or `/`.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        validate_text_id(s).map(|s| Self(s.to_owned()))
    }

    /// Build the zero-padded identifier for `number`.
    ///
    /// # Errors
    ///
    /// Returns `IdError::OutOfRange` if `number` is above 9999.
    pub fn from_number(number: u16) -> Result<Self, IdError> {
        if number > Self::MAX_NUMBER {
            return Err(IdError::OutOfRange(u32::from(number)));
        }
        Ok(Self(format!("{number:0width$}", width = Self::WIDTH)))
    }

    /// The reserved identifier of the tenant owner's own record.
    #[must_use]
    pub fn owner() -> Self {
        Self(Self::OWNER.to_owned())
    }

    /// Whether this is the reserved owner identifier.
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.0 == Self::OWNER
    }

    /// The numeric value, if this is a numeral identifier of at most four digits.
    ///
    /// Legacy identifiers (anything that is not purely ASCII digits) return `None`.
    #[must_use]
    pub fn number(&self) -> Option<u16> {
        if self.0.is_empty() || self.0.len() > Self::WIDTH {
            return None;
        }
        if !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }

    /// Returns the customer ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CustomerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl_pg_text!(CustomerId);

/// Identifier of a visit (a customer's child record).
///
/// Random UUIDs, so a visit id reveals nothing about its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitId(Uuid);

impl VisitId {
    /// Wrap an existing UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a new random visit ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a visit ID from its hyphenated string form.
    ///
    /// # Errors
    ///
    /// Returns `IdError::InvalidUuid` if the input is not a UUID.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for VisitId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}
