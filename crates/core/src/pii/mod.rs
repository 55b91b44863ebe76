//! Irreversible reduction of customer names and phone numbers.
//!
//! Masking happens once, at write time, on freshly supplied plaintext. The
//! results are wrapped in [`DisplayName`] and [`PhoneTail`]; those types can
//! only come from [`PiiTransform`], from the store (already reduced), or from
//! the explicit owner-record constructors, so a stored value is never fed back
//! through the masker.
//!
//! ```
//! use salon_crm_core::PiiTransform;
//!
//! let pii = PiiTransform::default();
//! assert_eq!(pii.mask_name("김민수").as_str(), "김*수");
//! assert_eq!(pii.mask_name("John Smith").as_str(), "John S****");
//! assert_eq!(pii.mask_phone("010-1234-5678").as_str(), "5678");
//! ```

mod detector;
mod name;
mod phone;

use core::fmt;

use serde::{Deserialize, Serialize};

pub use detector::{IdeographicDetector, NameScript, ScriptDetector, SurnameFirstDetector};
pub use name::MASK_GLYPH;

/// A customer name in the form it is persisted and displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    /// Wrap a value read back from the store. It is already masked.
    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Keep `plain` as-is. Only the tenant owner's own record is stored unmasked.
    #[must_use]
    pub fn owner(plain: &str) -> Self {
        Self(plain.trim().to_owned())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the name and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl_pg_text!(DisplayName);

/// The retained tail of a phone number (at most four digits once reduced).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneTail(String);

impl PhoneTail {
    /// Wrap a value read back from the store. It is already reduced.
    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Keep `plain` as-is. Only the tenant owner's own record is stored unmasked.
    #[must_use]
    pub fn owner(plain: &str) -> Self {
        Self(plain.trim().to_owned())
    }

    /// Returns the phone tail as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the phone tail and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PhoneTail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl_pg_text!(PhoneTail);

/// Pure, deterministic masker for names and phone numbers.
///
/// Names are classified by the registered [`ScriptDetector`]s in order; the
/// first match decides the rule, and unclaimed names use [`NameScript::Latin`].
pub struct PiiTransform {
    detectors: Vec<Box<dyn ScriptDetector>>,
}

impl PiiTransform {
    /// Create a transform that consults exactly `detectors`, in order.
    #[must_use]
    pub fn new(detectors: Vec<Box<dyn ScriptDetector>>) -> Self {
        Self { detectors }
    }

    /// Register an additional detector, consulted before the existing ones.
    #[must_use]
    pub fn with_detector(mut self, detector: impl ScriptDetector + 'static) -> Self {
        self.detectors.insert(0, Box::new(detector));
        self
    }

    /// Classify a plaintext name.
    #[must_use]
    pub fn detect(&self, name: &str) -> NameScript {
        self.detectors
            .iter()
            .find_map(|d| d.detect(name))
            .unwrap_or(NameScript::Latin)
    }

    /// Mask a plaintext name. Surrounding whitespace is ignored; an empty
    /// name yields an empty display name.
    #[must_use]
    pub fn mask_name(&self, plain: &str) -> DisplayName {
        let trimmed = plain.trim();
        if trimmed.is_empty() {
            return DisplayName(String::new());
        }
        DisplayName(name::mask(trimmed, self.detect(trimmed)))
    }

    /// Reduce a plaintext phone number to its last four digits.
    #[must_use]
    pub fn mask_phone(&self, plain: &str) -> PhoneTail {
        PhoneTail(phone::mask(plain))
    }
}

impl Default for PiiTransform {
    fn default() -> Self {
        Self::new(vec![
            Box::new(IdeographicDetector),
            Box::new(SurnameFirstDetector::default()),
        ])
    }
}

impl fmt::Debug for PiiTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.detectors.iter().map(|d| d.name()).collect();
        f.debug_struct("PiiTransform")
            .field("detectors", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysIdeographic;

    impl ScriptDetector for AlwaysIdeographic {
        fn name(&self) -> &'static str {
            "always"
        }

        fn detect(&self, _name: &str) -> Option<NameScript> {
            Some(NameScript::Ideographic)
        }
    }

    #[test]
    fn test_mask_name_by_script() {
        let pii = PiiTransform::default();
        assert_eq!(pii.mask_name("김민수").as_str(), "김*수");
        assert_eq!(pii.mask_name("김").as_str(), "*");
        assert_eq!(pii.mask_name("John Smith").as_str(), "John S****");
        assert_eq!(pii.mask_name("Nguyen Van An").as_str(), "*** An");
    }

    #[test]
    fn test_mask_name_is_deterministic() {
        let pii = PiiTransform::default();
        assert_eq!(pii.mask_name("Jane Doe"), pii.mask_name("Jane Doe"));
    }

    #[test]
    fn test_mask_name_empty() {
        let pii = PiiTransform::default();
        assert_eq!(pii.mask_name("   ").as_str(), "");
    }

    #[test]
    fn test_unclaimed_names_are_latin() {
        let pii = PiiTransform::new(Vec::new());
        assert_eq!(pii.detect("김민수"), NameScript::Latin);
        assert_eq!(pii.mask_name("Nguyen Van An").as_str(), "Nguyen V** A*");
    }

    #[test]
    fn test_custom_detector_takes_precedence() {
        let pii = PiiTransform::default().with_detector(AlwaysIdeographic);
        assert_eq!(pii.mask_name("Ann").as_str(), "A*n");
    }

    #[test]
    fn test_mask_phone() {
        let pii = PiiTransform::default();
        assert_eq!(pii.mask_phone("010-1234-5678").as_str(), "5678");
        assert_eq!(pii.mask_phone("123").as_str(), "123");
    }

    #[test]
    fn test_owner_values_are_verbatim() {
        assert_eq!(DisplayName::owner(" 김민수 ").as_str(), "김민수");
        assert_eq!(PhoneTail::owner("010-1234-5678").as_str(), "010-1234-5678");
    }

    #[test]
    fn test_debug_lists_detectors() {
        let pii = PiiTransform::default();
        let debug = format!("{pii:?}");
        assert!(debug.contains("ideographic"));
        assert!(debug.contains("surname-first"));
    }
}
