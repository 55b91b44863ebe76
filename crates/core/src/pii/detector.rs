//! Script detection for customer names.
//!
//! A [`ScriptDetector`] classifies a plaintext name into the [`NameScript`]
//! that decides how it is masked. Detectors are consulted in order and the
//! first one that recognises the name wins; names nobody claims are treated
//! as space-delimited Latin-style names.

use std::collections::HashSet;

/// How a name is laid out, which determines its masking rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameScript {
    /// Hangul, Han or Kana text, masked per character.
    Ideographic,
    /// Space-delimited name that starts with a family name
    /// (e.g. `Nguyen Van An`); everything but the final token is collapsed.
    SurnameFirst,
    /// Space-delimited given-name-first name (e.g. `John Smith`).
    Latin,
}

/// Classifies plaintext names for masking.
///
/// Implement this to teach the masker about a new locale without touching
/// the masking rules themselves.
pub trait ScriptDetector: Send + Sync {
    /// Short name used in debug output.
    fn name(&self) -> &'static str;

    /// Returns the script of `name`, or `None` if this detector does not
    /// recognise it.
    fn detect(&self, name: &str) -> Option<NameScript>;
}

/// Recognises names written entirely in Hangul, CJK ideographs or Kana.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdeographicDetector;

impl IdeographicDetector {
    fn is_ideographic(c: char) -> bool {
        matches!(
            c,
            '\u{1100}'..='\u{11FF}'      // Hangul Jamo
            | '\u{3040}'..='\u{309F}'    // Hiragana
            | '\u{30A0}'..='\u{30FF}'    // Katakana
            | '\u{3130}'..='\u{318F}'    // Hangul Compatibility Jamo
            | '\u{3400}'..='\u{4DBF}'    // CJK Extension A
            | '\u{4E00}'..='\u{9FFF}'    // CJK Unified Ideographs
            | '\u{AC00}'..='\u{D7A3}'    // Hangul Syllables
            | '\u{F900}'..='\u{FAFF}'    // CJK Compatibility Ideographs
            | '\u{20000}'..='\u{2A6DF}' // CJK Extension B
        )
    }
}

impl ScriptDetector for IdeographicDetector {
    fn name(&self) -> &'static str {
        "ideographic"
    }

    fn detect(&self, name: &str) -> Option<NameScript> {
        let mut chars = name.chars().filter(|c| !c.is_whitespace()).peekable();
        chars.peek()?;
        chars
            .all(Self::is_ideographic)
            .then_some(NameScript::Ideographic)
    }
}

/// Family names that are written first in romanised Vietnamese names.
const DEFAULT_SURNAMES: &[&str] = &[
    "nguyen", "nguyễn", "tran", "trần", "le", "lê", "pham", "phạm", "hoang", "hoàng",
    "huynh", "huỳnh", "phan", "vu", "vũ", "vo", "võ", "dang", "đặng", "bui", "bùi",
    "do", "đỗ", "ho", "hồ", "ngo", "ngô", "duong", "dương", "ly", "lý",
];

/// Recognises surname-first names by their leading token.
///
/// Only multi-token names qualify: a lone surname has no final given name to
/// keep, so it falls through to the Latin rule.
#[derive(Debug, Clone)]
pub struct SurnameFirstDetector {
    surnames: HashSet<String>,
}

impl SurnameFirstDetector {
    /// Build a detector from a custom surname list (matched case-insensitively).
    pub fn new<I, S>(surnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            surnames: surnames
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl Default for SurnameFirstDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SURNAMES)
    }
}

impl ScriptDetector for SurnameFirstDetector {
    fn name(&self) -> &'static str {
        "surname-first"
    }

    fn detect(&self, name: &str) -> Option<NameScript> {
        let mut tokens = name.split_whitespace();
        let first = tokens.next()?;
        tokens.next()?;
        self.surnames
            .contains(&first.to_lowercase())
            .then_some(NameScript::SurnameFirst)
    }
}
