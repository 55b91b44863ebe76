//! Masking rules for each [`NameScript`].

use super::detector::NameScript;

/// Glyph substituted for every hidden character.
pub const MASK_GLYPH: char = '*';

/// Fixed replacement for a collapsed surname-first prefix.
const COLLAPSED_PREFIX: &str = "***";

/// Mask an already-trimmed, non-empty `name` according to `script`.
pub(super) fn mask(name: &str, script: NameScript) -> String {
    match script {
        NameScript::Ideographic => mask_ideographic(name),
        NameScript::SurnameFirst => mask_surname_first(name),
        NameScript::Latin => mask_latin(name),
    }
}

fn mask_ideographic(name: &str) -> String {
    let chars: Vec<char> = name.chars().filter(|c| !c.is_whitespace()).collect();
    match chars.as_slice() {
        [] => String::new(),
        [_] => MASK_GLYPH.to_string(),
        [first, _] => [*first, MASK_GLYPH].iter().collect(),
        [first, interior @ .., last] => {
            let mut masked = String::with_capacity(name.len());
            masked.push(*first);
            masked.extend(interior.iter().map(|_| MASK_GLYPH));
            masked.push(*last);
            masked
        }
    }
}

fn mask_surname_first(name: &str) -> String {
    match name.split_whitespace().last() {
        Some(given) => format!("{COLLAPSED_PREFIX} {given}"),
        None => String::new(),
    }
}

fn mask_latin(name: &str) -> String {
    let mut tokens = name.split_whitespace();
    let Some(first) = tokens.next() else {
        return String::new();
    };

    let rest: Vec<&str> = tokens.collect();
    if rest.is_empty() {
        return initial_only(first);
    }

    let mut parts = Vec::with_capacity(rest.len() + 1);
    parts.push(first.to_owned());
    parts.extend(rest.into_iter().map(initial_only));
    parts.join(" ")
}

/// Keep the first character, mask the rest.
fn initial_only(token: &str) -> String {
    let mut chars = token.chars();
    let Some(initial) = chars.next() else {
        return String::new();
    };
    let mut masked = String::with_capacity(token.len());
    masked.push(initial);
    masked.extend(chars.map(|_| MASK_GLYPH));
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ideographic_lengths() {
        assert_eq!(mask_ideographic("김"), "*");
        assert_eq!(mask_ideographic("민수"), "민*");
        assert_eq!(mask_ideographic("김민수"), "김*수");
        assert_eq!(mask_ideographic("남궁민수"), "남**수");
    }

    #[test]
    fn test_ideographic_ignores_spaces() {
        assert_eq!(mask_ideographic("山田 太郎"), "山**郎");
    }

    #[test]
    fn test_surname_first_keeps_final_token() {
        assert_eq!(mask_surname_first("Nguyen Van An"), "*** An");
        assert_eq!(mask_surname_first("Tran Binh"), "*** Binh");
    }

    #[test]
    fn test_latin_two_tokens() {
        assert_eq!(mask_latin("John Smith"), "John S****");
    }

    #[test]
    fn test_latin_middle_tokens() {
        assert_eq!(mask_latin("John Ronald Tolkien"), "John R***** T******");
    }

    #[test]
    fn test_latin_single_token() {
        assert_eq!(mask_latin("Madonna"), "M******");
        assert_eq!(mask_latin("J"), "J");
    }

    #[test]
    fn test_latin_collapses_extra_whitespace() {
        assert_eq!(mask_latin("  Ana   Lopez "), "Ana L****");
    }
}
