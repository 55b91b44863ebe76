//! Phone number reduction.

/// Number of trailing digits kept from a phone number.
pub const KEPT_DIGITS: usize = 4;

/// Reduce `phone` to its last four digits.
///
/// Non-digit characters are discarded. Inputs carrying four digits or fewer
/// are returned unchanged (trimmed), since they identify nobody.
pub(super) fn mask(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() <= KEPT_DIGITS {
        return phone.trim().to_owned();
    }
    digits
        .get(digits.len() - KEPT_DIGITS..)
        .map(|tail| tail.iter().collect())
        .unwrap_or_default()
}
