//! Phone validation — lenient on formatting, strict on digit count.
//!
//! Accepts `+7XXXXXXXXXX`, `8XXXXXXXXXX`, `7XXXXXXXXXX` (11 digits total)
//! but not 10-digit national numbers without the country/trunk digit.

/// Validate a free-form phone string.
pub fn validate(raw: &str) -> bool {
    normalize(raw).is_some()
}

/// Validate and normalize a free-form phone string.
///
/// Whitespace, hyphens and parentheses are stripped first. A `+`-prefixed
/// input must then be exactly `+` followed by 11 digits. Anything else is
/// accepted iff discarding every remaining non-digit leaves exactly 11
/// digits — deliberately permissive about clutter placement, strict only
/// on digit count.
pub fn normalize(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect();

    if let Some(rest) = cleaned.strip_prefix('+') {
        (rest.len() == 11 && rest.chars().all(|c| c.is_ascii_digit())).then_some(cleaned)
    } else {
        let digits: String = cleaned.chars().filter(char::is_ascii_digit).collect();
        (digits.len() == 11).then_some(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_international_form() {
        assert!(validate("+79161234567"));
    }

    #[test]
    fn accepts_trunk_prefix_forms() {
        assert!(validate("89161234567"));
        assert!(validate("79161234567"));
    }

    #[test]
    fn rejects_ten_digit_national_number() {
        assert!(!validate("9161234567"));
    }

    #[test]
    fn cleaning_removes_separators() {
        assert!(validate("+7 (916) 123-45-67"));
        assert_eq!(normalize("+7 (916) 123-45-67").as_deref(), Some("+79161234567"));
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert!(!validate("abc"));
        assert!(!validate(""));
    }

    #[test]
    fn plus_form_must_be_digits_only() {
        assert!(!validate("+7916a123456"));
        assert!(!validate("+791612345678"), "12 digits after +");
        assert!(!validate("+7916123456"), "10 digits after +");
    }

    #[test]
    fn bare_form_keeps_only_digits() {
        assert_eq!(normalize("8 (916) 123-45-67").as_deref(), Some("89161234567"));
    }

    // Documented edge case: clutter with implausible placement still passes
    // as long as exactly 11 digits remain.
    #[test]
    fn permissive_on_interior_clutter() {
        assert!(validate("8abc916x1234567"));
        assert_eq!(normalize("8abc916x1234567").as_deref(), Some("89161234567"));
    }
}
