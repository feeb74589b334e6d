//! Text normalization for transaction descriptions and rule terms.
//!
//! Descriptions and keywords are compared in a canonical form: uppercase,
//! without diacritics and without surrounding whitespace. Digits,
//! punctuation and inner whitespace are left untouched.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize an optional raw description. Absent input yields an empty string.
pub fn normalize_opt(raw: Option<&str>) -> String {
    raw.map(normalize).unwrap_or_default()
}

/// Normalize a raw description into its comparison form.
///
/// `"  Pagó Servicio "` becomes `"PAGO SERVICIO"`.
pub fn normalize(raw: &str) -> String {
    let stripped: String = raw
        .to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    // Trim last: removing a trailing combining mark can expose whitespace.
    stripped.trim().to_string()
}

/// Normalize a list of terms, dropping those that end up empty and repeats
/// of an earlier term. First-seen order is kept.
pub fn normalize_terms<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for term in terms {
        let term = normalize(term.as_ref());
        if !term.is_empty() && !normalized.contains(&term) {
            normalized.push(term);
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_absent_input_is_empty() {
        assert_eq!(normalize_opt(None), "");
        assert_eq!(normalize_opt(Some("  ")), "");
    }

    #[test]
    fn test_uppercases_and_trims() {
        assert_eq!(normalize("  pago proveedor  "), "PAGO PROVEEDOR");
    }

    #[test]
    fn test_strips_accents() {
        assert_eq!(normalize("Pagó Servicio"), normalize("PAGO SERVICIO"));
        assert_eq!(normalize("depósito cañería ü"), "DEPOSITO CANERIA U");
    }

    #[test]
    fn test_keeps_digits_and_punctuation() {
        assert_eq!(normalize("tef 123-456/ok."), "TEF 123-456/OK.");
    }

    #[test]
    fn test_trailing_combining_mark() {
        assert_eq!(normalize("a \u{301}"), "A");
    }

    #[test]
    fn test_normalize_terms_drops_empty() {
        let terms = normalize_terms(["agua", "  ", "Luz"]);
        assert_eq!(terms, vec!["AGUA".to_string(), "LUZ".to_string()]);
    }

    #[test]
    fn test_normalize_terms_drops_repeats() {
        let terms = normalize_terms(["luz", "AGUA", "agua", "Lúz", "gas"]);
        assert_eq!(terms, vec!["LUZ", "AGUA", "GAS"]);
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(s in "[ a-zA-Z0-9áéíóúÁÉÍÓÚñÑüÜçÇ.,;|/$-]{0,40}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_normalized_has_no_lowercase_ascii(s in "[ a-zA-Z0-9áéíóúñü]{0,40}") {
            let out = normalize(&s);
            prop_assert!(!out.chars().any(|c| c.is_ascii_lowercase()));
            prop_assert!(out.is_ascii());
        }
    }
}
