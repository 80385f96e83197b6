//! Regex-based PII sanitizer.
//!
//! Redacts email addresses, national identity numbers, and phone numbers
//! from the prompt copy of retrieved passages. Patterns are deliberately
//! broad: over-redacting a prompt snippet is harmless, leaking is not.

use mimir_core::sanitize::{Sanitized, Sanitizer};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("Invalid regex")
});

// Eleven contiguous digits, the national identity number format.
// Checked before phone numbers so the broader pattern does not claim them.
static NATIONAL_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{11}\b").expect("Invalid regex"));

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\d[\d \-]{6,}\d").expect("Invalid regex"));

/// The built-in sanitizer implementation.
pub struct RegexSanitizer;

impl RegexSanitizer {
    fn apply(text: String, re: &Regex, category: &str, categories: &mut Vec<String>) -> String {
        if !re.is_match(&text) {
            return text;
        }
        categories.push(category.to_string());
        re.replace_all(&text, format!("[redacted:{category}]"))
            .into_owned()
    }
}

impl Sanitizer for RegexSanitizer {
    fn name(&self) -> &str {
        "regex"
    }

    fn sanitize(&self, text: &str) -> Sanitized {
        let mut categories = Vec::new();
        let mut out = text.to_string();
        out = Self::apply(out, &EMAIL_RE, "email", &mut categories);
        out = Self::apply(out, &NATIONAL_ID_RE, "national_id", &mut categories);
        out = Self::apply(out, &PHONE_RE, "phone", &mut categories);

        Sanitized {
            text: out,
            categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_passes_through() {
        let result = RegexSanitizer.sanitize("the vacation policy allows ten days");
        assert!(result.is_clean());
        assert_eq!(result.text, "the vacation policy allows ten days");
    }

    #[test]
    fn email_redacted() {
        let result = RegexSanitizer.sanitize("contact hr.lead@example.com for details");
        assert_eq!(result.text, "contact [redacted:email] for details");
        assert_eq!(result.categories, vec!["email"]);
    }

    #[test]
    fn national_id_redacted_before_phone() {
        let result = RegexSanitizer.sanitize("id 12345678901 on file");
        assert_eq!(result.text, "id [redacted:national_id] on file");
        assert_eq!(result.categories, vec!["national_id"]);
    }

    #[test]
    fn phone_number_redacted() {
        let result = RegexSanitizer.sanitize("call +47 22 33 44 55 now");
        assert!(result.text.contains("[redacted:phone]"));
        assert_eq!(result.categories, vec!["phone"]);
    }

    #[test]
    fn multiple_categories_reported() {
        let result =
            RegexSanitizer.sanitize("mail a@b.no or call 99 88 77 66, id 12345678901");
        assert!(result.categories.contains(&"email".to_string()));
        assert!(result.categories.contains(&"national_id".to_string()));
        assert!(result.categories.contains(&"phone".to_string()));
        assert!(!result.text.contains("a@b.no"));
        assert!(!result.text.contains("12345678901"));
    }

    #[test]
    fn sanitize_is_deterministic() {
        let input = "mail a@b.no twice a@b.no";
        assert_eq!(RegexSanitizer.sanitize(input), RegexSanitizer.sanitize(input));
    }
}
