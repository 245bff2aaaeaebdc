//! Field validation for lab entities
//!
//! Every entity field carries a small list of [`Rule`]s that are checked when the
//! entity (or its creation draft) is built. Nothing reaches an adapter or the
//! control plane unless all rules pass.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Maximum length of a DNS label (RFC 1123)
pub const DNS_LABEL_MAX_LENGTH: usize = 63;

/// Maximum length of a DNS subdomain (RFC 1123)
pub const DNS_SUBDOMAIN_MAX_LENGTH: usize = 253;

static DNS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

static DNS_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid regex")
});

/// Raised when an entity field violates one of its rules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is longer than {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} is not a valid DNS label: {value:?}")]
    NotDnsLabel { field: &'static str, value: String },

    #[error("{field} is not a valid DNS subdomain: {value:?}")]
    NotDnsSubdomain { field: &'static str, value: String },
}

/// A single composable field rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    NonEmpty,
    /// Length limit counted in characters, not bytes
    MaxLength(usize),
    DnsLabel,
    DnsSubdomain,
}

impl Rule {
    pub fn check(&self, field: &'static str, value: &str) -> Result<(), ValidationError> {
        let ok = match self {
            Rule::NonEmpty => !value.is_empty(),
            Rule::MaxLength(max) => value.chars().count() <= *max,
            Rule::DnsLabel => is_dns_label(value),
            Rule::DnsSubdomain => is_dns_subdomain(value),
        };
        if ok {
            return Ok(());
        }
        Err(match self {
            Rule::NonEmpty => ValidationError::Empty { field },
            Rule::MaxLength(max) => ValidationError::TooLong { field, max: *max },
            Rule::DnsLabel => ValidationError::NotDnsLabel {
                field,
                value: value.to_string(),
            },
            Rule::DnsSubdomain => ValidationError::NotDnsSubdomain {
                field,
                value: value.to_string(),
            },
        })
    }
}

// ============================================================================
// SBIO: Pure validation logic (no I/O)
// ============================================================================

/// Check `value` against every rule, stopping at the first violation
pub fn validate(field: &'static str, value: &str, rules: &[Rule]) -> Result<(), ValidationError> {
    rules.iter().try_for_each(|rule| rule.check(field, value))
}

/// Lowercase alphanumerics and `-`, starting with a letter, ending alphanumeric,
/// at most 63 characters.
pub fn is_dns_label(name: &str) -> bool {
    name.len() <= DNS_LABEL_MAX_LENGTH && DNS_LABEL.is_match(name)
}

/// Dot-separated sequence of label-like segments, at most 253 characters.
/// Unlike a label, a segment may start with a digit.
pub fn is_dns_subdomain(name: &str) -> bool {
    name.len() <= DNS_SUBDOMAIN_MAX_LENGTH && DNS_SUBDOMAIN.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dns_label() {
        let cases = [
            ("abc", true),
            ("a/b", false),
            ("aäb", false),
            ("def-", false),
            ("-def", false),
            ("d-ef", true),
            ("Abv", false),
            ("aBc", false),
            ("abC", false),
            ("8ab", false),
            ("ab8", true),
            ("a8b", true),
            ("d.ef", false),
            ("", false),
        ];
        for (name, expected) in cases {
            assert_eq!(is_dns_label(name), expected, "{:?}", name);
        }
    }

    #[test]
    fn test_dns_label_length() {
        let longest = format!("a{}b", "-0".repeat(30) + "x");
        assert_eq!(longest.len(), 63);
        assert!(is_dns_label(&longest));

        let too_long = "a".repeat(64);
        assert!(!is_dns_label(&too_long));
    }

    #[test]
    fn test_dns_subdomain() {
        let cases = [
            ("d.ef", true),
            ("8ab", true),
            ("abc", true),
            ("-abc", false),
            ("abc-", false),
            (".abc", false),
            ("abc.", false),
            ("", false),
        ];
        for (name, expected) in cases {
            assert_eq!(is_dns_subdomain(name), expected, "{:?}", name);
        }

        assert!(is_dns_subdomain(&"a".repeat(253)));
        assert!(!is_dns_subdomain(&"a".repeat(254)));
    }

    #[test]
    fn test_validate_stops_at_first_violation() {
        let err = validate("name", "", &[Rule::NonEmpty, Rule::DnsLabel]).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "name" });
    }

    #[test]
    fn test_max_length_counts_characters() {
        assert!(validate("name", "äöü", &[Rule::MaxLength(3)]).is_ok());
        let err = validate("name", "abcd", &[Rule::MaxLength(3)]).unwrap_err();
        assert_eq!(err, ValidationError::TooLong { field: "name", max: 3 });
        assert_eq!(err.to_string(), "name is longer than 3 characters");
    }
}
