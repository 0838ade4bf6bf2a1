//! Rate-limit key construction.

use std::fmt;

/// A single component of a composite rate-limit key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPart {
    /// A string component.
    Str(String),
    /// An integer component, rendered in decimal.
    Num(i64),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Str(s) => write!(f, "{s}"),
            KeyPart::Num(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::Str(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        KeyPart::Str(s)
    }
}

impl From<i64> for KeyPart {
    fn from(n: i64) -> Self {
        KeyPart::Num(n)
    }
}

impl From<i32> for KeyPart {
    fn from(n: i32) -> Self {
        KeyPart::Num(i64::from(n))
    }
}

/// Builds a composite rate-limit key by joining the present, non-empty parts
/// with `:`. Integer parts are coerced to decimal strings.
///
/// Pure function; missing (`None`) and empty-string parts are skipped, so
/// callers can pass optional identity fields straight through.
///
/// # Arguments
/// * `parts` - Ordered key components, each possibly absent
#[must_use]
pub fn build_rate_limit_key(parts: &[Option<KeyPart>]) -> String {
    parts
        .iter()
        .flatten()
        .map(ToString::to_string)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_missing_and_empty_parts() {
        let key = build_rate_limit_key(&[
            None,
            Some("a".into()),
            None,
            Some(5i64.into()),
            Some("".into()),
        ]);
        assert_eq!(key, "a:5");
    }

    #[test]
    fn test_empty_input_yields_empty_key() {
        assert_eq!(build_rate_limit_key(&[]), "");
    }

    #[test]
    fn test_numbers_are_coerced_to_strings() {
        let key = build_rate_limit_key(&[Some("chat".into()), Some((-7i64).into())]);
        assert_eq!(key, "chat:-7");
    }

    #[test]
    fn test_typical_route_identity_key() {
        let key =
            build_rate_limit_key(&[Some("telegram".into()), Some("message".into()), Some(42i32.into())]);
        assert_eq!(key, "telegram:message:42");
    }
}
