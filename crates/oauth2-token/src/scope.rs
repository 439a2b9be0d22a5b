//! Scope sets.
//!
//! Scopes travel as a single space-delimited string (`"read write"`) in
//! requests, token responses and the `scope` claim. In memory they are kept
//! ordered and de-duplicated so that comparisons and rendering are stable.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An ordered, de-duplicated set of scope names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Scopes(BTreeSet<String>);

impl Scopes {
    /// Parse a space-delimited scope string. Extra whitespace is ignored.
    pub fn parse(value: &str) -> Self {
        value.split_whitespace().collect()
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    /// True when every scope in `self` is also in `allowed`.
    pub fn is_subset(&self, allowed: &Scopes) -> bool {
        self.0.is_subset(&allowed.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Scopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for scope in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(scope)?;
            first = false;
        }
        Ok(())
    }
}

impl<'a> FromIterator<&'a str> for Scopes {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

impl FromIterator<String> for Scopes {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Scopes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Scopes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignores_extra_whitespace() {
        let scopes = Scopes::parse("  write   read ");
        assert_eq!(scopes.len(), 2);
        assert!(scopes.contains("read"));
        assert!(scopes.contains("write"));
    }

    #[test]
    fn test_display_is_sorted_and_deduplicated() {
        let scopes = Scopes::parse("write read write");
        assert_eq!(scopes.to_string(), "read write");
    }

    #[test]
    fn test_subset() {
        let allowed = Scopes::parse("read write");
        assert!(Scopes::parse("read").is_subset(&allowed));
        assert!(Scopes::parse("").is_subset(&allowed));
        assert!(!Scopes::parse("read admin").is_subset(&allowed));
    }

    #[test]
    fn test_serde_uses_space_delimited_string() {
        let scopes = Scopes::parse("write read");
        let json = serde_json::to_string(&scopes).unwrap();
        assert_eq!(json, "\"read write\"");

        let parsed: Scopes = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, scopes);
    }
}
