//! # Product Identifier
//!
//! Normalized product key (ASIN). Two raw inputs that differ only by case or
//! surrounding whitespace produce the same `Identifier`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::domain::errors::CategorizerError;

/// Normalized (trimmed, uppercased) alphanumeric product identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Parses and normalizes a raw identifier
    ///
    /// Rejects empty, whitespace-only and non-alphanumeric input.
    pub fn parse(raw: &str) -> Result<Self, CategorizerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CategorizerError::InvalidInput(
                "identifier is empty".to_string(),
            ));
        }

        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CategorizerError::InvalidInput(format!(
                "identifier '{trimmed}' is not alphanumeric"
            )));
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identifier {
    type Err = CategorizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = CategorizerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

/// Normalizes a raw batch of identifiers
///
/// Invalid entries are dropped and duplicates (after normalization) are
/// removed, keeping the position of the first occurrence.
pub fn normalize_batch<I, S>(raw: I) -> Vec<Identifier>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();

    for value in raw {
        match Identifier::parse(value.as_ref()) {
            Ok(identifier) => {
                if seen.insert(identifier.clone()) {
                    normalized.push(identifier);
                }
            }
            Err(e) => debug!("Skipping identifier {:?}: {}", value.as_ref(), e),
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("ab12", "AB12")]
    #[case("  ab12  ", "AB12")]
    #[case("AB12", "AB12")]
    #[case("\tb00x1y2z3q\n", "B00X1Y2Z3Q")]
    fn test_parse_normalizes(#[case] raw: &str, #[case] expected: &str) {
        let identifier = Identifier::parse(raw).unwrap();
        assert_eq!(identifier.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("ab 12")]
    #[case("ab-12")]
    #[case("../etc")]
    fn test_parse_rejects_invalid(#[case] raw: &str) {
        assert!(matches!(
            Identifier::parse(raw),
            Err(CategorizerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_normalize_batch_dedups_and_keeps_order() {
        let batch = normalize_batch(["b001", " B001 ", "", "c002", "b001", "  "]);
        let values: Vec<&str> = batch.iter().map(Identifier::as_str).collect();
        assert_eq!(values, vec!["B001", "C002"]);
    }

    #[test]
    fn test_serde_uses_normalized_string() {
        let identifier: Identifier = serde_json::from_str("\" x9 \"").unwrap();
        assert_eq!(identifier.as_str(), "X9");
        assert_eq!(serde_json::to_string(&identifier).unwrap(), "\"X9\"");
        assert!(serde_json::from_str::<Identifier>("\"\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_case_and_whitespace_do_not_matter(
            raw in "[a-zA-Z0-9]{1,12}",
            left in "[ \t]{0,3}",
            right in "[ \t]{0,3}",
        ) {
            let padded = format!("{left}{raw}{right}");
            let a = Identifier::parse(&padded).unwrap();
            let b = Identifier::parse(&raw.to_lowercase()).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
