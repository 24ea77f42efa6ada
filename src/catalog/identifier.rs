use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// A schema or table name that is safe to place directly into SQL text.
///
/// Construction trims and uppercases the input, then accepts only ASCII
/// letters, digits, `_` and the IBM i system-name characters `#`, `$`, `@`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() || !normalized.chars().all(is_identifier_char) {
            return Err(IdentifierError::InvalidIdentifier(normalized));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render as a single-quoted SQL string literal (for `IN (...)` lists).
    pub fn to_literal(&self) -> String {
        format!("'{}'", self.0)
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '_' | '#' | '$' | '@')
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

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(Identifier::parse("  sales ").unwrap().as_str(), "SALES");
        assert_eq!(Identifier::parse("Orders_2024").unwrap().as_str(), "ORDERS_2024");
    }

    #[test]
    fn accepts_system_name_punctuation() {
        for name in ["QSYS2", "#LIB", "$TMP", "@WORK", "A_B#C$D@E"] {
            assert_eq!(Identifier::parse(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn rejects_sql_breaking_input() {
        for raw in [
            "",
            "   ",
            "SALES; DROP TABLE X",
            "SALES.ORDERS",
            "O'RDERS",
            "\"ORDERS\"",
            "ORD ERS",
            "ORDERS--",
            "ORD%",
            "ORD*",
            "straße",
        ] {
            assert!(
                matches!(Identifier::parse(raw), Err(IdentifierError::InvalidIdentifier(_))),
                "accepted {:?}",
                raw
            );
        }
    }

    #[test]
    fn literal_and_display_forms() {
        let id = Identifier::parse("qgpl").unwrap();
        assert_eq!(id.to_string(), "QGPL");
        assert_eq!(id.to_literal(), "'QGPL'");
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("QGPL"));
    }
}
