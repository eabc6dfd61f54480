//! Operator registry: short predicate codes to SQL keywords.

use crate::sql::QueryError;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Codes every registry starts with.
pub const STANDARD_OPERATORS: &[(&str, &str)] = &[
    ("gt", ">"),
    ("lt", "<"),
    ("gte", ">="),
    ("lte", "<="),
    ("e", "="),
    ("ne", "!="),
    ("l", "LIKE"),
    ("nl", "NOT LIKE"),
    ("a", "AND"),
    ("o", "OR"),
    ("i", "IN"),
    ("ni", "NOT IN"),
];

static STANDARD: LazyLock<OperatorRegistry> = LazyLock::new(OperatorRegistry::standard);

/// Process-wide standard registry, built on first use and never mutated.
pub fn standard_registry() -> &'static OperatorRegistry {
    &STANDARD
}

/// Immutable code -> keyword table. Build once at startup (optionally extended with
/// [`OperatorRegistry::with_operator`]) and share by reference or `Arc`.
#[derive(Clone, Debug)]
pub struct OperatorRegistry {
    operators: HashMap<String, String>,
}

impl OperatorRegistry {
    pub fn standard() -> Self {
        OperatorRegistry {
            operators: STANDARD_OPERATORS
                .iter()
                .map(|(code, keyword)| (code.to_string(), keyword.to_string()))
                .collect(),
        }
    }

    /// Add or replace one code. Consumes self so extension only happens while building.
    pub fn with_operator(mut self, code: impl Into<String>, keyword: impl Into<String>) -> Self {
        self.operators.insert(code.into(), keyword.into());
        self
    }

    /// Keyword for a code; unknown codes are an error, never a fallback.
    pub fn resolve(&self, code: &str) -> Result<&str, QueryError> {
        self.operators
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| QueryError::UnknownOperator { code: code.to_string() })
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
