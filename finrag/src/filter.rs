//! Metadata filter expressions.
//!
//! Queries and lookups take an optional [`Filter`]. The query layer builds
//! filters explicitly from equality constraints with [`Filter::all`]; stores
//! either evaluate them directly ([`Filter::matches`]) or translate them into
//! their native filter language.

use serde::{Deserialize, Serialize};

use crate::document::{Metadata, MetadataValue};

/// A boolean expression over chunk metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// `metadata[field] == value`. A missing field never matches.
    Equals { field: String, value: MetadataValue },
    /// Every sub-expression must match.
    And(Vec<Filter>),
}

impl Filter {
    /// Equality constraint on a single field.
    pub fn equals(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::Equals { field: field.into(), value: value.into() }
    }

    /// Combine equality constraints.
    ///
    /// Returns `None` for no constraints, the bare [`Filter::Equals`] for one,
    /// and an [`Filter::And`] of all of them otherwise.
    pub fn all<I, K, V>(constraints: I) -> Option<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<MetadataValue>,
    {
        let mut filters: Vec<Filter> =
            constraints.into_iter().map(|(field, value)| Self::equals(field, value)).collect();
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Self::And(filters)),
        }
    }

    /// Evaluate the filter against a metadata map.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Self::Equals { field, value } => metadata.get(field) == Some(value),
            Self::And(filters) => filters.iter().all(|f| f.matches(metadata)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_constraints_no_filter() {
        assert_eq!(Filter::all(Vec::<(String, MetadataValue)>::new()), None);
    }

    #[test]
    fn single_constraint_is_passed_directly() {
        assert_eq!(Filter::all([("ticker", "AAPL")]), Some(Filter::equals("ticker", "AAPL")));
    }

    #[test]
    fn multiple_constraints_are_anded() {
        let filter = Filter::all([
            ("ticker", MetadataValue::from("AAPL")),
            ("year", MetadataValue::from(2023)),
        ]);
        assert_eq!(
            filter,
            Some(Filter::And(vec![Filter::equals("ticker", "AAPL"), Filter::equals("year", 2023)]))
        );
    }

    #[test]
    fn evaluates_against_metadata() {
        let metadata: Metadata = [
            ("ticker".to_string(), MetadataValue::from("AAPL")),
            ("year".to_string(), MetadataValue::from(2023)),
        ]
        .into_iter()
        .collect();

        let both = Filter::And(vec![Filter::equals("ticker", "AAPL"), Filter::equals("year", 2023)]);
        assert!(both.matches(&metadata));
        assert!(!Filter::equals("year", 2022).matches(&metadata));
        // typed comparison: the string "2023" is not the integer 2023
        assert!(!Filter::equals("year", "2023").matches(&metadata));
        assert!(!Filter::equals("quarter", 1).matches(&metadata));
    }
}
