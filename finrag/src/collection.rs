//! The closed set of collections documents can be indexed into.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// A named partition of indexed chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// SEC filings (10-K, 10-Q, 8-K, ...).
    SecFilings,
    /// Earnings call transcripts.
    Transcripts,
    /// Tabular market and financial data exports.
    MarketData,
}

impl Collection {
    /// Every collection, in display order.
    pub const ALL: [Collection; 3] =
        [Collection::SecFilings, Collection::Transcripts, Collection::MarketData];

    /// The collection's storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SecFilings => "sec_filings",
            Self::Transcripts => "transcripts",
            Self::MarketData => "market_data",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| RagError::UnknownCollection(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names() {
        for collection in Collection::ALL {
            assert_eq!(collection.as_str().parse::<Collection>().unwrap(), collection);
        }
    }

    #[test]
    fn rejects_unknown_name() {
        let err = "filings".parse::<Collection>().unwrap_err();
        assert!(matches!(err, RagError::UnknownCollection(name) if name == "filings"));
    }
}
