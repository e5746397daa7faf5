//! Retrieval tools for assistant integrations.
//!
//! [`RetrievalTools`] wraps a [`FinRag`] context as a set of named tools with
//! JSON parameter schemas. An assistant host lists them with
//! [`definitions`](RetrievalTools::definitions) and invokes them with
//! [`call`](RetrievalTools::call), receiving plain text suitable for a model.
//!
//! # Example
//!
//! ```rust,ignore
//! use finrag::RetrievalTools;
//!
//! let tools = RetrievalTools::new(rag);
//! let text = tools.call("search_filings", json!({"query": "liquidity", "ticker": "msft"})).await?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::collection::Collection;
use crate::config::DropFolderConfig;
use crate::document::{DocumentSummary, MetadataValue, SearchResult};
use crate::error::{RagError, Result};
use crate::ingest::ingest_drop_folder;
use crate::service::FinRag;

/// Results returned per tool search.
pub const TOOL_TOP_K: usize = 8;

/// A tool's name, description and JSON parameter schema.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// The retrieval tool set backed by one [`FinRag`] context.
pub struct RetrievalTools {
    rag: Arc<FinRag>,
    drop_folder: DropFolderConfig,
}

impl RetrievalTools {
    /// Create the tool set with the default drop folders.
    pub fn new(rag: Arc<FinRag>) -> Self {
        Self { rag, drop_folder: DropFolderConfig::default() }
    }

    /// Use these folders for `ingest_drop_folder`.
    pub fn with_drop_folder(mut self, drop_folder: DropFolderConfig) -> Self {
        self.drop_folder = drop_folder;
        self
    }

    /// Every tool this set can execute.
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "search_filings",
                description: "Search SEC filings in the RAG database",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Natural language search query"},
                        "ticker": {"type": "string", "description": "Optional ticker to filter by (e.g. \"AAPL\")"},
                        "doc_type": {"type": "string", "description": "Optional filing type to filter by (e.g. \"10-K\", \"10-Q\")"}
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: "search_transcripts",
                description: "Search earnings call transcripts in the RAG database",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Natural language search query"},
                        "ticker": {"type": "string", "description": "Optional ticker to filter by"},
                        "year": {"type": "integer", "description": "Optional year to filter by"},
                        "quarter": {"type": "integer", "description": "Optional quarter (1-4) to filter by"}
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: "search_market_data",
                description: "Search market/financial data (CSV/Excel imports) in the RAG database",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Natural language search query"},
                        "ticker": {"type": "string", "description": "Optional ticker to filter by"}
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: "list_indexed_documents",
                description: "List all documents indexed in the RAG database",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "collection": {
                            "type": "string",
                            "description": "Optional collection name (\"sec_filings\", \"transcripts\", \"market_data\"). If empty, lists all."
                        }
                    }
                }),
            },
            ToolDefinition {
                name: "remove_document",
                description: "Remove a document and all its chunks from the database",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "source_file": {
                            "type": "string",
                            "description": "The source_file identifier (e.g. \"AAPL/10-K_2024-11-01_000032019324.html\")"
                        }
                    },
                    "required": ["source_file"]
                }),
            },
            ToolDefinition {
                name: "ingest_drop_folder",
                description: "Process and index any files in the drop folder with auto-detected metadata",
                parameters: json!({"type": "object", "properties": {}}),
            },
        ]
    }

    /// Execute the named tool with JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ToolError`] for an unknown tool or missing required
    /// arguments; backend failures propagate unchanged.
    pub async fn call(&self, name: &str, args: Value) -> Result<String> {
        info!(tool = name, "tool called");
        let output = match name {
            "search_filings" => {
                let filters = optional_str(&args, "doc_type")
                    .map(|t| ("filing_type".to_string(), MetadataValue::from(t)));
                self.search(Collection::SecFilings, &args, filters).await
            }
            "search_transcripts" => {
                let filters = ["year", "quarter"].into_iter().filter_map(|key| {
                    optional_int(&args, key).map(|n| (key.to_string(), MetadataValue::from(n)))
                });
                self.search(Collection::Transcripts, &args, filters.collect::<Vec<_>>()).await
            }
            "search_market_data" => self.search(Collection::MarketData, &args, None).await,
            "list_indexed_documents" => {
                let inventory = self.rag.list_documents(optional_str(&args, "collection")).await?;
                Ok(format_inventory(&inventory))
            }
            "remove_document" => {
                let source_file = required_str(&args, "source_file")?;
                let removed = self.rag.remove_document(source_file).await?;
                Ok(if removed > 0 {
                    format!("Removed {removed} chunks for '{source_file}'.")
                } else {
                    format!("No chunks found for '{source_file}'.")
                })
            }
            "ingest_drop_folder" => {
                let report = ingest_drop_folder(&self.rag, &self.drop_folder, None).await?;
                Ok(report.to_string())
            }
            other => Err(RagError::ToolError(format!("unknown tool '{other}'"))),
        };

        output.inspect_err(|e| error!(tool = name, error = %e, "tool failed"))
    }

    async fn search<I>(&self, collection: Collection, args: &Value, filters: I) -> Result<String>
    where
        I: IntoIterator<Item = (String, MetadataValue)>,
    {
        let query = required_str(args, "query")?;
        let results = self
            .rag
            .search_top_k(
                collection.as_str(),
                query,
                TOOL_TOP_K,
                optional_str(args, "ticker"),
                filters,
            )
            .await?;
        Ok(format_results(collection, &results))
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    optional_str(args, key)
        .ok_or_else(|| RagError::ToolError(format!("missing required '{key}' parameter")))
}

/// A non-empty string argument.
fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// A non-zero integer argument; zero means "unset".
fn optional_int(args: &Value, key: &str) -> Option<i64> {
    args.get(key).and_then(Value::as_i64).filter(|n| *n != 0)
}

fn meta(result: &SearchResult, key: &str) -> String {
    result.metadata.get(key).map(ToString::to_string).unwrap_or_default()
}

fn meta_or(result: &SearchResult, key: &str, fallback: &str) -> String {
    result.metadata.get(key).map_or_else(|| fallback.to_string(), ToString::to_string)
}

/// Render search results for a model, one block per chunk.
pub fn format_results(collection: Collection, results: &[SearchResult]) -> String {
    if results.is_empty() {
        let what = match collection {
            Collection::SecFilings => "SEC filings",
            Collection::Transcripts => "transcripts",
            Collection::MarketData => "market data",
        };
        return format!("No matching {what} found in the database.");
    }

    results
        .iter()
        .map(|r| {
            let ticker = meta_or(r, "ticker", "?");
            let header = match collection {
                Collection::SecFilings => format!(
                    "[{ticker} {} {}]",
                    meta(r, "filing_type"),
                    meta(r, "filing_date")
                ),
                Collection::Transcripts => {
                    format!("[{ticker} Q{} {}]", meta_or(r, "quarter", "?"), meta(r, "year"))
                }
                Collection::MarketData => format!("[{ticker}]"),
            };
            let section = match (collection, r.metadata.get("section")) {
                (Collection::SecFilings, Some(section)) => format!(" Section: {section}"),
                _ => String::new(),
            };
            format!("{header}{section} Source: {}\n{}", meta(r, "source_file"), r.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Render a document inventory, one block per collection.
pub fn format_inventory(inventory: &BTreeMap<Collection, Vec<DocumentSummary>>) -> String {
    if inventory.values().all(Vec::is_empty) {
        return "The database is empty. No documents have been indexed yet.".to_string();
    }

    inventory
        .iter()
        .map(|(collection, items)| {
            if items.is_empty() {
                return format!("**{collection}**: (empty)");
            }
            let mut lines = vec![format!("**{collection}** ({} documents):", items.len())];
            lines.extend(items.iter().map(|item| {
                format!("  - {} ({} chunks) [{}]", item.source_file, item.chunk_count, item.ticker)
            }));
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;

    fn result(text: &str, fields: &[(&str, MetadataValue)]) -> SearchResult {
        let metadata: Metadata =
            fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        SearchResult { id: "id".into(), text: text.into(), metadata, distance: 0.1 }
    }

    #[test]
    fn formats_filing_results_with_section() {
        let r = result(
            "Supply constraints.",
            &[
                ("ticker", "AAPL".into()),
                ("filing_type", "10-K".into()),
                ("filing_date", "2024-11-01".into()),
                ("section", "ITEM 1A".into()),
                ("source_file", "AAPL/10-K.html".into()),
            ],
        );
        assert_eq!(
            format_results(Collection::SecFilings, &[r.clone(), r]),
            "[AAPL 10-K 2024-11-01] Section: ITEM 1A Source: AAPL/10-K.html\nSupply constraints.\
             \n\n---\n\n\
             [AAPL 10-K 2024-11-01] Section: ITEM 1A Source: AAPL/10-K.html\nSupply constraints."
        );
    }

    #[test]
    fn formats_transcript_header_with_placeholders() {
        let r = result("Guidance raised.", &[("year", 2024.into())]);
        assert_eq!(
            format_results(Collection::Transcripts, &[r]),
            "[? Q? 2024] Source: \nGuidance raised."
        );
    }

    #[test]
    fn empty_results_message_names_collection() {
        assert_eq!(
            format_results(Collection::MarketData, &[]),
            "No matching market data found in the database."
        );
    }

    #[test]
    fn inventory_formatting() {
        let mut inventory = BTreeMap::new();
        inventory.insert(Collection::SecFilings, Vec::new());
        assert_eq!(
            format_inventory(&inventory),
            "The database is empty. No documents have been indexed yet."
        );

        inventory.insert(
            Collection::Transcripts,
            vec![DocumentSummary {
                source_file: "MSFT/MSFT_Q1_2024.txt".into(),
                ticker: "MSFT".into(),
                chunk_count: 12,
            }],
        );
        assert_eq!(
            format_inventory(&inventory),
            "**sec_filings**: (empty)\n\n**transcripts** (1 documents):\n  - MSFT/MSFT_Q1_2024.txt (12 chunks) [MSFT]"
        );
    }

    #[test]
    fn zero_integer_arguments_are_unset() {
        let args = json!({"year": 0, "quarter": 3, "ticker": ""});
        assert_eq!(optional_int(&args, "year"), None);
        assert_eq!(optional_int(&args, "quarter"), Some(3));
        assert_eq!(optional_str(&args, "ticker"), None);
    }
}
