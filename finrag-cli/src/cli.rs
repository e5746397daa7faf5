use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use finrag::MetadataValue;

#[derive(Parser)]
#[command(name = "finrag")]
#[command(about = "Index and search SEC filings, earnings call transcripts and market data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub settings: Settings,
}

/// Options shared by every subcommand.
#[derive(Args)]
pub struct Settings {
    /// Settings file; missing files fall back to the defaults
    #[arg(short, long, global = true, value_name = "FILE", env = "FINRAG_CONFIG", default_value = "finrag.json")]
    pub config: PathBuf,

    /// Ollama base URL (overrides config and FINRAG_OLLAMA_URL)
    #[arg(long, global = true)]
    pub ollama_url: Option<String>,

    /// Snapshot file for the in-memory store
    #[arg(long, global = true, conflicts_with = "qdrant_url")]
    pub store_path: Option<PathBuf>,

    /// Use a Qdrant server instead of the in-memory store
    #[arg(long, global = true)]
    pub qdrant_url: Option<String>,

    /// More log output (-v info, -vv debug); RUST_LOG wins when set
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index one plain-text file
    Index {
        /// File to index (.txt, .md or .csv)
        path: PathBuf,

        /// Target collection; guessed from the extension when omitted
        #[arg(long)]
        collection: Option<String>,

        /// Ticker; detected from the file name when omitted
        #[arg(long)]
        ticker: Option<String>,

        /// Source identity; defaults to TICKER/file name
        #[arg(long)]
        source_file: Option<String>,

        /// Extra metadata as key=value (repeatable), e.g. --meta filing_type=10-K
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        metadata: Vec<(String, MetadataValue)>,
    },
    /// Index every supported file in a drop folder and move it to the processed folder
    Ingest {
        /// Folder containing files named like AAPL_10-K_2024.txt (defaults to the configured drop_dir)
        dir: Option<PathBuf>,

        /// Where indexed files are moved (defaults to the configured processed_dir)
        #[arg(long, value_name = "DIR")]
        processed: Option<PathBuf>,

        /// Ticker applied to every file instead of detection
        #[arg(long)]
        ticker: Option<String>,
    },
    /// Search a collection
    Search {
        /// sec_filings, transcripts or market_data
        collection: String,

        /// The query string
        query: String,

        /// Restrict to one ticker
        #[arg(long)]
        ticker: Option<String>,

        /// Extra equality filter as key=value (repeatable), e.g. --filter year=2024
        #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        filters: Vec<(String, MetadataValue)>,

        /// Number of results (defaults to the configured top_k)
        #[arg(long)]
        top: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List indexed documents
    List {
        /// Only this collection
        #[arg(long)]
        collection: Option<String>,

        /// Number every document so it can be passed to `remove --select`
        #[arg(long)]
        numbered: bool,
    },
    /// Remove documents and all their chunks
    Remove {
        /// source_file identifiers to remove
        source_files: Vec<String>,

        /// Numbers from `list --numbered`, e.g. "1,3-5" or "all"
        #[arg(long, conflicts_with = "source_files")]
        select: Option<String>,
    },
    /// Print the assistant tool definitions as JSON
    Tools,
    /// Invoke an assistant tool
    Call {
        /// Tool name, see `finrag tools`
        name: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },
}

/// Parse `key=value`; integer values are stored as integers.
pub fn parse_key_value(raw: &str) -> Result<(String, MetadataValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    let value = value.trim();
    let value = match value.parse::<i64>() {
        Ok(n) => MetadataValue::from(n),
        Err(_) => MetadataValue::from(value),
    };
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn key_values_keep_integers_typed() {
        assert_eq!(parse_key_value("year=2024"), Ok(("year".into(), MetadataValue::from(2024))));
        assert_eq!(
            parse_key_value("filing_type = 10-K"),
            Ok(("filing_type".into(), MetadataValue::from("10-K")))
        );
        assert!(parse_key_value("year").is_err());
        assert!(parse_key_value("=2024").is_err());
    }

    #[test]
    fn parses_search_with_filters() {
        let cli = Cli::try_parse_from([
            "finrag", "search", "transcripts", "guidance", "--ticker", "msft", "--filter", "year=2024",
            "--filter", "quarter=1",
        ])
        .unwrap();
        match cli.command {
            Commands::Search { collection, filters, ticker, .. } => {
                assert_eq!(collection, "transcripts");
                assert_eq!(ticker.as_deref(), Some("msft"));
                assert_eq!(filters.len(), 2);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn ingest_folders_are_optional() {
        let cli = Cli::try_parse_from(["finrag", "ingest"]).unwrap();
        assert!(matches!(cli.command, Commands::Ingest { dir: None, processed: None, ticker: None }));

        let cli =
            Cli::try_parse_from(["finrag", "ingest", "inbox", "--processed", "done"]).unwrap();
        match cli.command {
            Commands::Ingest { dir, processed, .. } => {
                assert_eq!(dir, Some(PathBuf::from("inbox")));
                assert_eq!(processed, Some(PathBuf::from("done")));
            }
            _ => panic!("expected ingest"),
        }
    }
}
