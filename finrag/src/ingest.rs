//! Drop-folder helpers.
//!
//! Files dropped into a folder are named like `AAPL_10-K_2024.txt`; the
//! leading ticker and the extension decide how they are indexed.
//! [`ingest_drop_folder`] indexes them one by one and moves each indexed file
//! into a processed folder so the next run skips it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::collection::Collection;
use crate::config::DropFolderConfig;
use crate::document::{Document, MetadataValue, SOURCE_FILE, TICKER};
use crate::error::Result;
use crate::service::FinRag;

/// Ticker used when a file name does not start with one.
pub const UNKNOWN_TICKER: &str = "UNKNOWN";

/// Extensions [`read_text_document`] can load.
pub const TEXT_EXTENSIONS: [&str; 3] = ["txt", "md", "csv"];

const MARKET_DATA_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

static TICKER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]{1,5})[\s_-]").expect("unreachable error: ticker pattern is valid")
});

/// Upper-cased ticker prefix of `file_name`, or [`UNKNOWN_TICKER`].
pub fn detect_ticker(file_name: &str) -> String {
    TICKER_PREFIX
        .captures(file_name)
        .and_then(|c| c.get(1))
        .map_or_else(|| UNKNOWN_TICKER.to_string(), |m| m.as_str().to_uppercase())
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
}

/// Spreadsheet exports go to market data; everything else is a filing.
pub fn guess_collection(path: &Path) -> Collection {
    match extension(path) {
        Some(ext) if MARKET_DATA_EXTENSIONS.contains(&ext.as_str()) => Collection::MarketData,
        _ => Collection::SecFilings,
    }
}

/// The `source_file` identity for a dropped file: `"{TICKER}/{file name}"`.
pub fn source_file_for(ticker: &str, path: &Path) -> String {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    format!("{ticker}/{name}")
}

fn is_text_file(path: &Path) -> bool {
    extension(path).is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
}

/// Load a `.txt`, `.md` or `.csv` file as a [`Document`] with `source_file` and
/// `ticker` metadata.
///
/// `ticker` overrides detection from the file name.
pub async fn read_text_document(path: &Path, ticker: Option<&str>) -> Result<Document> {
    let text = tokio::fs::read_to_string(path).await?;
    let ticker = match ticker.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t.to_uppercase(),
        None => {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            detect_ticker(&name)
        }
    };

    debug!(path = %path.display(), %ticker, bytes = text.len(), "read text document");
    Ok(Document::new(text)
        .with_metadata(SOURCE_FILE, source_file_for(&ticker, path))
        .with_metadata(TICKER, ticker))
}

/// Loadable files directly inside `dir`, sorted by path.
///
/// Files with other extensions are skipped with a warning.
pub async fn drop_folder_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if is_text_file(&path) {
            files.push(path);
        } else {
            warn!(path = %path.display(), "skipping unsupported file");
        }
    }
    files.sort();
    Ok(files)
}

/// What happened to one dropped file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Indexed {
        file_name: String,
        collection: Collection,
        chunk_count: usize,
        ticker: String,
        moved_to: PathBuf,
    },
    Failed { file_name: String, error: String },
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indexed { file_name, collection, chunk_count, ticker, .. } => write!(
                f,
                "✓ {file_name} → {collection} ({chunk_count} chunks, ticker: {ticker})"
            ),
            Self::Failed { file_name, error } => write!(f, "✗ {file_name} — Error: {error}"),
        }
    }
}

/// Per-file outcomes of one drop-folder run, in processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DropFolderReport {
    pub outcomes: Vec<FileOutcome>,
}

impl DropFolderReport {
    pub fn indexed(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, FileOutcome::Indexed { .. })).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.indexed()
    }

    pub fn chunk_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                FileOutcome::Indexed { chunk_count, .. } => *chunk_count,
                FileOutcome::Failed { .. } => 0,
            })
            .sum()
    }
}

impl fmt::Display for DropFolderReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.outcomes.is_empty() {
            return f.write_str("No supported files found in the drop folder.");
        }
        write!(f, "Processed {} file(s):", self.outcomes.len())?;
        for outcome in &self.outcomes {
            write!(f, "\n{outcome}")?;
        }
        Ok(())
    }
}

/// Index every supported file in the drop folder and move each indexed file
/// into the processed folder.
///
/// Both folders are created if missing. A file that cannot be read, indexed
/// or moved is recorded as [`FileOutcome::Failed`] and the run continues.
/// `ticker` overrides detection from file names.
///
/// # Errors
///
/// Only failures to create or list the folders are returned.
pub async fn ingest_drop_folder(
    rag: &FinRag,
    folders: &DropFolderConfig,
    ticker: Option<&str>,
) -> Result<DropFolderReport> {
    tokio::fs::create_dir_all(&folders.drop_dir).await?;
    tokio::fs::create_dir_all(&folders.processed_dir).await?;

    let files = drop_folder_files(&folders.drop_dir).await?;
    let mut report = DropFolderReport::default();
    for path in &files {
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let outcome = match ingest_file(rag, path, &folders.processed_dir, ticker).await {
            Ok((collection, chunk_count, ticker, moved_to)) => {
                FileOutcome::Indexed { file_name, collection, chunk_count, ticker, moved_to }
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "failed to ingest dropped file");
                FileOutcome::Failed { file_name, error: e.to_string() }
            }
        };
        report.outcomes.push(outcome);
    }

    info!(
        files = files.len(),
        indexed = report.indexed(),
        failed = report.failed(),
        chunks = report.chunk_count(),
        "drop folder ingest finished"
    );
    Ok(report)
}

async fn ingest_file(
    rag: &FinRag,
    path: &Path,
    processed_dir: &Path,
    ticker: Option<&str>,
) -> Result<(Collection, usize, String, PathBuf)> {
    let document = read_text_document(path, ticker).await?;
    let ticker = document
        .metadata
        .get(TICKER)
        .and_then(MetadataValue::as_str)
        .unwrap_or(UNKNOWN_TICKER)
        .to_string();
    if ticker == UNKNOWN_TICKER {
        warn!(path = %path.display(), "no ticker prefix in file name");
    }

    let collection = guess_collection(path);
    let chunk_count = rag.index_document(collection, &document).await?;
    let moved_to = move_to_processed(path, processed_dir).await?;
    Ok((collection, chunk_count, ticker, moved_to))
}

/// Move `path` into `processed_dir`, renaming it `{stem}_{n}{.ext}` with the
/// first free `n` when its name is already taken there.
pub async fn move_to_processed(path: &Path, processed_dir: &Path) -> Result<PathBuf> {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let mut dest = processed_dir.join(&name);
    if tokio::fs::try_exists(&dest).await? {
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let ext = path.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();
        let mut n = 1;
        loop {
            dest = processed_dir.join(format!("{stem}_{n}{ext}"));
            if !tokio::fs::try_exists(&dest).await? {
                break;
            }
            n += 1;
        }
    }

    if tokio::fs::rename(path, &dest).await.is_err() {
        // across filesystems
        tokio::fs::copy(path, &dest).await?;
        tokio::fs::remove_file(path).await?;
    }
    debug!(from = %path.display(), to = %dest.display(), "moved processed file");
    Ok(dest)
}

/// Parse a selection like `"1,3-5"` or `"all"` into sorted, de-duplicated
/// 1-based indices no greater than `max`.
///
/// Unparseable parts and out-of-range numbers are ignored.
pub fn parse_selection(selection: &str, max: usize) -> Vec<usize> {
    let selection = selection.trim();
    if selection.eq_ignore_ascii_case("all") {
        return (1..=max).collect();
    }

    let mut indices = Vec::new();
    for part in selection.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                if let (Ok(start), Ok(end)) = (start.trim().parse::<usize>(), end.trim().parse::<usize>()) {
                    indices.extend(start..=end);
                }
            }
            None => {
                if let Ok(n) = part.parse::<usize>() {
                    indices.push(n);
                }
            }
        }
    }

    indices.retain(|n| (1..=max).contains(n));
    indices.sort_unstable();
    indices.dedup();
    indices
}
