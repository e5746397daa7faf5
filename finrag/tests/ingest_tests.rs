//! Drop-folder ingest against the in-memory store.

mod common;

use std::sync::Arc;

use common::{CountingEmbedder, rag};
use finrag::ingest::{FileOutcome, ingest_drop_folder};
use finrag::{Collection, DropFolderConfig, RetrievalTools};
use serde_json::json;

fn folders(root: &std::path::Path) -> DropFolderConfig {
    DropFolderConfig { drop_dir: root.join("drop"), processed_dir: root.join("processed") }
}

#[tokio::test]
async fn failures_are_reported_and_the_run_continues() {
    let root = tempfile::tempdir().unwrap();
    let folders = folders(root.path());
    std::fs::create_dir_all(&folders.drop_dir).unwrap();
    std::fs::write(folders.drop_dir.join("AAPL_10-K.txt"), "ITEM 1. Business\nPhones.").unwrap();
    std::fs::write(folders.drop_dir.join("BAD_notes.txt"), [0xff, 0xfe, 0x00]).unwrap();
    std::fs::write(folders.drop_dir.join("MSFT_prices.csv"), "date,close\n2024-01-02,370.87").unwrap();
    std::fs::write(folders.drop_dir.join("deck.pdf"), [0u8, 1]).unwrap();

    let rag = rag(Arc::new(CountingEmbedder::default()));
    let report = ingest_drop_folder(&rag, &folders, None).await.unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!((report.indexed(), report.failed()), (2, 1));
    assert!(matches!(
        &report.outcomes[0],
        FileOutcome::Indexed { collection: Collection::SecFilings, ticker, chunk_count: 1, .. }
            if ticker == "AAPL"
    ));
    assert!(matches!(&report.outcomes[1], FileOutcome::Failed { file_name, .. } if file_name == "BAD_notes.txt"));
    assert!(matches!(
        &report.outcomes[2],
        FileOutcome::Indexed { collection: Collection::MarketData, .. }
    ));

    // indexed files move out, the failed one and unsupported files stay
    assert!(folders.processed_dir.join("AAPL_10-K.txt").exists());
    assert!(folders.processed_dir.join("MSFT_prices.csv").exists());
    assert!(folders.drop_dir.join("BAD_notes.txt").exists());
    assert!(folders.drop_dir.join("deck.pdf").exists());
    assert!(!folders.drop_dir.join("AAPL_10-K.txt").exists());

    let inventory = rag.list_documents(None).await.unwrap();
    assert_eq!(inventory[&Collection::SecFilings][0].source_file, "AAPL/AAPL_10-K.txt");
    assert_eq!(inventory[&Collection::MarketData][0].source_file, "MSFT/MSFT_prices.csv");

    let again = ingest_drop_folder(&rag, &folders, None).await.unwrap();
    assert_eq!(again.outcomes.len(), 1);
    assert_eq!(again.failed(), 1);
}

#[tokio::test]
async fn missing_folders_are_created() {
    let root = tempfile::tempdir().unwrap();
    let folders = folders(root.path());

    let rag = rag(Arc::new(CountingEmbedder::default()));
    let report = ingest_drop_folder(&rag, &folders, None).await.unwrap();

    assert!(report.outcomes.is_empty());
    assert!(folders.drop_dir.is_dir());
    assert!(folders.processed_dir.is_dir());
}

#[tokio::test]
async fn ingest_tool_reports_each_file() {
    let root = tempfile::tempdir().unwrap();
    let folders = folders(root.path());
    std::fs::create_dir_all(&folders.drop_dir).unwrap();
    std::fs::write(folders.drop_dir.join("nvda q2.md"), "Data center revenue grew.").unwrap();

    let rag = Arc::new(rag(Arc::new(CountingEmbedder::default())));
    let tools = RetrievalTools::new(rag.clone()).with_drop_folder(folders.clone());

    let output = tools.call("ingest_drop_folder", json!({})).await.unwrap();
    assert_eq!(
        output,
        "Processed 1 file(s):\n✓ nvda q2.md → sec_filings (1 chunks, ticker: NVDA)"
    );

    let output = tools.call("ingest_drop_folder", json!({})).await.unwrap();
    assert_eq!(output, "No supported files found in the drop folder.");
}
