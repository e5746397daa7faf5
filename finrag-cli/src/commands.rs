use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use finrag::ingest::{guess_collection, ingest_drop_folder, parse_selection, read_text_document};
use finrag::tools::{format_inventory, format_results};
use finrag::{
    Collection, DropFolderConfig, EmbeddingProvider, FinRag, FinragConfig, InMemoryVectorStore,
    MetadataValue, OllamaEmbeddingProvider, QdrantVectorStore, RetrievalTools, StoreConfig,
    VectorStore,
};
use tracing::debug;

use crate::cli::Settings;

/// Settings from the config file, then `FINRAG_*` variables, then flags.
pub fn resolve_config(settings: &Settings) -> Result<FinragConfig> {
    let mut config = FinragConfig::load(&settings.config)
        .with_context(|| format!("failed to load {}", settings.config.display()))?
        .with_env_overrides();

    if let Some(url) = &settings.ollama_url {
        config.embedding.base_url = url.clone();
    }
    if let Some(path) = &settings.store_path {
        config.store = StoreConfig::Memory { snapshot_path: Some(path.clone()) };
    }
    if let Some(url) = &settings.qdrant_url {
        config.store = StoreConfig::Qdrant { url: url.clone() };
    }
    debug!(path = %settings.config.display(), store = ?config.store, "resolved configuration");
    Ok(config)
}

async fn open_store(config: &StoreConfig) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match config {
        StoreConfig::Memory { snapshot_path: Some(path) } => Arc::new(
            InMemoryVectorStore::open(path)
                .await
                .with_context(|| format!("failed to open store snapshot {}", path.display()))?,
        ),
        StoreConfig::Memory { snapshot_path: None } => Arc::new(InMemoryVectorStore::new()),
        StoreConfig::Qdrant { url } => Arc::new(
            QdrantVectorStore::new(url).with_context(|| format!("failed to connect to {url}"))?,
        ),
    };
    Ok(store)
}

/// Build the process-wide context with one embedding client and one store client.
pub async fn connect(config: &FinragConfig) -> Result<Arc<FinRag>> {
    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::new(OllamaEmbeddingProvider::new(config.embedding.clone())?);
    let store = open_store(&config.store).await?;
    let rag = FinRag::builder()
        .config(config.rag.clone())
        .embedding_provider(embedder)
        .vector_store(store)
        .build()?;
    Ok(Arc::new(rag))
}

pub async fn handle_index(
    rag: &FinRag,
    path: &Path,
    collection: Option<String>,
    ticker: Option<String>,
    source_file: Option<String>,
    metadata: Vec<(String, MetadataValue)>,
) -> Result<()> {
    let collection = match collection {
        Some(name) => name.parse::<Collection>()?,
        None => guess_collection(path),
    };

    let mut document = read_text_document(path, ticker.as_deref())
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    if let Some(source_file) = source_file {
        document = document.with_metadata("source_file", source_file);
    }
    for (key, value) in metadata {
        document = document.with_metadata(key, value);
    }

    let written = rag.index_document(collection, &document).await?;
    println!(
        "Indexed {} -> {collection} ({written} chunks)",
        document.source_file().unwrap_or_default()
    );
    Ok(())
}

pub async fn handle_ingest(
    rag: &FinRag,
    mut folders: DropFolderConfig,
    dir: Option<PathBuf>,
    processed: Option<PathBuf>,
    ticker: Option<String>,
) -> Result<()> {
    if let Some(dir) = dir {
        folders.drop_dir = dir;
    }
    if let Some(processed) = processed {
        folders.processed_dir = processed;
    }

    let report = ingest_drop_folder(rag, &folders, ticker.as_deref())
        .await
        .with_context(|| format!("failed to read drop folder {}", folders.drop_dir.display()))?;
    println!("{report}");
    if !report.outcomes.is_empty() {
        println!(
            "{} indexed ({} chunks), {} failed; indexed files moved to {}",
            report.indexed(),
            report.chunk_count(),
            report.failed(),
            folders.processed_dir.display()
        );
    }
    Ok(())
}

pub async fn handle_search(
    rag: &FinRag,
    collection: &str,
    query: &str,
    ticker: Option<String>,
    filters: Vec<(String, MetadataValue)>,
    top: Option<usize>,
    json: bool,
) -> Result<()> {
    let top_k = top.unwrap_or(rag.config().top_k);
    let results = rag.search_top_k(collection, query, top_k, ticker.as_deref(), filters).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    let collection: Collection = collection.parse()?;
    println!("{}", format_results(collection, &results));
    Ok(())
}

/// Every indexed document as `(collection, source_file)`, in listing order.
async fn numbered_documents(rag: &FinRag) -> Result<Vec<(Collection, String)>> {
    let inventory = rag.list_documents(None).await?;
    Ok(inventory
        .into_iter()
        .flat_map(|(collection, items)| {
            items.into_iter().map(move |item| (collection, item.source_file))
        })
        .collect())
}

pub async fn handle_list(rag: &FinRag, collection: Option<String>, numbered: bool) -> Result<()> {
    if !numbered {
        let inventory = rag.list_documents(collection.as_deref()).await?;
        println!("{}", format_inventory(&inventory));
        return Ok(());
    }

    let documents = numbered_documents(rag).await?;
    if documents.is_empty() {
        println!("The database is empty. No documents have been indexed yet.");
    }
    for (i, (collection, source_file)) in documents.iter().enumerate() {
        println!("{:>3}. [{collection}] {source_file}", i + 1);
    }
    Ok(())
}

pub async fn handle_remove(
    rag: &FinRag,
    source_files: Vec<String>,
    select: Option<String>,
) -> Result<()> {
    let targets = match select {
        Some(selection) => {
            let documents = numbered_documents(rag).await?;
            let picked = parse_selection(&selection, documents.len());
            if picked.is_empty() {
                bail!("selection '{selection}' matches none of the {} documents", documents.len());
            }
            picked.into_iter().map(|n| documents[n - 1].1.clone()).collect()
        }
        None if source_files.is_empty() => bail!("nothing to remove; pass source files or --select"),
        None => source_files,
    };

    for source_file in targets {
        let removed = rag.remove_document(&source_file).await?;
        if removed > 0 {
            println!("Removed {removed} chunks for '{source_file}'.");
        } else {
            println!("No chunks found for '{source_file}'.");
        }
    }
    Ok(())
}

pub fn handle_tools() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&RetrievalTools::definitions())?);
    Ok(())
}

pub async fn handle_call(
    rag: Arc<FinRag>,
    folders: DropFolderConfig,
    name: &str,
    args: &str,
) -> Result<()> {
    let args: serde_json::Value =
        serde_json::from_str(args).with_context(|| format!("invalid JSON arguments: {args}"))?;
    let output = RetrievalTools::new(rag).with_drop_folder(folders).call(name, args).await?;
    println!("{output}");
    Ok(())
}
