mod cli;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::{
    connect, handle_call, handle_index, handle_ingest, handle_list, handle_remove, handle_search,
    handle_tools, resolve_config,
};

#[tokio::main]
async fn main() -> Result<()> {
    let Cli { command, settings } = Cli::parse();
    logging::init(settings.verbose);

    // `tools` only prints schemas and must work without a usable config
    match command {
        Commands::Index { path, collection, ticker, source_file, metadata } => {
            let rag = connect(&resolve_config(&settings)?).await?;
            handle_index(&rag, &path, collection, ticker, source_file, metadata).await?;
        }
        Commands::Ingest { dir, processed, ticker } => {
            let config = resolve_config(&settings)?;
            let rag = connect(&config).await?;
            handle_ingest(&rag, config.drop_folder, dir, processed, ticker).await?;
        }
        Commands::Search { collection, query, ticker, filters, top, json } => {
            let rag = connect(&resolve_config(&settings)?).await?;
            handle_search(&rag, &collection, &query, ticker, filters, top, json).await?;
        }
        Commands::List { collection, numbered } => {
            let rag = connect(&resolve_config(&settings)?).await?;
            handle_list(&rag, collection, numbered).await?;
        }
        Commands::Remove { source_files, select } => {
            let rag = connect(&resolve_config(&settings)?).await?;
            handle_remove(&rag, source_files, select).await?;
        }
        Commands::Tools => handle_tools()?,
        Commands::Call { name, args } => {
            let config = resolve_config(&settings)?;
            let rag = connect(&config).await?;
            handle_call(rag, config.drop_folder, &name, &args).await?;
        }
    }

    Ok(())
}
