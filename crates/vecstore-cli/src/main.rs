//! Thin CLI front end over `vecstore-core`. Each invocation loads the store
//! from a snapshot file (creating an empty one if absent), performs one
//! operation, and saves back, except for read-only commands.
//!
//! `anyhow` is used here, at the binary boundary, to flatten `VsResult`s and
//! I/O errors into one reportable chain; the library crate itself never
//! depends on it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use vecstore_core::config::{Config, StorageMode};
use vecstore_core::embedding::DeterministicHashProvider;
use vecstore_core::filter::Metadata;
use vecstore_core::index::{IndexConfig, IndexKind};
use vecstore_core::persistence::Snapshot;
use vecstore_core::service::LibraryService;

#[derive(Parser)]
#[command(name = "vecstore", about = "Vector similarity search over libraries of embedded text chunks")]
struct Cli {
    /// Path to the store's snapshot file. Defaults to VECSTORE_SNAPSHOT_PATH
    /// or ./vecstore.snapshot.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Snapshot encoding. Defaults to VECSTORE_STORAGE_MODE or json.
    #[arg(long, global = true, value_enum)]
    mode: Option<CliStorageMode>,

    /// Dimension produced by the built-in deterministic embedding provider.
    /// Every library in one store shares this single provider, so it must
    /// match whatever dimension libraries were created with.
    #[arg(long, global = true, default_value_t = 8)]
    embedding_dim: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliStorageMode {
    Json,
    Binary,
}

impl From<CliStorageMode> for StorageMode {
    fn from(mode: CliStorageMode) -> Self {
        match mode {
            CliStorageMode::Json => StorageMode::Json,
            CliStorageMode::Binary => StorageMode::Binary,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliIndexKind {
    BruteForce,
    Hnsw,
    Lsh,
}

impl From<CliIndexKind> for IndexKind {
    fn from(kind: CliIndexKind) -> Self {
        match kind {
            CliIndexKind::BruteForce => IndexKind::BruteForce,
            CliIndexKind::Hnsw => IndexKind::Hnsw,
            CliIndexKind::Lsh => IndexKind::Lsh,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create a new library bound to an index kind and vector dimension.
    CreateLibrary {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_enum, default_value = "brute-force")]
        index: CliIndexKind,
        /// Must match --embedding-dim for this store.
        #[arg(long, default_value_t = 8)]
        dimension: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Add a document to an existing library.
    AddDocument {
        library_id: u64,
        name: String,
    },
    /// Embed and add a chunk of text to an existing document.
    AddChunk {
        document_id: u64,
        text: String,
    },
    /// Embed the query and return the top-k most similar chunks.
    Search {
        library_id: u64,
        query: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
    /// Discard and rebuild a library's index from its stored chunks.
    RebuildIndex {
        library_id: u64,
    },
    /// Write the current store to an explicit snapshot path.
    Snapshot {
        output: PathBuf,
    },
    /// Replace the active store with a snapshot loaded from `input`.
    Load {
        input: PathBuf,
    },
}

fn store_path(cli: &Cli, config: &Config) -> PathBuf {
    cli.store.clone().unwrap_or_else(|| PathBuf::from(&config.snapshot_path))
}

fn storage_mode(cli: &Cli, config: &Config) -> StorageMode {
    cli.mode.map(StorageMode::from).unwrap_or(config.storage_mode)
}

fn open_service(path: &PathBuf, mode: StorageMode, embedding_dim: usize) -> Result<LibraryService> {
    if path.exists() {
        let snapshot = Snapshot::load(path, mode)
            .with_context(|| format!("loading store from {}", path.display()))?;
        LibraryService::restore(snapshot, Arc::new(DeterministicHashProvider::new(embedding_dim)))
            .context("restoring service from snapshot")
    } else {
        Ok(LibraryService::new(Arc::new(DeterministicHashProvider::new(embedding_dim))))
    }
}

fn save_service(service: &LibraryService, path: &PathBuf, mode: StorageMode) -> Result<()> {
    service
        .snapshot()
        .save(path, mode)
        .with_context(|| format!("saving store to {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = Config::from_env().context("reading VECSTORE_* configuration")?;
    let path = store_path(&cli, &config);
    let mode = storage_mode(&cli, &config);

    match &cli.command {
        Command::CreateLibrary {
            name,
            description,
            index,
            dimension,
            seed,
        } => {
            let service = open_service(&path, mode, cli.embedding_dim)?;
            let index_config = IndexConfig::new((*index).into(), *dimension, *seed);
            let library = service.create_library(name.clone(), description.clone(), index_config)?;
            save_service(&service, &path, mode)?;
            println!("{}", library.get());
        }
        Command::AddDocument { library_id, name } => {
            let service = open_service(&path, mode, cli.embedding_dim)?;
            let library = vecstore_core::LibraryId(*library_id);
            let document = service.add_document(library, name.clone(), Metadata::new())?;
            save_service(&service, &path, mode)?;
            println!("{}", document.get());
        }
        Command::AddChunk { document_id, text } => {
            let service = open_service(&path, mode, cli.embedding_dim)?;
            let document = vecstore_core::DocumentId(*document_id);
            let chunk = service.add_chunk(document, text.clone(), Metadata::new())?;
            save_service(&service, &path, mode)?;
            println!("{}", chunk.get());
        }
        Command::Search { library_id, query, k } => {
            let service = open_service(&path, mode, cli.embedding_dim)?;
            let library = vecstore_core::LibraryId(*library_id);
            let results = service.search(library, query, *k, None)?;
            for (chunk, score) in results {
                println!("{:.6}\t{}\t{}", score, chunk.id.get(), chunk.text);
            }
        }
        Command::RebuildIndex { library_id } => {
            let service = open_service(&path, mode, cli.embedding_dim)?;
            let library = vecstore_core::LibraryId(*library_id);
            service.rebuild_index(library)?;
            save_service(&service, &path, mode)?;
        }
        Command::Snapshot { output } => {
            let service = open_service(&path, mode, cli.embedding_dim)?;
            service
                .snapshot()
                .save(output, mode)
                .with_context(|| format!("writing snapshot to {}", output.display()))?;
        }
        Command::Load { input } => {
            let snapshot =
                Snapshot::load(input, mode).with_context(|| format!("loading snapshot from {}", input.display()))?;
            snapshot
                .save(&path, mode)
                .with_context(|| format!("activating snapshot as {}", path.display()))?;
        }
    }

    Ok(())
}
