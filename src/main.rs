use arena_ledger::application::config::MarketConfig;
use arena_ledger::application::engine::Marketplace;
use arena_ledger::domain::ports::{BlobStoreBox, StoreBox};
use arena_ledger::infrastructure::fs_blob::FsBlobStore;
use arena_ledger::infrastructure::in_memory::{
    InMemoryBlobStore, InMemoryCatalog, InMemoryIdentity, InMemoryStore,
};
#[cfg(feature = "storage-rocksdb")]
use arena_ledger::infrastructure::rocksdb::RocksDBStore;
use arena_ledger::interfaces::fixtures::Fixtures;
use arena_ledger::interfaces::script::command_reader::CommandReader;
use arena_ledger::interfaces::script::report_writer::ReportWriter;
use arena_ledger::interfaces::script::runner::ScriptRunner;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command script, one JSON object per line
    input: PathBuf,

    /// Users, catalog items and entry fees to run the script against
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Directory for payment proof files. Kept in memory when omitted.
    #[arg(long)]
    blob_dir: Option<PathBuf>,

    /// Largest accepted payment proof, in bytes
    #[arg(long)]
    max_proof_bytes: Option<usize>,
}

fn open_store(db_path: Option<PathBuf>) -> Result<StoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Box::new(RocksDBStore::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryStore::new()))
        }
        None => Ok(Box::new(InMemoryStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let fixtures = match &cli.fixtures {
        Some(path) => Fixtures::from_reader(File::open(path).into_diagnostic()?).into_diagnostic()?,
        None => Fixtures::default(),
    };
    let identity = InMemoryIdentity::new();
    let catalog = InMemoryCatalog::new();
    fixtures.seed(&identity, &catalog).await;

    let store = open_store(cli.db_path)?;
    let blobs: BlobStoreBox = match cli.blob_dir {
        Some(dir) => Box::new(FsBlobStore::new(dir)),
        None => Box::new(InMemoryBlobStore::new()),
    };
    let mut config = MarketConfig::default();
    if let Some(limit) = cli.max_proof_bytes {
        config.max_proof_bytes = limit;
    }

    let market = Marketplace::new(store, Box::new(identity), Box::new(catalog), blobs)
        .with_config(config);
    let base_dir = cli
        .input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut runner = ScriptRunner::new(market, &fixtures, base_dir);

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(BufReader::new(file));
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    for (line, command) in reader.commands() {
        match command {
            Ok(script) => {
                let outcome = runner.run(line, script).await;
                writer.write(&outcome).into_diagnostic()?;
            }
            Err(e) => {
                eprintln!("Error reading command on line {line}: {e}");
            }
        }
    }
    writer.flush().into_diagnostic()?;

    Ok(())
}
