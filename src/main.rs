//! qrsteg CLI - pair QR codes with images

use clap::{Parser, Subcommand, ValueEnum};
use qrsteg::config::{self, Settings};
use qrsteg::data_uri::read_image_file;
use qrsteg::kv::FileKv;
use qrsteg::store::SaveOutcome;
use qrsteg::ui::{self, Icons, RecordTable};
use qrsteg::{PersistentRecordStore, Record, SqliteEngine};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Characters of each image shown in the record table
const PREVIEW_LEN: usize = 40;

#[derive(Parser)]
#[command(name = "qrsteg")]
#[command(version)]
#[command(about = "Pair scanned QR codes with images in a persistent SQLite snapshot")]
#[command(long_about = r#"
qrsteg keeps QR code / image pairs in an in-memory SQLite database whose
snapshot is stored, base64-encoded, under a single key of a JSON key-value file.

Example usage:
  qrsteg init
  qrsteg add --code 1 --image step1.png
  qrsteg list
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Key-value file holding the snapshot
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Key the snapshot is stored under
    #[arg(long, global = true)]
    key: Option<String>,

    /// Directory for staging snapshot images
    #[arg(long, global = true)]
    scratch_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Pair a QR code with an image
    Add {
        /// QR code (step number)
        #[arg(short, long, default_value = "")]
        code: String,

        /// Image file to attach
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Show every stored pair
    List {
        #[arg(short, long, value_enum, default_value_t = Format::Human)]
        format: Format,
    },

    /// Show store and snapshot statistics
    Status,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Human,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let Cli { config: config_path, storage, key, scratch_dir, command, .. } = cli;
    let config_path = config_path.as_deref();

    match command {
        Commands::Init { force } => {
            let path = config_path.map(Path::to_path_buf).unwrap_or_else(config::default_config_path);
            config::write_config(&path, &config::default_config(), force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }

        Commands::Add { code, image } => {
            let settings = load_settings(config_path, storage, key, scratch_dir)?;
            let mut store = open_store(&settings)?;
            let image = match image {
                Some(path) => Some(read_image_file(&path)?),
                None => None,
            };

            match store.insert_record(&code, image.as_deref()) {
                Ok(SaveOutcome::Saved(records)) => {
                    ui::success(store.status());
                    print_records(&records);
                }
                Ok(SaveOutcome::Incomplete) | Ok(SaveOutcome::NotReady) => {
                    ui::warn(store.status());
                }
                Err(e) => {
                    ui::error(&format!("Could not save QR code {}", code));
                    return Err(e.into());
                }
            }
        }

        Commands::List { format } => {
            let settings = load_settings(config_path, storage, key, scratch_dir)?;
            let mut store = open_store(&settings)?;
            let records = store.fetch_all_records()?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&records)?),
                Format::Human => {
                    ui::header("Stored QR codes");
                    print_records(&records);
                }
            }
        }

        Commands::Status => {
            let settings = load_settings(config_path, storage, key, scratch_dir)?;
            let store = open_store(&settings)?;
            let info = store.snapshot_info()?;
            let records = info.records.to_string();
            let snapshot = ui::human_bytes(info.bytes);
            let encoded = ui::human_bytes(info.encoded_len);

            ui::status(Icons::DATABASE, "Storage", &settings.storage.display().to_string());
            ui::status(Icons::KEY, "Key", store.key());
            ui::section("Snapshot");
            println!(
                "{}",
                ui::stats_table(&[
                    ("State", store.state().as_str()),
                    ("Records", records.as_str()),
                    ("Snapshot", snapshot.as_str()),
                    ("Encoded", encoded.as_str()),
                    ("Digest", info.digest.as_str()),
                ])
            );
        }
    }

    Ok(())
}

/// Resolve settings from flags, the config file and defaults
fn load_settings(
    config_path: Option<&Path>,
    storage: Option<PathBuf>,
    key: Option<String>,
    scratch_dir: Option<PathBuf>,
) -> anyhow::Result<Settings> {
    let file_config = config::load_config(config_path)?;
    let settings = Settings::resolve(file_config.as_ref(), storage, key, scratch_dir);
    tracing::debug!("Using {:?}", settings);
    Ok(settings)
}

/// Start the engine and load the store behind the configured key
fn open_store(settings: &Settings) -> anyhow::Result<PersistentRecordStore<FileKv>> {
    let store = SqliteEngine::start(&settings.scratch_dir).and_then(|engine| {
        let mut store = PersistentRecordStore::new(
            engine,
            FileKv::new(&settings.storage),
            settings.key.clone(),
        );
        store.initialize()?;
        Ok(store)
    });

    match store {
        Ok(store) => {
            tracing::debug!("{}", store.status());
            Ok(store)
        }
        Err(e) => {
            ui::error(qrsteg::store::MSG_FAILED);
            Err(e.into())
        }
    }
}

fn print_records(records: &[Record]) {
    ui::section("Database contents");
    println!("{}", RecordTable::new(PREVIEW_LEN).render(records));
}
