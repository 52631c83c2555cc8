//! aidmap-sync: keep per-country NGO Aid Map datasets in a CKAN catalog.
//!
//! The tool reads an HXL-tagged spreadsheet with one row per country and
//! creates or updates one dataset per country, keyed by a stable identifier
//! derived from the country's M49 code.
//!
//! # Modules
//!
//! - [`hxl`]: HXL hashtag parsing and the streaming row source
//! - [`record`]: Dataset records, resource URLs and the row-to-record builder
//! - [`catalog`]: The catalog client trait, upsert logic and the CKAN client
//! - [`sync`]: The per-row synchronisation loop and its report
//! - [`config`]: Layered configuration (defaults, YAML file, flags/env)
//! - [`error`]: Error types for aidmap-sync operations

pub mod catalog;
pub mod config;
pub mod error;
pub mod hxl;
pub mod net;
pub mod record;
pub mod sync;

use std::io::Write;

use clap::{Parser, Subcommand};

pub use error::SyncError;

use catalog::CkanClient;
use config::{Config, ConfigOverrides};
use hxl::source::{self, InputLocation};
use record::{build_record, BuildOutcome, CountryRow};
use sync::{SyncOptions, Synchronizer};

/// The aidmap-sync CLI application.
#[derive(Parser)]
#[command(name = "aidmap-sync")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Create or update one catalog dataset per input row.
    Sync(SyncArgs),
    /// Build the dataset payloads and print them as JSON, without contacting the catalog.
    Build(BuildArgs),
}

/// Arguments for the sync subcommand.
#[derive(clap::Args)]
struct SyncArgs {
    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Output format for the run summary ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the build subcommand.
#[derive(clap::Args)]
struct BuildArgs {
    #[command(flatten)]
    overrides: ConfigOverrides,
}

/// Run the aidmap-sync CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), SyncError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Sync(args)) => run_sync(args),
        Some(Commands::Build(args)) => run_build(args),
        None => {
            println!("aidmap-sync {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Synchronise NGO Aid Map country datasets into a CKAN catalog.");
            println!();
            println!("Run 'aidmap-sync --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the sync subcommand.
fn run_sync(args: SyncArgs) -> Result<(), SyncError> {
    let config = Config::resolve(&args.overrides)?;
    let (catalog_url, api_key) = config.catalog_credentials()?;
    let location = InputLocation::parse(config.input()?)?;
    let agent = net::agent(config.timeout());

    let client = CkanClient::new(
        agent.clone(),
        catalog_url,
        Some(api_key.to_string()),
        config.catalog.user_agent.clone(),
    );
    client.preflight(&config.dataset.owner_org)?;

    let rows = source::open(&location, &agent, config.catalog.user_agent.as_deref())?;

    let options = SyncOptions {
        tags: config.tags.clone(),
        build: config.build_settings(),
        label_style: config.catalog.label_style,
        check_groups: config.catalog.check_groups,
    };
    let synchronizer = Synchronizer::new(client, options);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match args.output.as_str() {
        "json" => {
            // Keep stdout a single JSON document; progress lines go to stderr.
            let report = synchronizer.run(rows, &mut std::io::stderr().lock())?;
            serde_json::to_writer_pretty(&mut out, &report).map_err(SyncError::JsonWrite)?;
            writeln!(out)?;
        }
        _ => {
            let report = synchronizer.run(rows, &mut out)?;
            write!(out, "{}", report)?;
        }
    }

    // Per-row failures are in the report; the run itself succeeded.
    Ok(())
}

/// Execute the build subcommand.
fn run_build(args: BuildArgs) -> Result<(), SyncError> {
    let config = Config::resolve(&args.overrides)?;
    let location = InputLocation::parse(config.input()?)?;
    let agent = net::agent(config.timeout());
    let settings = config.build_settings();

    let mut payloads = Vec::new();
    for row in source::open(&location, &agent, config.catalog.user_agent.as_deref())? {
        let row = match row {
            Ok(row) => row,
            Err(err) if err.is_row_local() => {
                log::warn!("{}", err);
                continue;
            }
            Err(err) => return Err(err),
        };
        let country = CountryRow::from_hxl(&row, &config.tags);
        match build_record(&country, &settings)? {
            BuildOutcome::Record(record) => {
                payloads.push(serde_json::Value::Object(
                    record.to_payload(config.catalog.label_style)?,
                ));
            }
            BuildOutcome::Skip => log::debug!("Row {} has no M49 code, skipping", row.row_number),
        }
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &payloads).map_err(SyncError::JsonWrite)?;
    writeln!(out)?;
    Ok(())
}
