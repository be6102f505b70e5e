//! CLI entry point for the `sls-change` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use sls_change::cli::commands::{self, DatasetPair};
use sls_change::{DetectError, DetectorConfig};

#[derive(Parser)]
#[command(
    name = "sls-change",
    about = "Detect changes between two snapshots of an SLS polygon dataset"
)]
struct Cli {
    /// Output format: "text" (default) or "json"
    #[arg(long, default_value = "text")]
    format: String,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare an old and a new dataset
    Detect {
        /// Old dataset (.gpkg, .geojson)
        old: PathBuf,
        /// New dataset (.gpkg, .geojson)
        new: PathBuf,
        /// Feature table to read from the old GeoPackage
        #[arg(long)]
        old_layer: Option<String>,
        /// Feature table to read from the new GeoPackage
        #[arg(long)]
        new_layer: Option<String>,
        /// Write the merged report as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Write geometry-bearing records to a GeoPackage
        #[arg(long)]
        gpkg: Option<PathBuf>,
        /// Skip the symmetric-difference pass
        #[arg(long)]
        no_spatial: bool,
    },
    /// Check schema preconditions and duplicates only
    Validate {
        /// Old dataset
        old: PathBuf,
        /// New dataset
        new: PathBuf,
        #[arg(long)]
        old_layer: Option<String>,
        #[arg(long)]
        new_layer: Option<String>,
    },
    /// Describe a dataset
    Info {
        /// Dataset file
        file: PathBuf,
        /// Feature table inside a GeoPackage
        #[arg(long)]
        layer: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

fn main() {
    let cli = Cli::parse();
    let json = cli.format == "json";

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => DetectorConfig::load(path),
        None => Ok(DetectorConfig::default()),
    };

    let result = config.and_then(|mut config| match cli.command {
        Commands::Detect {
            old,
            new,
            old_layer,
            new_layer,
            csv,
            gpkg,
            no_spatial,
        } => {
            if no_spatial {
                config.spatial.enabled = false;
            }
            let inputs = DatasetPair {
                old: &old,
                new: &new,
                old_layer: old_layer.as_deref(),
                new_layer: new_layer.as_deref(),
            };
            commands::cmd_detect(&inputs, &config, csv.as_deref(), gpkg.as_deref(), json)
        }
        Commands::Validate {
            old,
            new,
            old_layer,
            new_layer,
        } => {
            let inputs = DatasetPair {
                old: &old,
                new: &new,
                old_layer: old_layer.as_deref(),
                new_layer: new_layer.as_deref(),
            };
            commands::cmd_validate(&inputs, &config, json)
        }
        Commands::Info { file, layer } => commands::cmd_info(&file, layer.as_deref(), json),
        Commands::Config => commands::cmd_config(&config, json),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let code = match &e {
            DetectError::Io(_) | DetectError::MissingInput(_) => 1,
            DetectError::InvalidDataset { .. }
            | DetectError::LayerNotFound { .. }
            | DetectError::Wkb(_)
            | DetectError::Sqlite(_)
            | DetectError::Json(_) => 2,
            DetectError::Schema(_) => 3,
            DetectError::Config(_) | DetectError::TomlDe(_) | DetectError::TomlSer(_) => 4,
            _ => 5,
        };
        process::exit(code);
    }
}
