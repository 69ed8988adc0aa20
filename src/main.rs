mod bundle;
mod catalogs;
mod commands;
mod config;
mod error;
mod logging;
mod output;
mod parsers;
mod verify;

use clap::{Parser, Subcommand};
use config::{Overrides, Settings};
use std::path::PathBuf;
use tracing::debug;

/// Generate FHIR CodeSystem/ValueSet transaction bundles from master-data CSVs
#[derive(Parser)]
#[command(name = "fhir-bundles", version)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding the catalog CSV files
    #[arg(long, global = true)]
    input_dir: Option<PathBuf>,

    /// Directory the bundle JSON files are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// JSON file replacing the built-in catalog table
    #[arg(long, global = true)]
    catalogs: Option<PathBuf>,

    /// Publication date stamped on the resources (YYYY-MM-DD)
    #[arg(long, global = true)]
    date: Option<String>,

    /// Base URL for canonical CodeSystem/ValueSet urls
    #[arg(long, global = true)]
    canonical_base: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a bundle for every configured catalog (default)
    GenerateAll,
    /// Generate one catalog's bundle; fails on any error
    Generate {
        /// CSV file name or bundle name
        #[arg(default_value = "brand.csv")]
        catalog: String,
    },
    /// Check a generated bundle for internal consistency
    Verify {
        path: PathBuf,
        /// Expected SHA-256 of the file
        #[arg(long)]
        sha256: Option<String>,
    },
    /// List configured catalogs
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let settings = Settings::from_env(Overrides {
        input_dir: cli.input_dir,
        output_dir: cli.output_dir,
        catalogs: cli.catalogs,
        date: cli.date,
        canonical_base: cli.canonical_base,
    })?;
    debug!(
        "Input {:?}, output {:?}, {} catalogs",
        settings.input_dir,
        settings.output_dir,
        settings.catalogs.len()
    );

    let mut stdout = std::io::stdout().lock();

    match cli.command.unwrap_or(Commands::GenerateAll) {
        Commands::GenerateAll => {
            let results = commands::generate_all(&settings, &mut stdout).await?;
            debug!(
                "{} of {} catalogs generated",
                results.iter().filter(|r| r.success()).count(),
                results.len()
            );
        }
        Commands::Generate { catalog } => {
            commands::generate_one(&settings, &catalog, &mut stdout).await?;
        }
        Commands::Verify { path, sha256 } => {
            if !commands::verify_bundle(&path, sha256.as_deref(), &mut stdout).await? {
                anyhow::bail!("Bundle {} failed verification", path.display());
            }
        }
        Commands::List => {
            commands::list_catalogs(&settings, &mut stdout)?;
        }
    }

    Ok(())
}
