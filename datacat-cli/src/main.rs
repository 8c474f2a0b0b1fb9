use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use datacat_catalog::{Catalog, Selection};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::DownloadArgs;

pub mod commands;
pub mod tree;

#[derive(Debug, Parser)]
#[command(name = "datacat", version, about = "Browse and fetch datasets of the installed catalogs", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv). Overrides DATACAT_LOG_LEVEL.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the datasets of every catalog.
    List {
        #[arg(value_name = "PREFIX", short, long, help = "Only list datasets starting with this dotted path")]
        prefix: Option<String>,
    },
    /// List the stages of a dataset.
    Stages {
        #[arg(value_name = "DATASET")]
        dataset: String,
    },
    /// List the versions stored in a stage of a dataset.
    Versions {
        #[arg(value_name = "DATASET")]
        dataset: String,
        #[arg(value_name = "STAGE", short, long, help = "Stage to inspect [default: last stage]")]
        stage: Option<String>,
    },
    /// Download a version of a dataset to a local directory.
    Download {
        #[arg(value_name = "DATASET")]
        dataset: String,
        #[arg(value_name = "LOCATION")]
        location: PathBuf,
        #[arg(value_name = "STAGE", short, long, help = "Stage to download from [default: last stage]")]
        stage: Option<String>,
        #[arg(
            value_name = "VERSION",
            long,
            help = "Version to download, or a version prefix with --full-range [default: latest]"
        )]
        version: Option<String>,
        #[arg(short, long, help = "Overwrite files that already exist locally")]
        force: bool,
        #[arg(long, conflicts_with = "full_range", help = "Pick the oldest matching version")]
        oldest: bool,
        #[arg(long, help = "Download every matching version")]
        full_range: bool,
    },
    /// Load every catalog and report whether all dataset configurations are valid.
    Validate,
    /// Scaffold a new catalog package.
    CreateCatalog {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "LOCATION")]
        location: PathBuf,
    },
}

fn setup_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => datacat_config::CONFIG.log_level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let filter = if verbose > 0 {
        tracing_subscriber::EnvFilter::new(fallback)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);
    run(cli.command).await
}

async fn load_catalog() -> anyhow::Result<Catalog> {
    Ok(Catalog::from_config().await?)
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::List { prefix } => commands::list(&load_catalog().await?, prefix.as_deref()),
        Commands::Stages { dataset } => commands::stages(&load_catalog().await?, &dataset)?,
        Commands::Versions { dataset, stage } => {
            commands::versions(&load_catalog().await?, &dataset, stage.as_deref()).await?
        }
        Commands::Download {
            dataset,
            location,
            stage,
            version,
            force,
            oldest,
            full_range,
        } => {
            let args = DownloadArgs {
                dataset: &dataset,
                location: &location,
                stage: stage.as_deref(),
                version: version.as_deref(),
                force,
                selection: Selection::from_flags(oldest, full_range),
            };
            commands::download(&load_catalog().await?, args).await?
        }
        Commands::Validate => commands::validate(&load_catalog().await?),
        Commands::CreateCatalog { name, location } => commands::create_catalog(&name, &location)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[tokio::test]
    async fn create_catalog_runs_without_an_existing_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("roots");
        run(Commands::CreateCatalog {
            name: "Team Ops".to_string(),
            location: location.clone(),
        })
        .await
        .unwrap();
        assert!(location.join("team_ops/catalog_defaults.toml").is_file());
    }

    #[test]
    fn download_flags_parse() {
        let cli = Cli::parse_from([
            "datacat",
            "download",
            "ops.fips",
            "./out",
            "--stage",
            "load",
            "--full-range",
        ]);
        match cli.command {
            Commands::Download {
                stage, full_range, oldest, version, ..
            } => {
                assert_eq!(stage.as_deref(), Some("load"));
                assert!(full_range && !oldest);
                assert!(version.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["datacat", "download", "d", "l", "--oldest", "--full-range"]).is_err());
    }
}
