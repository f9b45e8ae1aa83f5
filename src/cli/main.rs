//! CLI binary entry point for statcast-load

mod error;
mod prompt;

use chrono::Local;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use error::CliError;
use prompt::prompt_credentials;
use statcast_loader::config::{CONFIG_FILENAME, sample_config};
use statcast_loader::{
    ConnectionManager, ExistsPolicy, LoaderConfig, Provisioner, SavantProvider, pipeline,
};

#[derive(Parser)]
#[command(name = "statcast-load")]
#[command(about = "Acquire Statcast pitch data and bulk load it into PostgreSQL")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults apply when it does not exist)
    #[arg(short, long, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire, provision, load and reconcile (default)
    Run {
        /// Override the primary table policy: fail, replace or append-if-compatible
        #[arg(long)]
        table_exists: Option<ExistsPolicy>,
    },
    /// List schemas and tables of the target database
    Layout {
        /// Restrict the listing to these schemas
        #[arg(short, long)]
        schema: Vec<String>,
    },
    /// Print the effective configuration
    Config {
        /// Print an annotated sample instead
        #[arg(long)]
        sample: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(e) = dispatch(cli) {
        eprintln!("Error [{}]: {}", e.classification(), e);
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let mut config = LoaderConfig::load_file(&cli.config)?;

    match cli.command.unwrap_or(Commands::Run { table_exists: None }) {
        Commands::Config { sample: true } => {
            print!("{}", sample_config());
            Ok(())
        }
        Commands::Config { sample: false } => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Layout { schema } => {
            let credentials = prompt_credentials(&mut io::stdin().lock(), &mut io::stdout())?;
            block_on(async {
                let target = ConnectionManager::connect(config.target_params(&credentials)).await?;
                let schemas = (!schema.is_empty()).then_some(schema.as_slice());
                let layout = Provisioner::new(&target).database_layout(schemas).await?;
                for (name, tables) in layout {
                    println!("{}", name);
                    for table in tables {
                        println!("  {}", table);
                    }
                }
                Ok::<(), CliError>(())
            })
        }
        Commands::Run { table_exists } => {
            if let Some(policy) = table_exists {
                config.load.table_exists = policy;
            }
            let credentials = prompt_credentials(&mut io::stdin().lock(), &mut io::stdout())?;
            let provider = SavantProvider::new(
                &config.acquisition.savant_url,
                &config.acquisition.register_url,
            )
            .map_err(statcast_loader::PipelineError::from)?;
            let today = Local::now().date_naive();

            block_on(async {
                let report = pipeline::run(&config, &credentials, &provider, today).await?;
                println!(
                    "loaded {} rows ({} windows, {} empty) and {} identities",
                    report.rows_loaded,
                    report.acquisition.windows_fetched,
                    report.acquisition.windows_empty,
                    report.identities_loaded
                );
                Ok::<(), CliError>(())
            })
        }
    }
}

/// Drive a future on a single-threaded runtime
fn block_on<F>(future: F) -> Result<(), CliError>
where
    F: std::future::Future<Output = Result<(), CliError>>,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?
        .block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_accepts_table_policy_override() {
        let cli = Cli::try_parse_from(["statcast-load", "run", "--table-exists", "append"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Run {
                table_exists: Some(ExistsPolicy::AppendIfCompatible)
            })
        ));

        let cli = Cli::try_parse_from(["statcast-load", "run"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Run { table_exists: None })));

        assert!(Cli::try_parse_from(["statcast-load", "run", "--table-exists", "merge"]).is_err());
    }
}
