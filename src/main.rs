#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::significant_drop_tightening
)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use remote_mover::{Config, LockScope, Mover};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to the per-user config path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer JSON requests from stdin, one per line
    Serve {
        /// Lock scope override
        #[arg(long, value_enum)]
        lock_scope: Option<LockScope>,

        /// Accept any SSH host key (insecure)
        #[arg(long)]
        insecure_skip_host_key_check: bool,
    },

    /// Show or update the saved configuration
    Config {
        /// Lock scope for dispatched operations
        #[arg(long, value_enum)]
        lock_scope: Option<LockScope>,

        /// Verify SSH host keys against known_hosts
        #[arg(long)]
        verify_host_keys: Option<bool>,

        /// known_hosts file to verify against
        #[arg(long)]
        known_hosts: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) if path.exists() => Config::load_from(path),
        Some(_) => Ok(Config::default()),
        None => Config::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries replies, so logs go to stderr
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Serve {
            lock_scope,
            insecure_skip_host_key_check,
        } => {
            if let Some(scope) = lock_scope {
                config.lock_scope = scope;
            }
            if insecure_skip_host_key_check {
                config.verify_host_keys = false;
            }
            serve(&config).await?;
        }
        Commands::Config {
            lock_scope,
            verify_host_keys,
            known_hosts,
        } => {
            if lock_scope.is_none() && verify_host_keys.is_none() && known_hosts.is_none() {
                println!("{}", serde_json::to_string_pretty(&config)?);
                return Ok(());
            }

            if let Some(scope) = lock_scope {
                config.lock_scope = scope;
            }
            if let Some(verify) = verify_host_keys {
                config.verify_host_keys = verify;
            }
            if let Some(path) = known_hosts {
                config.known_hosts_path = Some(path);
            }

            match &cli.config {
                Some(path) => config.save_to(path)?,
                None => config.save()?,
            }
            println!("Configuration saved successfully!");
        }
    }

    Ok(())
}

async fn serve(config: &Config) -> Result<()> {
    let mover = Arc::new(Mover::from_config(config)?);
    tracing::info!(lock_scope = ?config.lock_scope, "serving requests on stdin");

    let input = BufReader::new(tokio::io::stdin());
    remote_mover::serve::serve(mover, input, tokio::io::stdout()).await?;
    Ok(())
}
