use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use multiweather_core::{Aggregator, Config, ProviderId, sources_from_config};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "multiweather", version, about = "Average temperature across weather providers")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweathermap" or "weatherunderground".
        provider: String,
    },

    /// Print the average temperature for a city.
    Temp {
        city: String,
    },

    /// Serve `GET /weather/{city}` over HTTP.
    Serve {
        /// Listen address; overrides `listen_addr` from the config.
        #[arg(long)]
        addr: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = load_config(self.config.as_deref())?;

        match self.command {
            Command::Configure { provider } => {
                let id = ProviderId::try_from(provider.as_str())?;

                let api_key = Password::new(&format!("API key for {id}:"))
                    .with_display_mode(PasswordDisplayMode::Masked)
                    .without_confirmation()
                    .prompt()
                    .context("Failed to read API key")?;
                let api_key = api_key.trim();
                if api_key.is_empty() {
                    bail!("API key must not be empty");
                }

                config.upsert_provider_api_key(id, api_key.to_owned());
                let saved_to = save_config(&config, self.config.as_deref())?;
                println!("Saved API key for '{id}' to {}", saved_to.display());
            }
            Command::Temp { city } => {
                let aggregator = build_aggregator(&config)?;

                let begin = Instant::now();
                let temp = aggregator.average_temperature(&city).await?;
                let took = begin.elapsed();

                println!("City:        {city}");
                println!("Temperature: {temp} ({:.2} °C)", temp.celsius());
                println!("Sources:     {}", aggregator.len());
                println!("Took:        {took:?}");
            }
            Command::Serve { addr } => {
                let aggregator = Arc::new(build_aggregator(&config)?);
                let addr = addr.unwrap_or_else(|| config.listen_addr_or_default().to_owned());
                server::serve(&addr, aggregator).await?;
            }
        }

        Ok(())
    }
}

/// `--config` if given, otherwise the platform default location.
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Returns the path the config was written to.
fn save_config(config: &Config, path: Option<&Path>) -> anyhow::Result<PathBuf> {
    match path {
        Some(path) => {
            config.save_to(path)?;
            Ok(path.to_path_buf())
        }
        None => {
            config.save()?;
            Config::config_file_path()
        }
    }
}

fn build_aggregator(config: &Config) -> anyhow::Result<Aggregator> {
    let sources = sources_from_config(config)?;
    Aggregator::new(sources).context(
        "No provider has an API key.\n\
         Hint: run `multiweather configure <provider>` \
         (e.g. `multiweather configure openweathermap`) first.",
    )
}
