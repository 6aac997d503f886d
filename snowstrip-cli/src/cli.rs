use std::{io, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use inquire::{CustomType, Text};
use snowstrip_core::{Config, FileSource, Pipeline, SourceId, StripError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::serve;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "snowstrip", version, about = "Snow accumulation strip renderer")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true, env = "SNOWSTRIP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Local documents that replace the configured URLs.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Read telemetry from a saved document.
    #[arg(long)]
    pub telemetry_file: Option<PathBuf>,

    /// Read the forecast from a saved document.
    #[arg(long)]
    pub forecast_file: Option<PathBuf>,

    /// Render as of this RFC 3339 time; if absent, means "now".
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render the strip once and write it as a PNG file.
    Render {
        #[arg(short, long, default_value = "weatherstrip.png")]
        output: PathBuf,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Serve the strip as a base64 PNG over HTTP.
    Serve {
        #[arg(long, env = "SNOWSTRIP_ADDR", default_value = "0.0.0.0:8080")]
        addr: String,
    },

    /// Print the merged timeline as JSON.
    Dump {
        /// Only merge this source (telemetry or forecast).
        #[arg(long, value_parser = parse_source_id)]
        source: Option<SourceId>,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Interactively edit the sources, timezone and snow line.
    Configure,
}

impl Cli {
    pub fn init_tracing(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
    }

    pub async fn run(self) -> Result<()> {
        let config = self.load_config()?;

        match self.command {
            Command::Render { ref output, ref sources } => {
                let pipeline = build_pipeline(&config, sources)?;
                let png = pipeline.render_png(&sources.now()?).await?;
                std::fs::write(output, &png)
                    .with_context(|| format!("Failed to write image: {}", output.display()))?;
                info!(path = %output.display(), bytes = png.len(), "wrote strip");
            }
            Command::Serve { ref addr } => {
                let pipeline = Pipeline::from_config(&config)?;
                serve::run_server(Arc::new(serve::ServerState::new(pipeline)), addr).await?;
            }
            Command::Dump { source, ref sources } => {
                let pipeline = build_pipeline(&config, sources)?;
                let timeline = match source {
                    Some(id) => pipeline.build_timeline_from(&[id]).await?,
                    None => pipeline.build_timeline().await?,
                };
                println!("{}", timeline.to_json_pretty()?);
            }
            Command::Configure => {
                let updated = prompt_config(config)?;
                let path = match &self.config {
                    Some(path) => {
                        updated.save_to(path)?;
                        path.clone()
                    }
                    None => updated.save()?,
                };
                println!("Saved configuration to {}", path.display());
            }
        }

        Ok(())
    }

    fn load_config(&self) -> Result<Config> {
        let loaded = match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        };

        // Only `configure` may start over from defaults.
        match loaded {
            Err(e) if matches!(self.command, Command::Configure) => {
                warn!(error = %format!("{e:#}"), "ignoring unusable config, starting from defaults");
                Ok(Config::default())
            }
            other => other,
        }
    }
}

impl SourceArgs {
    fn now(&self) -> Result<DateTime<Utc>> {
        match &self.at {
            Some(at) => Ok(DateTime::parse_from_rfc3339(at)
                .with_context(|| format!("Invalid --at time '{at}', expected RFC 3339"))?
                .with_timezone(&Utc)),
            None => Ok(Utc::now()),
        }
    }
}

fn parse_source_id(value: &str) -> std::result::Result<SourceId, StripError> {
    SourceId::try_from(value)
}

fn build_pipeline(config: &Config, args: &SourceArgs) -> Result<Pipeline> {
    let mut pipeline = Pipeline::from_config(config)?;
    if let Some(path) = &args.telemetry_file {
        pipeline = pipeline.with_telemetry(Box::new(FileSource::new(SourceId::Telemetry, path)));
    }
    if let Some(path) = &args.forecast_file {
        pipeline = pipeline.with_forecast(Box::new(FileSource::new(SourceId::Forecast, path)));
    }
    Ok(pipeline)
}

fn prompt_config(mut cfg: Config) -> Result<Config> {
    cfg.sources.telemetry_url = Text::new("Telemetry URL:")
        .with_default(&cfg.sources.telemetry_url)
        .prompt()?;
    cfg.sources.forecast_url = Text::new("Forecast URL:")
        .with_default(&cfg.sources.forecast_url)
        .prompt()?;
    cfg.location.timezone = Text::new("Timezone:")
        .with_default(&cfg.location.timezone)
        .with_help_message("IANA name, e.g. America/Los_Angeles")
        .prompt()?;
    cfg.render.snow_line_m = CustomType::<f64>::new("Snow line (metres):")
        .with_default(cfg.render.snow_line_m)
        .with_error_message("Please enter a number")
        .prompt()?;

    cfg.validate()?;
    Ok(cfg)
}
