use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::Client;
use std::{fmt::Debug, path::PathBuf, time::Duration};
use tracing::{debug, info};

use crate::{
    Result, StripError,
    config::SourcesConfig,
    model::{HourKey, HourRecord},
};

pub mod forecast;
pub mod telemetry;

/// The two documents every render is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    /// Past: station observations.
    Telemetry,
    /// Future: gridpoint forecast.
    Forecast,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Telemetry => "telemetry",
            SourceId::Forecast => "forecast",
        }
    }

    /// Every source, in merge order.
    pub const fn all() -> &'static [SourceId] {
        &[SourceId::Telemetry, SourceId::Forecast]
    }

    /// Turn a fetched document into partial records for the timeline.
    pub fn parse(&self, data: &[u8], tz: Tz) -> Result<Vec<(HourKey, HourRecord)>> {
        match self {
            SourceId::Telemetry => telemetry::parse_telemetry(data, tz),
            SourceId::Forecast => forecast::parse_forecast(data, tz),
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SourceId {
    type Error = StripError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "telemetry" => Ok(SourceId::Telemetry),
            "forecast" => Ok(SourceId::Forecast),
            _ => Err(StripError::Config(format!(
                "Unknown source '{value}'. Supported sources: telemetry, forecast."
            ))),
        }
    }
}

/// Something that can produce the raw bytes of one source document.
#[async_trait]
pub trait DocumentSource: Send + Sync + Debug {
    fn id(&self) -> SourceId;

    async fn fetch(&self) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    id: SourceId,
    url: String,
    http: Client,
}

impl HttpSource {
    pub fn new(id: SourceId, url: String, user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().user_agent(user_agent).timeout(timeout).build()?;
        Ok(Self { id, url, http })
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        debug!(source = %self.id, url = %self.url, "fetching document");

        let res = self.http.get(&self.url).send().await?;
        let status = res.status();
        let body = res.bytes().await?;

        if !status.is_success() {
            return Err(StripError::Fetch {
                source_name: self.id.to_string(),
                status: status.as_u16(),
                body: truncate_body(&String::from_utf8_lossy(&body)),
            });
        }

        info!(source = %self.id, bytes = body.len(), "fetched document");
        Ok(body.to_vec())
    }
}

/// Reads a previously saved document from disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    id: SourceId,
    path: PathBuf,
}

impl FileSource {
    pub fn new(id: SourceId, path: impl Into<PathBuf>) -> Self {
        Self { id, path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let data = tokio::fs::read(&self.path).await?;
        debug!(source = %self.id, path = %self.path.display(), bytes = data.len(), "read document");
        Ok(data)
    }
}

/// Construct the HTTP source for `id` from config.
pub fn source_from_config(id: SourceId, config: &SourcesConfig) -> Result<Box<dyn DocumentSource>> {
    let url = match id {
        SourceId::Telemetry => &config.telemetry_url,
        SourceId::Forecast => &config.forecast_url,
    };

    if url.trim().is_empty() {
        return Err(StripError::Config(format!(
            "No URL configured for source '{id}'.\n\
             Hint: run `snowstrip configure` and enter the {id} URL."
        )));
    }

    let source = HttpSource::new(
        id,
        url.clone(),
        &config.user_agent,
        Duration::from_secs(config.fetch_timeout_secs),
    )?;

    Ok(Box::new(source))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
