use thiserror::Error;

/// Errors produced while fetching, parsing or rendering a strip.
///
/// Every variant is fatal for the invocation that produced it; the non-fatal
/// cases (unmatched forecast durations, hours without a record) never surface
/// here.
#[derive(Debug, Error)]
pub enum StripError {
    #[error("{source_name} request failed with status {status}: {body}")]
    Fetch {
        source_name: String,
        status: u16,
        body: String,
    },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("telemetry document contained no stations")]
    NoStations,

    #[error("missing data: {0}")]
    MissingData(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, StripError>;
