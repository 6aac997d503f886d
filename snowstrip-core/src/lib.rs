//! Core library for the `snowstrip` renderer.
//!
//! This crate defines:
//! - Configuration (sources, location, render geometry and palette)
//! - Parsers for the station telemetry and gridpoint forecast documents
//! - The hour-indexed timeline both parsers merge into
//! - The accumulation walk that paints the timeline onto a pixel strip
//!
//! It is used by `snowstrip-cli`, but the [`Pipeline`] can be driven from any
//! other binary or service.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod timeline;
pub mod units;

pub use config::{Config, LocationConfig, RenderConfig, SourcesConfig};
pub use error::{Result, StripError};
pub use model::{HourKey, HourRecord, hour_key};
pub use pipeline::Pipeline;
pub use render::{Bitmap, Strip, StripRenderer};
pub use source::{DocumentSource, FileSource, HttpSource, SourceId};
pub use timeline::Timeline;
