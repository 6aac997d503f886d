//! Gridpoint forecast: independent layers of run-length encoded values.
//!
//! Every layer value covers an interval written as `<instant>/<duration>`, e.g.
//! `2024-01-10T18:00:00+00:00/PT6H`. Intervals are expanded to one partial record
//! per hour; snowfall is spread evenly over the interval while snow level and
//! temperature hold for every hour of it.

use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    Result, StripError,
    model::{HourKey, HourRecord, hour_key},
    units::{celsius_to_fahrenheit, feet_to_metres, mm_to_inches},
};

#[derive(Debug, Deserialize)]
struct ForecastDocument {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastProperties {
    #[serde(default)]
    snowfall_amount: Layer,
    #[serde(default)]
    snow_level: Layer,
    #[serde(default)]
    temperature: Layer,
}

#[derive(Debug, Default, Deserialize)]
struct Layer {
    #[serde(default)]
    uom: Option<String>,
    #[serde(default)]
    values: Vec<LayerValue>,
}

#[derive(Debug, Deserialize)]
struct LayerValue {
    #[serde(rename = "validTime")]
    valid_time: String,
    value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Series {
    Snowfall,
    SnowLevel,
    Temperature,
}

impl Series {
    fn name(self) -> &'static str {
        match self {
            Series::Snowfall => "snowfallAmount",
            Series::SnowLevel => "snowLevel",
            Series::Temperature => "temperature",
        }
    }

    /// Convert a raw layer value into the unit the timeline stores.
    fn convert(self, uom: Option<&str>, value: f64) -> Result<f64> {
        let unit = uom.map(|u| u.trim_start_matches("wmoUnit:"));
        match (self, unit) {
            (Series::Snowfall, None | Some("mm")) => Ok(mm_to_inches(value)),
            (Series::Snowfall, Some("cm")) => Ok(mm_to_inches(value * 10.0)),
            (Series::Snowfall, Some("m")) => Ok(mm_to_inches(value * 1000.0)),
            (Series::SnowLevel, None | Some("m")) => Ok(value),
            (Series::SnowLevel, Some("ft")) => Ok(feet_to_metres(value)),
            (Series::Temperature, None | Some("degC")) => Ok(celsius_to_fahrenheit(value)),
            (Series::Temperature, Some("degF")) => Ok(value),
            (series, Some(other)) => Err(StripError::Parse(format!(
                "unsupported unit '{other}' for forecast layer '{}'",
                series.name()
            ))),
        }
    }

    /// Partial record owning only this series' field, for one hour of an
    /// interval `hours` long.
    fn partial(self, value: f64, hours: u32) -> HourRecord {
        match self {
            Series::Snowfall => HourRecord {
                predicted_snow: Some(value / f64::from(hours)),
                ..Default::default()
            },
            Series::SnowLevel => HourRecord { predicted_snow_level: Some(value), ..Default::default() },
            Series::Temperature => HourRecord { predicted_temp: Some(value), ..Default::default() },
        }
    }
}

/// Parse a forecast document into hourly partial records.
///
/// Intervals whose duration isn't a whole number of hours (`PT<n>H`) are
/// logged and skipped.
pub fn parse_forecast(data: &[u8], tz: Tz) -> Result<Vec<(HourKey, HourRecord)>> {
    let doc: ForecastDocument = serde_json::from_slice(data)?;
    let props = doc.properties;

    let mut partials = Vec::new();
    for (series, layer) in [
        (Series::Snowfall, &props.snowfall_amount),
        (Series::SnowLevel, &props.snow_level),
        (Series::Temperature, &props.temperature),
    ] {
        let before = partials.len();
        expand_layer(series, layer, tz, &mut partials)?;
        debug!(layer = series.name(), hours = partials.len() - before, "expanded forecast layer");
    }

    Ok(partials)
}

fn expand_layer(
    series: Series,
    layer: &Layer,
    tz: Tz,
    out: &mut Vec<(HourKey, HourRecord)>,
) -> Result<()> {
    for entry in &layer.values {
        let Some(raw) = entry.value else {
            continue;
        };

        let (start, duration) = entry.valid_time.split_once('/').ok_or_else(|| {
            StripError::Parse(format!("validTime '{}' has no duration", entry.valid_time))
        })?;

        let start = DateTime::parse_from_rfc3339(start).map_err(|e| {
            StripError::Parse(format!("invalid forecast start '{start}': {e}"))
        })?;

        let Some(hours) = parse_hours(duration) else {
            warn!(
                layer = series.name(),
                valid_time = %entry.valid_time,
                "unable to find hour range for interval, skipping"
            );
            continue;
        };

        let value = series.convert(layer.uom.as_deref(), raw)?;
        let first = hour_key(&start, tz);
        for h in 0..hours {
            out.push((first + TimeDelta::hours(i64::from(h)), series.partial(value, hours)));
        }
    }

    Ok(())
}

/// Hour count of a `PT<n>H` duration; anything else (days, minutes, zero) is
/// unmatched.
fn parse_hours(duration: &str) -> Option<u32> {
    duration
        .strip_prefix("PT")?
        .strip_suffix('H')?
        .parse::<u32>()
        .ok()
        .filter(|h| *h > 0)
}
