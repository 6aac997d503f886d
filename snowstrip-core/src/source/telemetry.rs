//! Station time series: parallel arrays of timestamps and readings, one entry
//! per hourly sample, values in English units.
//!
//! A sample is stamped at the *end* of the hour it measures, so each one is
//! attributed to the hour before its timestamp.

use chrono::{DateTime, FixedOffset, TimeDelta};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

use crate::{
    Result, StripError,
    model::{HourKey, HourRecord, hour_key},
};

#[derive(Debug, Deserialize)]
struct TelemetryDocument {
    #[serde(rename = "STATION", default)]
    stations: Vec<Station>,
}

#[derive(Debug, Deserialize)]
struct Station {
    #[serde(rename = "STID", default)]
    stid: Option<String>,
    #[serde(rename = "OBSERVATIONS")]
    observations: Observations,
}

#[derive(Debug, Deserialize)]
struct Observations {
    date_time: Vec<String>,
    #[serde(rename = "snow_depth_set_1", default)]
    snow_depth: Option<Vec<Option<f64>>>,
    #[serde(rename = "air_temp_set_1", default)]
    air_temp: Option<Vec<Option<f64>>>,
    #[serde(rename = "precip_accum_one_hour_set_1", default)]
    precip_one_hour: Option<Vec<Option<f64>>>,
}

/// Parse a telemetry document into partial records keyed one hour before each
/// sample's timestamp.
pub fn parse_telemetry(data: &[u8], tz: Tz) -> Result<Vec<(HourKey, HourRecord)>> {
    let doc: TelemetryDocument = serde_json::from_slice(data)?;
    let station = doc.stations.into_iter().next().ok_or(StripError::NoStations)?;
    let obs = station.observations;

    let len = obs.date_time.len();
    let depth = series("snow_depth", obs.snow_depth, len)?;
    let temp = series("air_temp", obs.air_temp, len)?;
    let precip = series("precip_accum_one_hour", obs.precip_one_hour, len)?;

    let mut partials = Vec::with_capacity(len);
    for (i, stamp) in obs.date_time.iter().enumerate() {
        let ts = parse_timestamp(stamp)?;
        let record = HourRecord {
            observed_snow: depth[i],
            observed_temp: temp[i],
            observed_precip: precip[i],
            ..Default::default()
        };
        if record.is_empty() {
            continue;
        }
        partials.push((hour_key(&ts, tz) - TimeDelta::hours(1), record));
    }

    debug!(
        station = station.stid.as_deref().unwrap_or("?"),
        samples = len,
        records = partials.len(),
        "parsed telemetry"
    );

    Ok(partials)
}

/// A series the station doesn't report is all-null; one that is present must
/// line up with the timestamps.
fn series(name: &str, values: Option<Vec<Option<f64>>>, len: usize) -> Result<Vec<Option<f64>>> {
    match values {
        None => Ok(vec![None; len]),
        Some(values) if values.len() == len => Ok(values),
        Some(values) => Err(StripError::Parse(format!(
            "telemetry series '{name}' has {} values for {len} timestamps",
            values.len()
        ))),
    }
}

fn parse_timestamp(stamp: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(stamp)
        .or_else(|_| DateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S%z"))
        .map_err(|e| StripError::Parse(format!("invalid telemetry timestamp '{stamp}': {e}")))
}
