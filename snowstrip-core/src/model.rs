use chrono::{DateTime, TimeDelta, TimeZone, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Primary index of the timeline: an instant truncated to the whole hour in the
/// configured local timezone.
pub type HourKey = DateTime<Tz>;

/// Truncate `instant` to the start of its hour, expressed in `tz`.
pub fn hour_key<T: TimeZone>(instant: &DateTime<T>, tz: Tz) -> HourKey {
    let local = instant.with_timezone(&tz);
    let into_hour = TimeDelta::seconds(i64::from(local.minute()) * 60 + i64::from(local.second()))
        + TimeDelta::nanoseconds(i64::from(local.nanosecond()));
    local - into_hour
}

/// Everything known about a single hour, observed or forecast.
///
/// Each source owns a subset of the fields. A record produced by one parser pass
/// is a *partial* record: it only carries the fields that pass computes and is
/// folded into the timeline with [`HourRecord::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HourRecord {
    /// Forecast snowfall for the hour, inches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_snow: Option<f64>,
    /// Forecast snow level, metres.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_snow_level: Option<f64>,
    /// Forecast air temperature, °F.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_temp: Option<f64>,

    /// Measured total snow depth at the end of the hour, inches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_snow: Option<f64>,
    /// Measured air temperature, °F.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_temp: Option<f64>,
    /// Measured precipitation over the hour, inches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_precip: Option<f64>,
}

impl HourRecord {
    /// Copy every field that is set on `partial` onto `self`.
    ///
    /// Fields `partial` does not carry are left as they are, so a merge can
    /// never clear a value another source already provided.
    pub fn merge(&mut self, partial: &HourRecord) {
        self.predicted_snow = partial.predicted_snow.or(self.predicted_snow);
        self.predicted_snow_level = partial.predicted_snow_level.or(self.predicted_snow_level);
        self.predicted_temp = partial.predicted_temp.or(self.predicted_temp);
        self.observed_snow = partial.observed_snow.or(self.observed_snow);
        self.observed_temp = partial.observed_temp.or(self.observed_temp);
        self.observed_precip = partial.observed_precip.or(self.observed_precip);
    }

    pub fn is_empty(&self) -> bool {
        *self == HourRecord::default()
    }
}
