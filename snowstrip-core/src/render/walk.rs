use chrono::{DateTime, TimeDelta, TimeZone, Timelike};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    Result, StripError,
    config::RenderConfig,
    model::{HourKey, HourRecord, hour_key},
    render::{
        bitmap::{Bitmap, GridGeometry},
        palette::{Rgb, TemperatureScale},
    },
    timeline::Timeline,
};

/// Tick rows painted at local midnight.
const MIDNIGHT_TICK_ROWS: [i64; 2] = [1, 2];
/// Tick row painted at local noon.
const NOON_TICK_ROW: i64 = 1;
/// Top row of the grid holds the temperature indicator.
const TEMPERATURE_ROW: i64 = 0;

/// Hour range covered by one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub now: HourKey,
    /// First visible column.
    pub graph_start: HourKey,
    /// One past the last visible column.
    pub graph_end: HourKey,
    /// Reset boundary the accumulation walk starts from.
    pub walk_start: HourKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Branch {
    Past,
    Future,
    /// No record for the hour; nothing but ticks was painted.
    Skipped,
}

/// Accumulation state recorded for each visible column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourTrace {
    pub hour: HourKey,
    pub column: u32,
    pub total: f64,
    pub branch: Branch,
}

/// A finished render.
#[derive(Debug, Clone)]
pub struct Strip {
    pub bitmap: Bitmap,
    pub window: Window,
    pub trace: Vec<HourTrace>,
}

impl Strip {
    pub fn trace_at(&self, hour: &HourKey) -> Option<&HourTrace> {
        self.trace.iter().find(|t| t.hour == *hour)
    }
}

/// Running snowfall total since the last reset boundary.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    total: f64,
    /// Lowest observed depth since the last reset; `None` until a depth is seen.
    start_depth: Option<f64>,
}

impl Accumulator {
    fn reset(&mut self, record: Option<&HourRecord>, at_or_before_now: bool) {
        if self.total > 0.0 {
            self.total = 0.0;
        }
        if at_or_before_now {
            self.start_depth = record.and_then(|r| r.observed_snow);
        }
    }

    /// Fold in an observed depth. The total is a running max so dips in the
    /// depth reading never shrink the bar within a reset period.
    fn observe(&mut self, depth: f64) {
        let start = self.start_depth.map_or(depth, |s| s.min(depth));
        self.start_depth = Some(start);
        self.total = self.total.max(depth - start);
    }

    fn add_forecast(&mut self, snow: f64) {
        self.total += snow.max(0.0);
    }
}

/// Walks a [`Timeline`] hour by hour and paints the strip.
#[derive(Debug, Clone)]
pub struct StripRenderer {
    config: RenderConfig,
    tz: Tz,
    geometry: GridGeometry,
    scale: TemperatureScale,
}

impl StripRenderer {
    pub fn new(config: RenderConfig, tz: Tz) -> Result<Self> {
        config.validate()?;
        let geometry = GridGeometry::from_config(&config);
        let scale = TemperatureScale::new(&config.palette, config.cold_temp, config.hot_temp);
        Ok(Self { config, tz, geometry, scale })
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn window<T: TimeZone>(&self, now: &DateTime<T>) -> Window {
        let now = hour_key(now, self.tz);
        let graph_start = now - TimeDelta::hours(i64::from(self.config.lead_hours));
        let graph_end = graph_start + TimeDelta::hours(i64::from(self.config.grid_width));

        let mut walk_start = graph_start;
        while walk_start.hour() != self.config.reset_hour
            && graph_start - walk_start < TimeDelta::hours(48)
        {
            walk_start -= TimeDelta::hours(1);
        }

        Window { now, graph_start, graph_end, walk_start }
    }

    pub fn is_night(&self, hour: u32) -> bool {
        let (start, end) = (self.config.night_start, self.config.night_end);
        if start > end {
            hour >= start || hour < end
        } else {
            hour >= start && hour < end
        }
    }

    /// First row of the accumulation bar for `total`; `grid_height` means no bar.
    pub fn bar_top(&self, total: f64) -> i64 {
        let height = i64::from(self.config.grid_height);
        let rows = (total / self.config.inches_per_row).floor() as i64;
        (height - rows).clamp(1, height)
    }

    pub fn render<T: TimeZone>(&self, timeline: &Timeline, now: &DateTime<T>) -> Result<Strip> {
        let window = self.window(now);
        debug!(
            now = %window.now,
            graph_start = %window.graph_start,
            walk_start = %window.walk_start,
            "computed render window"
        );

        self.ensure_observed_depth(timeline, &window)?;

        let mut acc = Accumulator::default();
        let palette = &self.config.palette;
        let mut bitmap = Bitmap::new(self.geometry, palette.background);
        let mut trace = Vec::with_capacity(self.config.grid_width as usize);

        let mut curr = window.walk_start;
        while curr < window.graph_end {
            let hour = curr.hour();
            let visible = curr >= window.graph_start;
            let column = (curr - window.graph_start).num_hours();

            if visible {
                if curr == window.now {
                    bitmap.paint_column(column, 1, palette.tick);
                }
                self.paint_ticks(&mut bitmap, column, hour);
            }

            let record = timeline.get(&curr);
            if hour == self.config.reset_hour {
                acc.reset(record, curr <= window.now);
            }

            let branch = match record {
                None => Branch::Skipped,
                Some(record) if !visible => {
                    if let Some(depth) = record.observed_snow {
                        acc.observe(depth);
                    }
                    Branch::Past
                }
                Some(record) if curr >= window.now => {
                    self.paint_future(&mut bitmap, &mut acc, column, hour, record);
                    Branch::Future
                }
                Some(record) => {
                    self.paint_past(&mut bitmap, &mut acc, column, hour, record);
                    Branch::Past
                }
            };

            if visible {
                self.paint_ticks(&mut bitmap, column, hour);
                trace.push(HourTrace {
                    hour: curr,
                    column: column as u32,
                    total: acc.total,
                    branch,
                });
            }

            curr += TimeDelta::hours(1);
        }

        info!(
            columns = trace.len(),
            skipped = trace.iter().filter(|t| t.branch == Branch::Skipped).count(),
            "rendered strip"
        );

        Ok(Strip { bitmap, window, trace })
    }

    /// Fails unless some hour between the walk start and now carries an
    /// observed depth. The walk starts on a reset boundary, so the baseline
    /// itself is taken from the reset and the first depth after it.
    fn ensure_observed_depth(&self, timeline: &Timeline, window: &Window) -> Result<()> {
        let mut curr = window.walk_start;
        while curr <= window.now {
            if timeline.get(&curr).is_some_and(|r| r.observed_snow.is_some()) {
                return Ok(());
            }
            curr += TimeDelta::hours(1);
        }

        Err(StripError::MissingData(format!(
            "no observed snow depth between {} and {}",
            window.walk_start, window.now
        )))
    }

    fn paint_future(
        &self,
        bitmap: &mut Bitmap,
        acc: &mut Accumulator,
        column: i64,
        hour: u32,
        record: &HourRecord,
    ) {
        let palette = &self.config.palette;
        let snow = record.predicted_snow.unwrap_or(0.0);
        let is_snow = record
            .predicted_snow_level
            .is_none_or(|level| level < self.config.snow_line_m);

        if is_snow {
            acc.add_forecast(snow);
        }

        let top = self.bar_top(acc.total);
        let color = if self.is_night(hour) { palette.future_night } else { palette.future_day };
        bitmap.paint_column(column, top, color);

        let marker_row = (top - 1).max(1);
        if snow > 0.0 {
            if is_snow {
                self.paint_flakes(bitmap, column, marker_row, snow);
            } else {
                self.paint_rain(bitmap, column, marker_row);
            }
        }

        if let Some(temp) = record.predicted_temp {
            self.paint_temperature(bitmap, column, temp);
        }
    }

    fn paint_past(
        &self,
        bitmap: &mut Bitmap,
        acc: &mut Accumulator,
        column: i64,
        hour: u32,
        record: &HourRecord,
    ) {
        let palette = &self.config.palette;
        if let Some(depth) = record.observed_snow {
            acc.observe(depth);
        }

        let top = self.bar_top(acc.total);
        let color = if self.is_night(hour) { palette.past_night } else { palette.past_day };
        bitmap.paint_column(column, top, color);

        if record.observed_precip.is_some_and(|p| p > 0.0) {
            let marker_row = (top - 1).max(1);
            if record.observed_temp.is_some_and(|t| t > self.config.rain_temp) {
                self.paint_rain(bitmap, column, marker_row);
            } else {
                self.paint_flakes(bitmap, column, marker_row, f64::MIN_POSITIVE);
            }
        }

        if let Some(temp) = record.observed_temp {
            self.paint_temperature(bitmap, column, temp);
        }
    }

    fn paint_ticks(&self, bitmap: &mut Bitmap, column: i64, hour: u32) {
        let tick = self.config.palette.tick;
        match hour {
            0 => {
                for row in MIDNIGHT_TICK_ROWS {
                    bitmap.paint_cell(column, row, tick);
                }
            }
            12 => bitmap.paint_cell(column, NOON_TICK_ROW, tick),
            _ => {}
        }
    }

    fn paint_temperature(&self, bitmap: &mut Bitmap, column: i64, temp_f: f64) {
        bitmap.paint_cell(column, TEMPERATURE_ROW, self.scale.color_for(temp_f));
    }

    /// Column parity picks the marker's x offset so markers in neighbouring
    /// columns don't line up into a false gridline.
    fn marker_x(&self, column: i64) -> u32 {
        let size = self.geometry.cell_size;
        if column % 2 == 0 { size / 4 } else { size / 2 }
    }

    /// One dot for any snow, a second above 0.25 in, a third above 0.5 in.
    fn paint_flakes(&self, bitmap: &mut Bitmap, column: i64, row: i64, inches: f64) {
        let size = self.geometry.cell_size;
        let x = self.marker_x(column);
        let flake = self.config.palette.flake;

        if inches > 0.0 {
            bitmap.paint_dot(column, row, x, size * 3 / 4, flake);
        }
        if inches > 0.25 {
            bitmap.paint_dot(column, row, x + size / 8, size / 2, flake);
        }
        if inches > 0.5 {
            bitmap.paint_dot(column, row, x, size / 4, flake);
        }
    }

    fn paint_rain(&self, bitmap: &mut Bitmap, column: i64, row: i64) {
        let size = self.geometry.cell_size;
        let x = self.marker_x(column) + size / 8;
        let rain: Rgb = self.config.palette.rain;

        bitmap.paint_dot(column, row, x, size / 2, rain);
        bitmap.paint_dot(column, row, x, size / 2 + 1, rain);
    }
}
