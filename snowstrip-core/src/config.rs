use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{StripError, render::palette::Palette, units::metres_to_feet};

/// Where the two source documents come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Station time series (snow depth, air temperature, hourly precipitation).
    pub telemetry_url: String,
    /// Gridpoint forecast document.
    pub forecast_url: String,
    /// Sent with every request; the forecast service rejects anonymous clients.
    pub user_agent: String,
    pub fetch_timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            telemetry_url: "https://api.synopticdata.com/v2/stations/timeseries?stid=STS54\
                            &recent=4320&units=english&obtimezone=utc&token=YOUR_TOKEN"
                .to_string(),
            forecast_url: "https://api.weather.gov/gridpoints/SEW/164,65".to_string(),
            user_agent: concat!("snowstrip/", env!("CARGO_PKG_VERSION")).to_string(),
            fetch_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Free-form label used in log output.
    pub name: String,
    /// IANA zone every hour key and day boundary is expressed in.
    pub timezone: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: "Stevens Pass".to_string(),
            timezone: "America/Los_Angeles".to_string(),
        }
    }
}

impl LocationConfig {
    pub fn tz(&self) -> Result<Tz, StripError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| StripError::Config(format!("unknown timezone '{}': {e}", self.timezone)))
    }
}

/// Widest `cold_temp..=hot_temp` range the temperature row can be keyed by.
const MAX_TEMPERATURE_SPAN: i64 = 200;

/// Geometry, thresholds and colours of the rendered strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Columns, one per hour.
    pub grid_width: u32,
    pub grid_height: u32,
    pub cell_size: u32,
    pub cell_spacing: u32,

    /// Hours of history shown left of "now".
    pub lead_hours: u32,
    /// Hour of day at which the accumulation total restarts.
    pub reset_hour: u32,
    pub night_start: u32,
    pub night_end: u32,

    /// Snow level (metres) below which forecast precipitation counts as snow.
    pub snow_line_m: f64,
    pub inches_per_row: f64,
    pub cold_temp: i32,
    pub hot_temp: i32,
    /// Observed precipitation above this temperature (°F) is drawn as rain.
    pub rain_temp: f64,

    pub palette: Palette,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            grid_width: 64,
            grid_height: 16,
            cell_size: 16,
            cell_spacing: 1,
            lead_hours: 8,
            reset_hour: 16,
            night_start: 16,
            night_end: 9,
            snow_line_m: 1363.0,
            inches_per_row: 1.0,
            cold_temp: 20,
            hot_temp: 45,
            rain_temp: 34.0,
            palette: Palette::default(),
        }
    }
}

impl RenderConfig {
    pub fn snow_line_ft(&self) -> f64 {
        metres_to_feet(self.snow_line_m)
    }

    pub fn validate(&self) -> Result<(), StripError> {
        let fail = |msg: String| Err(StripError::Config(msg));

        if self.grid_width == 0 || self.grid_height < 2 {
            return fail(format!(
                "grid must be at least 1x2 cells, got {}x{}",
                self.grid_width, self.grid_height
            ));
        }
        if self.cell_size == 0 {
            return fail("cell_size must be positive".to_string());
        }
        if self.lead_hours >= self.grid_width {
            return fail(format!(
                "lead_hours ({}) must be smaller than grid_width ({})",
                self.lead_hours, self.grid_width
            ));
        }
        if self.reset_hour > 23 || self.night_start > 23 || self.night_end > 23 {
            return fail("reset_hour, night_start and night_end must be within 0..=23".to_string());
        }
        if self.inches_per_row <= 0.0 {
            return fail("inches_per_row must be positive".to_string());
        }
        if self.cold_temp > self.hot_temp {
            return fail(format!(
                "cold_temp ({}) must not exceed hot_temp ({})",
                self.cold_temp, self.hot_temp
            ));
        }
        let span = i64::from(self.hot_temp) - i64::from(self.cold_temp);
        if span > MAX_TEMPERATURE_SPAN {
            return fail(format!(
                "cold_temp..hot_temp spans {span} degrees, at most {MAX_TEMPERATURE_SPAN} allowed"
            ));
        }
        if let Some(table) = &self.palette.temperature_table {
            let expected = (span + 1) as usize;
            if table.len() != expected {
                return fail(format!(
                    "temperature_table has {} entries, expected {expected} for {}..={}",
                    table.len(),
                    self.cold_temp,
                    self.hot_temp
                ));
            }
        }

        Ok(())
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// [location]
/// timezone = "America/Los_Angeles"
///
/// [render]
/// snow_line_m = 1363.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub location: LocationConfig,
    pub render: RenderConfig,
}

impl Config {
    /// Load config from the platform config dir, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    /// Load config from an explicit path; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform config dir.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "snowstrip", "snowstrip")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), StripError> {
        self.location.tz()?;
        self.render.validate()
    }
}
