//! Colours used by the strip and the temperature colour scale.

use serde::{Deserialize, Serialize};

pub type Rgb = [u8; 3];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub background: Rgb,
    pub past_day: Rgb,
    pub past_night: Rgb,
    pub future_day: Rgb,
    pub future_night: Rgb,
    /// Midnight/noon ticks and the "now" marker.
    pub tick: Rgb,
    pub flake: Rgb,
    pub rain: Rgb,
    /// Temperature row below `cold_temp`.
    pub cold: Rgb,
    /// Temperature row above `hot_temp`.
    pub hot: Rgb,
    /// One colour per whole degree from `cold_temp` to `hot_temp`; generated
    /// when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_table: Option<Vec<Rgb>>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: [0, 0, 0],
            past_day: [192, 192, 192],
            past_night: [255, 255, 255],
            future_day: [96, 128, 192],
            future_night: [128, 160, 255],
            tick: [64, 64, 64],
            flake: [255, 255, 255],
            rain: [0, 160, 255],
            cold: [128, 0, 255],
            hot: [255, 0, 64],
            temperature_table: None,
        }
    }
}

/// Maps a temperature to the colour of the top row.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureScale {
    cold_temp: i32,
    hot_temp: i32,
    cold: Rgb,
    hot: Rgb,
    table: Vec<Rgb>,
}

impl TemperatureScale {
    /// Build the scale, sweeping blue→red across the range when the palette
    /// has no explicit table. Expects `cold_temp <= hot_temp`.
    pub fn new(palette: &Palette, cold_temp: i32, hot_temp: i32) -> Self {
        let table = palette
            .temperature_table
            .clone()
            .unwrap_or_else(|| hue_sweep(cold_temp, hot_temp));

        Self { cold_temp, hot_temp, cold: palette.cold, hot: palette.hot, table }
    }

    pub fn color_for(&self, temp_f: f64) -> Rgb {
        let t = temp_f.round() as i32;
        if t < self.cold_temp {
            return self.cold;
        }
        if t > self.hot_temp {
            return self.hot;
        }
        let idx = (i64::from(t) - i64::from(self.cold_temp)) as usize;
        self.table.get(idx).copied().unwrap_or(self.hot)
    }
}

fn hue_sweep(cold_temp: i32, hot_temp: i32) -> Vec<Rgb> {
    let steps = (i64::from(hot_temp) - i64::from(cold_temp)).max(0) as usize;
    (0..=steps)
        .map(|i| {
            let frac = if steps == 0 { 0.0 } else { i as f32 / steps as f32 };
            let (r, g, b) = hsv_to_rgb(240.0 * (1.0 - frac), 1.0, 1.0);
            [r, g, b]
        })
        .collect()
}

/// Hue in degrees, saturation and value in 0..=1.
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let h = h % 360.0;
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}
