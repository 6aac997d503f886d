//! Strip rendering: the hour-by-hour accumulation walk and the pixel surface it
//! paints on.

pub mod bitmap;
pub mod palette;
mod walk;

pub use bitmap::{Bitmap, GridGeometry};
pub use palette::{Palette, Rgb, TemperatureScale};
pub use walk::{Branch, HourTrace, Strip, StripRenderer, Window};
