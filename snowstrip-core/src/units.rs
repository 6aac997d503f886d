//! Unit conversions between the metric values served by the forecast source
//! and the English units the strip is drawn in.

pub const MM_PER_INCH: f64 = 25.4;
pub const FEET_PER_METRE: f64 = 3.280_84;

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

pub fn metres_to_feet(m: f64) -> f64 {
    m * FEET_PER_METRE
}

pub fn feet_to_metres(ft: f64) -> f64 {
    ft / FEET_PER_METRE
}
