//! Dashboard display-plane projection of ground points.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// Decimal places kept for display-plane coordinates.
pub const DISPLAY_PRECISION: u32 = 4;

/// A ground location given in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampSite {
    pub lat: f64,
    pub lon: f64,
    /// Free-form description; not sent to the dashboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CampSite {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            label: None,
        }
    }

    pub fn labeled(lat: f64, lon: f64, label: &str) -> Self {
        Self {
            lat,
            lon,
            label: Some(label.to_string()),
        }
    }
}

/// A marker on the dashboard's [0,1]x[0,1] plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayPoint {
    pub x: f64,
    pub y: f64,
    pub intensity: f64,
}

impl DisplayPoint {
    /// Project a site onto the display plane of `bbox`, rounding both axes.
    pub fn project(bbox: &BoundingBox, site: &CampSite, intensity: f64) -> Self {
        let (x, y) = bbox.normalize(site.lon, site.lat);
        Self {
            x: round_to(x, DISPLAY_PRECISION),
            y: round_to(y, DISPLAY_PRECISION),
            intensity,
        }
    }
}

/// Round to `places` decimal places, ties to even.
///
/// Ties are judged on the exact binary value, so `0.03125` is a tie and
/// rounds to `0.0312`, while a value stored just above a decimal midpoint
/// rounds up.
pub fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let factor = 10f64.powi(places as i32);
    let scaled = value * factor;
    let nearest = scaled.round_ties_even();
    if ((scaled - scaled.floor()) - 0.5).abs() > 1e-6 {
        return nearest / factor;
    }

    round_exact_decimal(value, places).unwrap_or(nearest / factor)
}

/// Decimal rounding on the full expansion of `value`, used near midpoints
/// where `value * factor` may itself have been rounded.
fn round_exact_decimal(value: f64, places: u32) -> Option<f64> {
    // Every finite f64 has at most 1074 fractional digits.
    let exact = format!("{:.1074}", value.abs());
    let (int_part, frac) = exact.split_once('.')?;
    let places = places as usize;
    let (kept, tail) = frac.split_at(places.min(frac.len()));

    let mut units: f64 = format!("{}{}", int_part, kept).parse().ok()?;
    let mut rest = tail.bytes();
    let round_up = match rest.next() {
        Some(b'5') => {
            if rest.any(|d| d != b'0') {
                true
            } else {
                units % 2.0 == 1.0
            }
        }
        Some(d) => d > b'5',
        None => false,
    };
    if round_up {
        units += 1.0;
    }

    let magnitude = units / 10f64.powi(places as i32);
    Some(if value.is_sign_negative() {
        -magnitude
    } else {
        magnitude
    })
}
