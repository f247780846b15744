//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::error::{AoiError, AoiResult};

/// Mean length of one degree of latitude, in meters.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// A geographic bounding box in degrees.
///
/// `x` is longitude and `y` is latitude, so the box reads
/// `[lon_min, lat_min, lon_max, lat_max]` like the imagery service's
/// rectangle constructor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(alias = "lon_min")]
    pub min_x: f64,
    #[serde(alias = "lat_min")]
    pub min_y: f64,
    #[serde(alias = "lon_max")]
    pub max_x: f64,
    #[serde(alias = "lat_max")]
    pub max_y: f64,
}

impl Default for BoundingBox {
    /// Jonglei, Bor South.
    fn default() -> Self {
        Self::new(31.0, 6.0, 32.5, 7.5)
    }
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse a "minx,miny,maxx,maxy" string, as accepted on the command line.
    pub fn from_bbox_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |p: &str| {
            p.parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber(p.to_string()))
        };

        Ok(Self {
            min_x: parse(parts[0])?,
            min_y: parse(parts[1])?,
            max_x: parse(parts[2])?,
            max_y: parse(parts[3])?,
        })
    }

    /// Width of the bounding box in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Corner coordinates as `[min_x, min_y, max_x, max_y]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// Latitude of the box center.
    pub fn center_y(&self) -> f64 {
        (self.min_y + self.max_y) / 2.0
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Reject boxes that cannot be normalized against (zero or negative extent,
    /// or non-finite corners).
    pub fn validate(&self) -> AoiResult<()> {
        let finite = self.to_array().iter().all(|v| v.is_finite());
        if !finite || self.width() <= 0.0 || self.height() <= 0.0 {
            return Err(AoiError::DegenerateBox {
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }

    /// Map a geographic point onto the display plane.
    ///
    /// The display origin is the top-left corner, so `y` is flipped: the
    /// northern edge maps to 0 and the southern edge to 1. Points outside
    /// the box land outside [0, 1]; nothing is clamped.
    pub fn normalize(&self, lon: f64, lat: f64) -> (f64, f64) {
        let x = (lon - self.min_x) / self.width();
        let y = 1.0 - (lat - self.min_y) / self.height();
        (x, y)
    }

    /// Approximate extent in meters as `(east-west, north-south)`, measured at
    /// the center latitude.
    pub fn extent_meters(&self) -> (f64, f64) {
        let lat_scale = self.center_y().to_radians().cos();
        (
            self.width() * METERS_PER_DEGREE * lat_scale,
            self.height() * METERS_PER_DEGREE,
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bbox format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in bbox: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox_string() {
        let bbox = BoundingBox::from_bbox_string("31.0, 6.0, 32.5, 7.5").unwrap();
        assert_eq!(bbox, BoundingBox::default());
    }

    #[test]
    fn test_normalize_corners() {
        let bbox = BoundingBox::default();
        assert_eq!(bbox.normalize(31.0, 7.5), (0.0, 0.0));
        assert_eq!(bbox.normalize(32.5, 6.0), (1.0, 1.0));
    }

    #[test]
    fn test_validate_rejects_zero_width() {
        let bbox = BoundingBox::new(31.0, 6.0, 31.0, 7.5);
        assert!(matches!(
            bbox.validate(),
            Err(AoiError::DegenerateBox { .. })
        ));
    }
}
