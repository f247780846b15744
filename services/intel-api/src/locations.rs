//! Camp locations projected onto the dashboard display plane.

use aoi_common::{BoundingBox, CampSite, DisplayPoint};

/// Project every camp onto the display plane of `aoi`, in configured order.
///
/// Stands in for live fire-detection hotspots: the dashboard only needs
/// plane coordinates and an intensity per marker.
pub fn location_proxy(
    aoi: &BoundingBox,
    camps: &[CampSite],
    intensity: f64,
) -> Vec<DisplayPoint> {
    camps
        .iter()
        .map(|site| DisplayPoint::project(aoi, site, intensity))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntelConfig;

    #[test]
    fn test_default_camps() {
        let config = IntelConfig::default();
        let points = location_proxy(&config.aoi, &config.camps, config.intensity);

        let expected = [(0.3695, 0.8637), (0.414, 0.7919), (0.326, 0.9233)];
        assert_eq!(points.len(), expected.len());
        for (p, (x, y)) in points.iter().zip(expected) {
            assert!((p.x - x).abs() < 1e-9, "x: {} vs {}", p.x, x);
            assert!((p.y - y).abs() < 1e-9, "y: {} vs {}", p.y, y);
            assert_eq!(p.intensity, 350.5);
        }
    }

    #[test]
    fn test_no_camps() {
        assert!(location_proxy(&BoundingBox::default(), &[], 1.0).is_empty());
    }
}
