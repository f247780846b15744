//! Small row-major value grids sampled over the area of interest.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{AoiError, AoiResult};

/// Dimensions of a grid, rows first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
}

impl GridShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Shape a resampling of `bbox` at `scale_m` meters per pixel should yield.
    ///
    /// Uses a spherical approximation, good enough to spot a fallback shape
    /// that has drifted from the remote query.
    pub fn implied_by(bbox: &BoundingBox, scale_m: f64) -> Self {
        let (ew, ns) = bbox.extent_meters();
        Self {
            rows: (ns / scale_m).round().max(1.0) as usize,
            cols: (ew / scale_m).round().max(1.0) as usize,
        }
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for GridShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// A rectangular grid of values; row 0 is the northern edge.
///
/// Serializes as a plain nested array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueGrid(Vec<Vec<f64>>);

impl ValueGrid {
    /// A grid of `shape` with every cell set to `value`.
    pub fn constant(shape: GridShape, value: f64) -> Self {
        Self(vec![vec![value; shape.cols]; shape.rows])
    }

    /// Build a grid from rows, checking it is non-empty, rectangular and finite.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> AoiResult<Self> {
        let expected = rows.first().map(Vec::len).unwrap_or(0);
        if expected == 0 {
            return Err(AoiError::EmptyGrid);
        }

        for (r, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(AoiError::RaggedGrid {
                    row: r,
                    expected,
                    found: row.len(),
                });
            }
            if let Some((c, v)) = row.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return Err(AoiError::NonFiniteValue {
                    row: r,
                    col: c,
                    value: *v,
                });
            }
        }

        Ok(Self(rows))
    }

    pub fn shape(&self) -> GridShape {
        GridShape {
            rows: self.0.len(),
            cols: self.0.first().map(Vec::len).unwrap_or(0),
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.0.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Mean of all cells, or `None` for an empty grid.
    pub fn mean(&self) -> Option<f64> {
        let n = self.shape().len();
        if n == 0 {
            return None;
        }
        let sum: f64 = self.0.iter().flatten().sum();
        Some(sum / n as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_grid() {
        let grid = ValueGrid::constant(GridShape::new(48, 64), 0.5);
        assert_eq!(grid.shape(), GridShape::new(48, 64));
        assert_eq!(grid.get(47, 63), Some(0.5));
        assert_eq!(grid.get(48, 0), None);
        assert_eq!(grid.mean(), Some(0.5));
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err = ValueGrid::from_rows(vec![vec![0.1, 0.2], vec![0.3]]).unwrap_err();
        assert!(matches!(
            err,
            AoiError::RaggedGrid {
                row: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_from_rows_rejects_empty() {
        assert!(matches!(
            ValueGrid::from_rows(vec![]),
            Err(AoiError::EmptyGrid)
        ));
        assert!(matches!(
            ValueGrid::from_rows(vec![vec![]]),
            Err(AoiError::EmptyGrid)
        ));
    }

    #[test]
    fn test_serializes_as_nested_array() {
        let grid = ValueGrid::from_rows(vec![vec![0.25, -0.5]]).unwrap();
        assert_eq!(serde_json::to_string(&grid).unwrap(), "[[0.25,-0.5]]");
    }

    #[test]
    fn test_implied_shape_for_default_aoi() {
        let shape = GridShape::implied_by(&BoundingBox::default(), 3500.0);
        assert_eq!(shape, GridShape::new(48, 47));
    }
}
