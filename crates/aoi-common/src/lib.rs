//! Common types shared by the cattle-eye crates.
//!
//! The area of interest, its projection onto the dashboard display plane
//! and the small numeric grids exchanged with the imagery service.

pub mod bbox;
pub mod display;
pub mod error;
pub mod grid;

pub use bbox::BoundingBox;
pub use display::{CampSite, DisplayPoint};
pub use error::{AoiError, AoiResult};
pub use grid::{GridShape, ValueGrid};
