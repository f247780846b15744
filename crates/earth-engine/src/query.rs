//! The surface-water index query run over the area of interest.

use aoi_common::BoundingBox;
use serde::{Deserialize, Serialize};

use crate::expression::{Expression, ExpressionBuilder, ValueNode};

/// Least-cloudy scene, normalized band difference, resampled and sampled as
/// a rectangle over the area of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterIndexQuery {
    /// Image collection asset id.
    pub collection: String,

    /// Band pair for the normalized difference, `(a - b) / (a + b)`.
    pub bands: [String; 2],

    /// Name given to the index band and read back from the sample.
    pub band_name: String,

    /// Image property scenes are ranked by, lowest first.
    pub sort_property: String,

    /// Upper bound on input pixels combined into one output pixel.
    pub max_pixels: u32,

    pub crs: String,

    /// Output pixel size in meters.
    pub scale: f64,

    /// Value substituted for masked pixels. Without it a masked pixel fails
    /// the whole sample.
    pub default_value: Option<f64>,
}

impl Default for WaterIndexQuery {
    fn default() -> Self {
        Self {
            collection: "COPERNICUS/S2_SR".to_string(),
            bands: ["B3".to_string(), "B8".to_string()],
            band_name: "water".to_string(),
            sort_property: "CLOUDY_PIXEL_PERCENTAGE".to_string(),
            max_pixels: 1024,
            crs: "EPSG:4326".to_string(),
            scale: 3500.0,
            default_value: None,
        }
    }
}

impl WaterIndexQuery {
    /// Build the expression graph sampling this index over `bbox`.
    ///
    /// The region is bound once and referenced by both the collection
    /// filter and the rectangle sample.
    pub fn to_expression(&self, bbox: &BoundingBox) -> Expression {
        let mut b = ExpressionBuilder::new();

        let region = b.bind(ValueNode::invoke(
            "GeometryConstructors.Rectangle",
            [
                ("coordinates", ValueNode::constant(bbox.to_array().to_vec())),
                ("geodesic", ValueNode::constant(false)),
            ],
        ));

        let collection = ValueNode::invoke(
            "ImageCollection.load",
            [("id", ValueNode::constant(self.collection.as_str()))],
        );

        let filtered = ValueNode::invoke(
            "Collection.filter",
            [
                ("collection", collection),
                (
                    "filter",
                    ValueNode::invoke(
                        "Filter.intersects",
                        [
                            ("leftField", ValueNode::constant(".all")),
                            ("rightValue", region.clone()),
                        ],
                    ),
                ),
            ],
        );

        let sorted = ValueNode::invoke(
            "Collection.limit",
            [
                ("collection", filtered),
                ("key", ValueNode::constant(self.sort_property.as_str())),
                ("ascending", ValueNode::constant(true)),
            ],
        );

        let scene = b.bind(ValueNode::invoke(
            "Collection.first",
            [("collection", sorted)],
        ));

        let index = ValueNode::invoke(
            "Image.rename",
            [
                (
                    "input",
                    ValueNode::invoke(
                        "Image.normalizedDifference",
                        [
                            ("input", scene),
                            ("bandNames", ValueNode::constant(self.bands.to_vec())),
                        ],
                    ),
                ),
                ("names", ValueNode::constant(vec![self.band_name.as_str()])),
            ],
        );

        let reduced = ValueNode::invoke(
            "Image.reduceResolution",
            [
                ("image", index),
                ("reducer", ValueNode::invoke("Reducer.mean", Vec::<(&str, ValueNode)>::new())),
                ("maxPixels", ValueNode::constant(self.max_pixels)),
            ],
        );

        let grid = b.bind(ValueNode::invoke(
            "Image.reproject",
            [
                ("image", reduced),
                (
                    "crs",
                    ValueNode::invoke(
                        "Projection",
                        [("crs", ValueNode::constant(self.crs.as_str()))],
                    ),
                ),
                ("scale", ValueNode::constant(self.scale)),
            ],
        ));

        let mut sample_args = vec![("image", grid), ("region", region)];
        if let Some(v) = self.default_value {
            sample_args.push(("defaultValue", ValueNode::constant(v)));
        }
        let sample = ValueNode::invoke("Image.sampleRectangle", sample_args);

        b.finish(ValueNode::invoke(
            "Element.get",
            [
                ("object", sample),
                ("property", ValueNode::constant(self.band_name.as_str())),
            ],
        ))
    }
}
