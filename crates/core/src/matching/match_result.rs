use serde::Serialize;

use crate::shared::bounding_box::BoundingBox;

/// Nearest-identity decision for one detected face.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub identity_key: String,
    pub display_name: String,
    #[serde(rename = "bbox")]
    pub bounding_box: BoundingBox,
    /// Euclidean distance to the nearest gallery embedding.
    pub distance: f64,
    /// `max(0, 1 - distance)`; a monotone proxy, not a probability.
    pub score: f64,
    pub matched: bool,
}
