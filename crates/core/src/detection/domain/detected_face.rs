use crate::shared::bounding_box::BoundingBox;
use crate::shared::embedding::Embedding;

/// One face found in a query image, ready for matching.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedFace {
    pub embedding: Embedding,
    pub bounding_box: BoundingBox,
}

impl DetectedFace {
    pub fn new(embedding: Embedding, bounding_box: BoundingBox) -> Self {
        Self {
            embedding,
            bounding_box,
        }
    }
}
