use crate::shared::bounding_box::BoundingBox;
use crate::shared::embedding::Embedding;
use crate::shared::frame::Frame;

/// Domain interface for turning face boxes into identity embeddings.
///
/// The returned embeddings are aligned by index with `boxes`.
pub trait FaceEmbedder: Send {
    fn embed(
        &mut self,
        frame: &Frame,
        boxes: &[BoundingBox],
    ) -> Result<Vec<Embedding>, Box<dyn std::error::Error>>;
}
