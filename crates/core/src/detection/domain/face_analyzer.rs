use std::sync::{Arc, Mutex};

use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_embedder::FaceEmbedder;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::embedding::Embedding;
use crate::shared::frame::Frame;

/// Handle shared by the gallery loader and request handling.
///
/// Inference sessions are stateful, so access is serialized.
pub type SharedAnalyzer = Arc<Mutex<FaceAnalyzer>>;

/// Pairs a detector with an embedder to expose the three primitives the
/// recognizer needs: locate faces, embed given boxes, and embed every
/// face in a photo.
pub struct FaceAnalyzer {
    detector: Box<dyn FaceDetector>,
    embedder: Box<dyn FaceEmbedder>,
}

impl FaceAnalyzer {
    pub fn new(detector: Box<dyn FaceDetector>, embedder: Box<dyn FaceEmbedder>) -> Self {
        Self { detector, embedder }
    }

    pub fn into_shared(self) -> SharedAnalyzer {
        Arc::new(Mutex::new(self))
    }

    pub fn locate(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        self.detector.detect(frame)
    }

    pub fn embed_at(
        &mut self,
        frame: &Frame,
        boxes: &[BoundingBox],
    ) -> Result<Vec<Embedding>, Box<dyn std::error::Error>> {
        if boxes.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self.embedder.embed(frame, boxes)?;
        if embeddings.len() != boxes.len() {
            return Err(format!(
                "embedder returned {} embeddings for {} boxes",
                embeddings.len(),
                boxes.len()
            )
            .into());
        }
        Ok(embeddings)
    }

    /// Embeddings for every face found in `frame`, in detection order.
    pub fn encode(&mut self, frame: &Frame) -> Result<Vec<Embedding>, Box<dyn std::error::Error>> {
        let boxes = self.locate(frame)?;
        self.embed_at(frame, &boxes)
    }

    /// Detection boxes paired with their embeddings, in detection order.
    pub fn detect_faces(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
        let boxes = self.locate(frame)?;
        let embeddings = self.embed_at(frame, &boxes)?;
        Ok(embeddings
            .into_iter()
            .zip(boxes)
            .map(|(embedding, bounding_box)| DetectedFace::new(embedding, bounding_box))
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::shared::constants::EMBEDDING_DIM;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the same boxes for every frame.
    pub struct StubDetector {
        pub boxes: Vec<BoundingBox>,
        pub calls: Arc<AtomicUsize>,
    }

    impl StubDetector {
        pub fn new(boxes: Vec<BoundingBox>) -> Self {
            Self {
                boxes,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.boxes.clone())
        }
    }

    /// Encodes each box as a constant vector whose value is the box's left
    /// edge divided by 1000, so tests can predict embeddings from boxes.
    pub struct StubEmbedder {
        pub calls: Arc<AtomicUsize>,
    }

    impl StubEmbedder {
        pub fn new() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl FaceEmbedder for StubEmbedder {
        fn embed(
            &mut self,
            _frame: &Frame,
            boxes: &[BoundingBox],
        ) -> Result<Vec<Embedding>, Box<dyn std::error::Error>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(boxes.iter().map(embedding_for_box).collect())
        }
    }

    pub fn embedding_for_box(b: &BoundingBox) -> Embedding {
        Embedding::new(vec![b.left as f64 / 1000.0; EMBEDDING_DIM]).unwrap()
    }

    pub struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Err("inference failed".into())
        }
    }

    pub fn blank_frame() -> Frame {
        Frame::new(vec![0u8; 64 * 48 * 3], 64, 48)
    }
}
