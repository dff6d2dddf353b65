use std::sync::{Arc, PoisonError};
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::detection::domain::face_analyzer::SharedAnalyzer;
use crate::gallery::gallery_cache::GalleryCache;
use crate::imaging::domain::image_decoder::ImageDecoder;
use crate::matching::match_engine::MatchEngine;
use crate::matching::match_result::MatchResult;

/// Request-level failures. All are caused by the submitted image; gallery
/// problems never fail a request.
#[derive(Error, Debug)]
pub enum RecognizeError {
    #[error("empty image")]
    EmptyImage,
    #[error("image could not be decoded: {0}")]
    InvalidImage(String),
    #[error("face detection failed: {0}")]
    Detection(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RecognizeResponse {
    pub matches: Vec<MatchResult>,
}

/// Single-image recognition: decode → refresh gallery → detect → embed → match.
pub struct RecognizeFacesUseCase {
    cache: Arc<GalleryCache>,
    analyzer: SharedAnalyzer,
    decoder: Arc<dyn ImageDecoder>,
    engine: MatchEngine,
}

impl RecognizeFacesUseCase {
    pub fn new(
        cache: Arc<GalleryCache>,
        analyzer: SharedAnalyzer,
        decoder: Arc<dyn ImageDecoder>,
        engine: MatchEngine,
    ) -> Self {
        Self {
            cache,
            analyzer,
            decoder,
            engine,
        }
    }

    pub fn execute(&self, image: &[u8]) -> Result<RecognizeResponse, RecognizeError> {
        if image.is_empty() {
            return Err(RecognizeError::EmptyImage);
        }
        let started = Instant::now();

        let frame = self
            .decoder
            .decode(image)
            .map_err(|e| RecognizeError::InvalidImage(e.to_string()))?;

        // A stale gallery is still better than failing the request.
        if let Err(e) = self.cache.ensure_fresh(false) {
            log::warn!("Serving previous gallery: {e}");
        }

        let faces = {
            let mut analyzer = self.analyzer.lock().unwrap_or_else(PoisonError::into_inner);
            analyzer
                .detect_faces(&frame)
                .map_err(|e| RecognizeError::Detection(e.to_string()))?
        };

        let gallery = self.cache.snapshot();
        let matches = self.engine.match_faces(&gallery, &faces);

        log::debug!(
            "Recognized {} of {} faces against {} known (threshold {}) in {:.1}ms",
            matches.iter().filter(|m| m.matched).count(),
            faces.len(),
            gallery.len(),
            self.engine.threshold(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(RecognizeResponse { matches })
    }
}
