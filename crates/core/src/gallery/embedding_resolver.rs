use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};

use thiserror::Error;

use crate::detection::domain::face_analyzer::SharedAnalyzer;
use crate::gallery::domain::identity_record::IdentityRecord;
use crate::imaging::domain::image_decoder::ImageDecoder;
use crate::shared::embedding::Embedding;

/// Where a resolved embedding came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingOrigin {
    StoredEncoding,
    Photo,
}

/// Why a record contributes nothing to the gallery.
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error("no stored encoding or photo")]
    NoSource,
    #[error("stored encoding rejected ({0}) and no photo to fall back on")]
    InvalidEncoding(String),
    #[error("photo {} does not exist", .0.display())]
    MissingImage(PathBuf),
    #[error("photo {} could not be decoded: {}", .0.display(), .1)]
    UnreadableImage(PathBuf, String),
    #[error("no face found in photo {}", .0.display())]
    NoFace(PathBuf),
    #[error("face extraction failed for {}: {}", .0.display(), .1)]
    ExtractionFailed(PathBuf, String),
}

/// Per-record result; skips are data-quality conditions, not errors.
#[derive(Debug)]
pub enum ResolveOutcome {
    Resolved {
        embedding: Embedding,
        origin: EmbeddingOrigin,
    },
    Skipped(SkipReason),
}

impl ResolveOutcome {
    #[cfg(test)]
    pub(crate) fn embedding(&self) -> Option<&Embedding> {
        match self {
            ResolveOutcome::Resolved { embedding, .. } => Some(embedding),
            ResolveOutcome::Skipped(_) => None,
        }
    }
}

/// Produces at most one embedding per identity record.
///
/// A valid stored encoding always wins; otherwise the first face found in
/// the referenced photo is used.
pub struct EmbeddingResolver {
    image_base: PathBuf,
    decoder: Arc<dyn ImageDecoder>,
    analyzer: SharedAnalyzer,
}

impl EmbeddingResolver {
    pub fn new(image_base: PathBuf, decoder: Arc<dyn ImageDecoder>, analyzer: SharedAnalyzer) -> Self {
        Self {
            image_base,
            decoder,
            analyzer,
        }
    }

    pub fn resolve(&self, record: &IdentityRecord) -> ResolveOutcome {
        let mut rejected_encoding = None;

        if let Some(encoded) = &record.encoded_embedding {
            match Embedding::from_json(encoded) {
                Ok(embedding) => {
                    return ResolveOutcome::Resolved {
                        embedding,
                        origin: EmbeddingOrigin::StoredEncoding,
                    }
                }
                Err(e) => {
                    log::debug!("Stored encoding for {} rejected: {e}", record.id);
                    rejected_encoding = Some(e.to_string());
                }
            }
        }

        match &record.image_reference {
            Some(reference) => self.from_photo(&self.resolve_path(reference)),
            None => ResolveOutcome::Skipped(match rejected_encoding {
                Some(reason) => SkipReason::InvalidEncoding(reason),
                None => SkipReason::NoSource,
            }),
        }
    }

    /// Absolute references are used as-is; relative ones hang off the base.
    pub fn resolve_path(&self, reference: &str) -> PathBuf {
        let path = Path::new(reference);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.image_base.join(path)
        }
    }

    fn from_photo(&self, path: &Path) -> ResolveOutcome {
        if !path.exists() {
            return ResolveOutcome::Skipped(SkipReason::MissingImage(path.to_path_buf()));
        }

        let frame = match self.decoder.open(path) {
            Ok(frame) => frame,
            Err(e) => {
                return ResolveOutcome::Skipped(SkipReason::UnreadableImage(
                    path.to_path_buf(),
                    e.to_string(),
                ))
            }
        };

        let encoded = {
            let mut analyzer = self.analyzer.lock().unwrap_or_else(PoisonError::into_inner);
            analyzer.encode(&frame).map_err(|e| e.to_string())
        };

        match encoded {
            Ok(embeddings) => match embeddings.into_iter().next() {
                Some(embedding) => ResolveOutcome::Resolved {
                    embedding,
                    origin: EmbeddingOrigin::Photo,
                },
                None => ResolveOutcome::Skipped(SkipReason::NoFace(path.to_path_buf())),
            },
            Err(e) => ResolveOutcome::Skipped(SkipReason::ExtractionFailed(path.to_path_buf(), e)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::detection::domain::face_analyzer::test_support::{
        embedding_for_box, FailingDetector, StubEmbedder,
    };
    use crate::detection::domain::face_analyzer::FaceAnalyzer;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::constants::EMBEDDING_DIM;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn stored(value: f64, len: usize) -> String {
        serde_json::to_string(&vec![value; len]).unwrap()
    }

    fn resolver(base: &Path, analyzer: SharedAnalyzer) -> EmbeddingResolver {
        EmbeddingResolver::new(base.to_path_buf(), Arc::new(StubDecoder), analyzer)
    }

    fn write_photo(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_valid_encoding_wins_without_touching_photo() {
        let tmp = TempDir::new().unwrap();
        write_photo(tmp.path(), "uploads/faces/a.jpg", b"face");
        let (analyzer, detect_calls) = analyzer_with_faces(vec![photo_box()]);
        let record = IdentityRecord::new(
            "S1",
            "Ada",
            Some(stored(0.07, EMBEDDING_DIM)),
            Some("uploads/faces/a.jpg".into()),
        );

        let outcome = resolver(tmp.path(), analyzer).resolve(&record);

        match outcome {
            ResolveOutcome::Resolved { embedding, origin } => {
                assert_eq!(origin, EmbeddingOrigin::StoredEncoding);
                assert_eq!(embedding.as_slice(), &vec![0.07; EMBEDDING_DIM][..]);
            }
            other => panic!("expected resolved, got {other:?}"),
        }
        assert_eq!(detect_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_short_encoding_falls_back_to_photo() {
        let tmp = TempDir::new().unwrap();
        write_photo(tmp.path(), "uploads/faces/a.jpg", b"face");
        let (analyzer, _) = analyzer_with_faces(vec![photo_box()]);
        let record = IdentityRecord::new(
            "S1",
            "Ada",
            Some(stored(0.07, 64)),
            Some("uploads/faces/a.jpg".into()),
        );

        let outcome = resolver(tmp.path(), analyzer).resolve(&record);

        match outcome {
            ResolveOutcome::Resolved { embedding, origin } => {
                assert_eq!(origin, EmbeddingOrigin::Photo);
                assert_eq!(embedding, embedding_for_box(&photo_box()));
            }
            other => panic!("expected resolved, got {other:?}"),
        }
    }

    #[test]
    fn test_photo_takes_first_face() {
        let tmp = TempDir::new().unwrap();
        let photo = write_photo(tmp.path(), "group.jpg", b"face");
        let first = BoundingBox::new(100, 0, 110, 10);
        let (analyzer, _) = analyzer_with_faces(vec![first, BoundingBox::new(900, 0, 910, 10)]);
        let record = IdentityRecord::new("S1", "Ada", None, Some(photo.display().to_string()));

        let outcome = resolver(Path::new("/unused/base"), analyzer).resolve(&record);

        assert_eq!(outcome.embedding(), Some(&embedding_for_box(&first)));
    }

    #[test]
    fn test_absolute_reference_ignores_base() {
        let r = resolver(Path::new("/srv/backend"), analyzer_with_faces(vec![]).0);
        assert_eq!(r.resolve_path("/data/a.jpg"), PathBuf::from("/data/a.jpg"));
        assert_eq!(
            r.resolve_path("uploads/faces/a.jpg"),
            PathBuf::from("/srv/backend/uploads/faces/a.jpg")
        );
    }

    #[test]
    fn test_missing_photo_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let (analyzer, detect_calls) = analyzer_with_faces(vec![photo_box()]);
        let record = IdentityRecord::new("S1", "Ada", None, Some("uploads/gone.jpg".into()));

        let outcome = resolver(tmp.path(), analyzer).resolve(&record);

        assert!(matches!(
            outcome,
            ResolveOutcome::Skipped(SkipReason::MissingImage(p)) if p.ends_with("uploads/gone.jpg")
        ));
        assert_eq!(detect_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_photo_without_face_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write_photo(tmp.path(), "a.jpg", b"face");
        let (analyzer, _) = analyzer_with_faces(vec![]);
        let record = IdentityRecord::new("S1", "Ada", None, Some("a.jpg".into()));

        let outcome = resolver(tmp.path(), analyzer).resolve(&record);

        assert!(matches!(outcome, ResolveOutcome::Skipped(SkipReason::NoFace(_))));
    }

    #[test]
    fn test_undecodable_photo_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write_photo(tmp.path(), "a.jpg", b"corrupt");
        let (analyzer, _) = analyzer_with_faces(vec![photo_box()]);
        let record = IdentityRecord::new("S1", "Ada", None, Some("a.jpg".into()));

        let outcome = resolver(tmp.path(), analyzer).resolve(&record);

        assert!(matches!(
            outcome,
            ResolveOutcome::Skipped(SkipReason::UnreadableImage(..))
        ));
    }

    #[test]
    fn test_failing_extraction_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write_photo(tmp.path(), "a.jpg", b"face");
        let analyzer =
            FaceAnalyzer::new(Box::new(FailingDetector), Box::new(StubEmbedder::new())).into_shared();
        let record = IdentityRecord::new("S1", "Ada", None, Some("a.jpg".into()));

        let outcome = resolver(tmp.path(), analyzer).resolve(&record);

        assert!(matches!(
            outcome,
            ResolveOutcome::Skipped(SkipReason::ExtractionFailed(..))
        ));
    }

    #[test]
    fn test_no_sources_is_skipped() {
        let (analyzer, _) = analyzer_with_faces(vec![photo_box()]);
        let record = IdentityRecord::new("S1", "Ada", None, None);

        let outcome = resolver(Path::new("/base"), analyzer).resolve(&record);

        assert!(matches!(outcome, ResolveOutcome::Skipped(SkipReason::NoSource)));
    }

    #[test]
    fn test_bad_encoding_without_photo_reports_encoding() {
        let (analyzer, _) = analyzer_with_faces(vec![photo_box()]);
        let record = IdentityRecord::new("S1", "Ada", Some("[[1, 2]]".into()), None);

        let outcome = resolver(Path::new("/base"), analyzer).resolve(&record);

        assert!(matches!(
            outcome,
            ResolveOutcome::Skipped(SkipReason::InvalidEncoding(_))
        ));
    }
}
