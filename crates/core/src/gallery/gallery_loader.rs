use std::sync::Arc;

use crate::gallery::domain::gallery::{Gallery, GalleryBuilder};
use crate::gallery::domain::identity_source::{IdentitySource, SourceError};
use crate::gallery::embedding_resolver::{EmbeddingResolver, ResolveOutcome};

/// Tally of one load, for logging and diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub fetched: usize,
    pub admitted: usize,
    pub skipped: usize,
}

/// Reads every active identity and folds resolver outcomes into a gallery.
pub struct GalleryLoader {
    source: Arc<dyn IdentitySource>,
    resolver: EmbeddingResolver,
}

impl GalleryLoader {
    pub fn new(source: Arc<dyn IdentitySource>, resolver: EmbeddingResolver) -> Self {
        Self { source, resolver }
    }

    /// Builds a fresh gallery. Only a source failure aborts the load;
    /// records that yield no embedding are logged and left out.
    pub fn load(&self) -> Result<(Gallery, LoadReport), SourceError> {
        let records = self.source.fetch_active()?;
        let mut report = LoadReport {
            fetched: records.len(),
            ..LoadReport::default()
        };

        let mut builder = GalleryBuilder::new();
        for record in &records {
            match self.resolver.resolve(record) {
                ResolveOutcome::Resolved { embedding, origin } => {
                    log::debug!("Admitted {} from {origin:?}", record.id);
                    builder.push(&record.id, &record.display_name, embedding);
                }
                ResolveOutcome::Skipped(reason) => {
                    log::warn!("Skipping identity {}: {reason}", record.id);
                    report.skipped += 1;
                }
            }
        }
        report.admitted = builder.len();

        log::info!(
            "Loaded {} of {} identities from {}",
            report.admitted,
            report.fetched,
            self.source.describe()
        );
        Ok((builder.build(), report))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::StubSource;
    use super::*;
    use crate::gallery::domain::identity_record::IdentityRecord;
    use crate::gallery::embedding_resolver::test_support::{analyzer_with_faces, photo_box, StubDecoder};
    use crate::shared::constants::EMBEDDING_DIM;
    use std::path::Path;
    use tempfile::TempDir;

    fn stored(value: f64) -> Option<String> {
        Some(serde_json::to_string(&vec![value; EMBEDDING_DIM]).unwrap())
    }

    fn loader(source: Arc<StubSource>, base: &Path) -> GalleryLoader {
        let (analyzer, _) = analyzer_with_faces(vec![photo_box()]);
        GalleryLoader::new(
            source,
            EmbeddingResolver::new(base.to_path_buf(), Arc::new(StubDecoder), analyzer),
        )
    }

    #[test]
    fn test_excluded_records_reduce_gallery_size() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("c.jpg"), b"face").unwrap();
        let source = StubSource::new(vec![
            IdentityRecord::new("A", "Ada", stored(0.1), None),
            IdentityRecord::new("B", "Bob", None, None),
            IdentityRecord::new("C", "Cy", Some("[1, 2, 3]".into()), Some("c.jpg".into())),
            IdentityRecord::new("D", "Di", None, Some("missing.jpg".into())),
            IdentityRecord::new("E", "Eve", Some("oops".into()), None),
        ]);

        let (gallery, report) = loader(source, tmp.path()).load().unwrap();

        assert_eq!(report, LoadReport { fetched: 5, admitted: 2, skipped: 3 });
        assert_eq!(gallery.len(), 5 - 3);
        assert_eq!(gallery.identity_keys(), &["A".to_string(), "C".to_string()]);
        assert_eq!(gallery.meta("C").unwrap().display_name, "Cy");
        assert!(gallery.meta("B").is_none());
    }

    #[test]
    fn test_source_order_is_preserved() {
        let source = StubSource::new(vec![
            IdentityRecord::new("Z", "Zed", stored(0.3), None),
            IdentityRecord::new("A", "Ada", stored(0.1), None),
        ]);

        let (gallery, _) = loader(source, Path::new("/base")).load().unwrap();

        assert_eq!(gallery.identity_keys(), &["Z".to_string(), "A".to_string()]);
        assert_eq!(gallery.embeddings()[1].as_slice()[0], 0.1);
    }

    #[test]
    fn test_empty_source_gives_empty_gallery() {
        let (gallery, report) = loader(StubSource::new(vec![]), Path::new("/base"))
            .load()
            .unwrap();
        assert!(gallery.is_empty());
        assert_eq!(report.fetched, 0);
    }

    #[test]
    fn test_connection_failure_propagates() {
        let source = StubSource::new(vec![IdentityRecord::new("A", "Ada", stored(0.1), None)]);
        source.set_offline(true);

        let err = loader(source, Path::new("/base")).load().unwrap_err();

        assert!(matches!(err, SourceError::Connection { .. }));
    }

    #[test]
    fn test_loaded_gallery_has_no_timestamp_until_cached() {
        let source = StubSource::new(vec![IdentityRecord::new("A", "Ada", stored(0.1), None)]);
        let (gallery, _) = loader(source, Path::new("/base")).load().unwrap();
        assert!(gallery.loaded_at().is_none());
    }
}
