use std::collections::HashMap;
use std::time::Instant;

use crate::shared::embedding::Embedding;

/// Metadata kept for each identity key.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentityMeta {
    pub display_name: String,
}

/// Immutable snapshot of the known faces.
///
/// `embeddings[i]` belongs to `identity_keys[i]`. A gallery is never
/// patched in place: reloads build a new one and swap it in whole.
#[derive(Clone, Debug, Default)]
pub struct Gallery {
    embeddings: Vec<Embedding>,
    identity_keys: Vec<String>,
    metadata: HashMap<String, IdentityMeta>,
    loaded_at: Option<Instant>,
}

impl Gallery {
    /// The never-loaded gallery.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    pub fn identity_keys(&self) -> &[String] {
        &self.identity_keys
    }

    pub fn meta(&self, identity_key: &str) -> Option<&IdentityMeta> {
        self.metadata.get(identity_key)
    }

    /// Number of matchable entries.
    pub fn len(&self) -> usize {
        self.identity_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identity_keys.is_empty()
    }

    /// `None` until the first successful load.
    pub fn loaded_at(&self) -> Option<Instant> {
        self.loaded_at
    }

    pub(crate) fn with_loaded_at(mut self, at: Instant) -> Self {
        self.loaded_at = Some(at);
        self
    }
}

/// Accumulates aligned entries, then freezes them into a [`Gallery`].
#[derive(Default)]
pub struct GalleryBuilder {
    gallery: Gallery,
}

impl GalleryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, identity_key: &str, display_name: &str, embedding: Embedding) {
        self.gallery.embeddings.push(embedding);
        self.gallery.identity_keys.push(identity_key.to_string());
        self.gallery.metadata.insert(
            identity_key.to_string(),
            IdentityMeta {
                display_name: display_name.to_string(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.gallery.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gallery.is_empty()
    }

    pub fn build(self) -> Gallery {
        self.gallery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::EMBEDDING_DIM;

    fn emb(v: f64) -> Embedding {
        Embedding::new(vec![v; EMBEDDING_DIM]).unwrap()
    }

    #[test]
    fn test_empty_gallery_is_unloaded() {
        let g = Gallery::empty();
        assert!(g.is_empty());
        assert!(g.loaded_at().is_none());
    }

    #[test]
    fn test_builder_keeps_collections_aligned() {
        let mut b = GalleryBuilder::new();
        b.push("A", "Ada", emb(0.1));
        b.push("B", "Bob", emb(0.2));
        let g = b.build();

        assert_eq!(g.len(), 2);
        assert_eq!(g.embeddings().len(), g.identity_keys().len());
        assert_eq!(g.identity_keys(), &["A".to_string(), "B".to_string()]);
        assert_eq!(g.embeddings()[1], emb(0.2));
        assert_eq!(g.meta("B").unwrap().display_name, "Bob");
    }

    #[test]
    fn test_duplicate_keys_keep_both_embeddings() {
        let mut b = GalleryBuilder::new();
        b.push("A", "Ada", emb(0.1));
        b.push("A", "Ada L.", emb(0.3));
        let g = b.build();

        assert_eq!(g.len(), 2);
        assert_eq!(g.meta("A").unwrap().display_name, "Ada L.");
    }

    #[test]
    fn test_with_loaded_at_sets_timestamp() {
        let now = Instant::now();
        let g = Gallery::empty().with_loaded_at(now);
        assert_eq!(g.loaded_at(), Some(now));
    }
}
