use crate::detection::domain::detected_face::DetectedFace;
use crate::gallery::domain::gallery::Gallery;
use crate::matching::match_result::MatchResult;
use crate::shared::constants::DEFAULT_MATCH_THRESHOLD;
use crate::shared::embedding::Embedding;

/// Nearest-neighbor identity matching against a gallery snapshot.
///
/// Pure: reads the gallery, never mutates it.
#[derive(Clone, Copy, Debug)]
pub struct MatchEngine {
    threshold: f64,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

impl MatchEngine {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// One result per face, in input order. An empty gallery yields no
    /// results at all rather than unmatched placeholders.
    pub fn match_faces(&self, gallery: &Gallery, faces: &[DetectedFace]) -> Vec<MatchResult> {
        if gallery.is_empty() {
            return Vec::new();
        }
        faces
            .iter()
            .filter_map(|face| self.match_one(gallery, face))
            .collect()
    }

    fn match_one(&self, gallery: &Gallery, face: &DetectedFace) -> Option<MatchResult> {
        let (index, distance) = nearest(gallery.embeddings(), &face.embedding)?;
        let identity_key = gallery.identity_keys()[index].clone();
        let display_name = gallery
            .meta(&identity_key)
            .map(|m| m.display_name.clone())
            .unwrap_or_else(|| identity_key.clone());

        Some(MatchResult {
            identity_key,
            display_name,
            bounding_box: face.bounding_box,
            distance,
            score: (1.0 - distance).max(0.0),
            matched: distance < self.threshold,
        })
    }
}

/// Index and distance of the closest candidate. Ties keep the earliest
/// index because only a strictly smaller distance replaces the best.
fn nearest(candidates: &[Embedding], query: &Embedding) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let d = query.euclidean_distance(candidate);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best
}
