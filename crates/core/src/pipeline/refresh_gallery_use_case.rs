use std::sync::Arc;

use serde::Serialize;

use crate::gallery::gallery_cache::{GalleryCache, GalleryError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ReloadResponse {
    pub reloaded: bool,
    pub known: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub known: usize,
}

/// Operator-facing gallery control: forced reload and liveness.
pub struct RefreshGalleryUseCase {
    cache: Arc<GalleryCache>,
}

impl RefreshGalleryUseCase {
    pub fn new(cache: Arc<GalleryCache>) -> Self {
        Self { cache }
    }

    /// Reloads unconditionally. Unlike recognition, a failed reload is
    /// reported to the caller; the previous gallery stays in service.
    pub fn reload(&self) -> Result<ReloadResponse, GalleryError> {
        let known = self.cache.ensure_fresh(true)?;
        let skipped = self
            .cache
            .status()
            .last_load
            .map_or(0, |report| report.skipped);
        log::info!("Gallery reloaded on request: {known} known, {skipped} skipped");
        Ok(ReloadResponse {
            reloaded: true,
            known,
        })
    }

    /// Never touches the source.
    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok",
            known: self.cache.status().known_count,
        }
    }
}
