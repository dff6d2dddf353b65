use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::gallery::domain::gallery::Gallery;
use crate::gallery::domain::identity_source::SourceError;
use crate::gallery::gallery_loader::{GalleryLoader, LoadReport};
use crate::shared::constants::DEFAULT_STALENESS;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("gallery reload failed: {0}")]
    Reload(#[from] SourceError),
}

/// Time source for staleness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GalleryStatus {
    pub known_count: usize,
    /// Tally of the most recent successful load, if any.
    pub last_load: Option<LoadReport>,
}

/// Holds the current gallery and reloads it lazily when stale.
///
/// Readers clone an `Arc` under a read lock, so they see either the old or
/// the new gallery in full. Loading runs outside that lock; a separate
/// mutex keeps concurrent refreshes from loading twice.
pub struct GalleryCache {
    loader: GalleryLoader,
    current: RwLock<Arc<Gallery>>,
    reload_lock: Mutex<()>,
    last_report: Mutex<Option<LoadReport>>,
    staleness: Duration,
    clock: Arc<dyn Clock>,
}

impl GalleryCache {
    pub fn new(loader: GalleryLoader) -> Self {
        Self::with_policy(loader, DEFAULT_STALENESS, Arc::new(SystemClock))
    }

    pub fn with_policy(loader: GalleryLoader, staleness: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            loader,
            current: RwLock::new(Arc::new(Gallery::empty())),
            reload_lock: Mutex::new(()),
            last_report: Mutex::new(None),
            staleness,
            clock,
        }
    }

    /// Reloads when forced, never loaded, or older than the staleness
    /// window; otherwise a no-op. Returns the number of known identities.
    ///
    /// On failure the previous gallery stays in place and its timestamp is
    /// untouched, so the next call retries.
    pub fn ensure_fresh(&self, force: bool) -> Result<usize, GalleryError> {
        let current = self.snapshot();
        if !force && !self.is_stale(&current) {
            return Ok(current.len());
        }
        drop(current);

        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Another caller may have refreshed while we waited.
        let current = self.snapshot();
        if !force && !self.is_stale(&current) {
            return Ok(current.len());
        }

        let started = Instant::now();
        let (gallery, report) = self.loader.load()?;
        let gallery = Arc::new(gallery.with_loaded_at(self.clock.now()));
        let known = gallery.len();

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = gallery;
        *self.last_report.lock().unwrap_or_else(PoisonError::into_inner) = Some(report);
        log::debug!(
            "Gallery swapped in after {:.1}ms: {} admitted, {} skipped",
            started.elapsed().as_secs_f64() * 1000.0,
            report.admitted,
            report.skipped
        );
        Ok(known)
    }

    /// The current gallery; unaffected by later reloads.
    pub fn snapshot(&self) -> Arc<Gallery> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> GalleryStatus {
        GalleryStatus {
            known_count: self.snapshot().len(),
            last_load: *self.last_report.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    fn is_stale(&self, gallery: &Gallery) -> bool {
        match gallery.loaded_at() {
            None => true,
            Some(at) => self.clock.now().saturating_duration_since(at) > self.staleness,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Clock that only moves when told to.
    pub struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Instant::now()),
            })
        }

        pub fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }
}
