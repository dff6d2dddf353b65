use std::path::Path;

use crate::shared::frame::Frame;

/// Domain interface for turning encoded image data into RGB pixels.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Frame, Box<dyn std::error::Error>>;

    fn open(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let bytes = std::fs::read(path)?;
        self.decode(&bytes)
    }
}
