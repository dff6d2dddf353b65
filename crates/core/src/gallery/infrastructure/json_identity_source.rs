use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::gallery::domain::identity_record::IdentityRecord;
use crate::gallery::domain::identity_source::{IdentitySource, SourceError};

/// Reads identities from a JSON array file.
///
/// ```json
/// [{"id": "S1", "display_name": "Ada", "image_reference": "faces/ada.jpg"}]
/// ```
///
/// Entries with `"active": false` are filtered out; `active` defaults to true.
pub struct JsonIdentitySource {
    path: PathBuf,
}

#[derive(Deserialize)]
struct Entry {
    #[serde(flatten)]
    record: IdentityRecord,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

impl JsonIdentitySource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl IdentitySource for JsonIdentitySource {
    fn fetch_active(&self) -> Result<Vec<IdentityRecord>, SourceError> {
        let text = fs::read_to_string(&self.path).map_err(|e| SourceError::Connection {
            target: self.describe(),
            source: Box::new(e),
        })?;
        let entries: Vec<Entry> =
            serde_json::from_str(&text).map_err(|e| SourceError::Query(Box::new(e)))?;
        Ok(entries
            .into_iter()
            .filter(|e| e.active)
            .map(|e| e.record.normalized())
            .collect())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}
