use std::path::PathBuf;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};

use crate::gallery::domain::identity_record::IdentityRecord;
use crate::gallery::domain::identity_source::{IdentitySource, SourceError};

const ACTIVE_STAFF_QUERY: &str = r#"
    SELECT staff_id, full_name, face_encoding, face_image_path
    FROM staff
    WHERE is_active = 1
"#;

/// Reads active identities from the `staff` table of a SQLite database.
///
/// A read-only connection is opened per load and closed before returning,
/// so the database can be edited by other processes between reloads.
pub struct SqliteIdentitySource {
    path: PathBuf,
}

impl SqliteIdentitySource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn connect(&self) -> Result<Connection, SourceError> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| SourceError::Connection {
            target: self.describe(),
            source: Box::new(e),
        })
    }
}

impl IdentitySource for SqliteIdentitySource {
    fn fetch_active(&self) -> Result<Vec<IdentityRecord>, SourceError> {
        let conn = self.connect()?;
        let query_err = |e: rusqlite::Error| SourceError::Query(Box::new(e));

        let mut stmt = conn.prepare(ACTIVE_STAFF_QUERY).map_err(query_err)?;
        let mut rows = stmt.query([]).map_err(query_err)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(query_err)? {
            match record_from_row(row) {
                Some(record) => records.push(record),
                None => log::warn!("Skipping staff row without a usable staff_id"),
            }
        }
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}

/// Columns are read leniently so one malformed row cannot fail the load.
/// Only a row without an id is unusable; a missing name falls back to the id.
fn record_from_row(row: &Row<'_>) -> Option<IdentityRecord> {
    let id = match row.get_ref(0).ok()? {
        ValueRef::Integer(n) => n.to_string(),
        _ => text_column(row, 0)?,
    };
    if id.trim().is_empty() {
        return None;
    }
    let display_name = text_column(row, 1).unwrap_or_else(|| id.clone());
    Some(IdentityRecord::new(
        id,
        display_name,
        text_column(row, 2),
        text_column(row, 3),
    ))
}

/// Text value of a column; NULL, numeric, blob and non-UTF-8 values read as absent.
fn text_column(row: &Row<'_>, index: usize) -> Option<String> {
    match row.get_ref(index).ok()? {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().map(str::to_owned),
        _ => None,
    }
}
