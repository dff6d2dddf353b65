use thiserror::Error;

use crate::gallery::domain::identity_record::IdentityRecord;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("cannot connect to identity source {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("identity query failed: {0}")]
    Query(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain interface for the store of known identities.
///
/// `fetch_active` is a single bounded read returning every active identity;
/// the loader does not page through results.
pub trait IdentitySource: Send + Sync {
    fn fetch_active(&self) -> Result<Vec<IdentityRecord>, SourceError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}
