pub mod json_identity_source;
pub mod sqlite_identity_source;
