pub mod gallery;
pub mod identity_record;
pub mod identity_source;
