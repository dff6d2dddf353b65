pub mod domain;
pub mod embedding_resolver;
pub mod gallery_cache;
pub mod gallery_loader;
pub mod infrastructure;
