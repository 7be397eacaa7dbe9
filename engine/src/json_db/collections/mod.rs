// FICHIER : engine/src/json_db/collections/mod.rs

pub mod collection;
pub mod manager;

pub use manager::{BulkWriteError, CollectionsManager};
