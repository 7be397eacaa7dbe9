// FICHIER : engine/src/json_db/mod.rs

//! Base documentaire JSON embarquée.
//!
//! Disposition : `<data_root>/<space>/<db>/collections/<collection>/<id>.json`.
//! Chaque document est écrit atomiquement ; il n'existe pas de transaction
//! multi-documents.

pub mod collections;
pub mod indexes;
pub mod query;
pub mod storage;
