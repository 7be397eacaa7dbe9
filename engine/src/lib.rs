// FICHIER : engine/src/lib.rs

//! Strata : migrations de schéma versionnées pour une base documentaire JSON embarquée.

pub mod json_db;
pub mod migrations;
pub mod utils;

pub use json_db::collections::CollectionsManager;
pub use json_db::storage::{JsonDbConfig, StorageEngine};
pub use migrations::{
    BatchReport, Direction, MigrationGenerator, MigrationRegistry, MigrationRunner, RunOptions,
};
pub use utils::{AppConfig, AppError, Result};
