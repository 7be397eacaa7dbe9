// FICHIER : engine/src/utils/mod.rs

// =========================================================================
//  STRATA UTILS - Foundation Layer
// =========================================================================

pub mod config;
pub mod env;
pub mod error;
pub mod fs;
pub mod json;
pub mod logger;
pub mod macros;

// --- FAÇADES SÉMANTIQUES ---

/// **Core Foundation** : Types de base et Erreurs.
pub mod core {
    pub use super::error::{AppError, Result};
    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;
}

/// **Physical Layer (I/O)** : Accès disque (Atomicité, création exclusive).
pub mod io {
    pub use super::fs::{
        ensure_dir, exists, list_files_with_extension, read_json, read_to_string, remove_file,
        write_atomic, write_json_atomic, write_new, Path, PathBuf,
    };
}

/// **Data Abstraction** : Manipulation JSON.
pub mod data {
    pub use super::json::{
        from_value, get_path, get_path_mut, json, parse, remove_path, set_path,
        stringify_pretty, to_value, Map, Value,
    };
    pub use serde::{Deserialize, Serialize};
    pub use std::collections::{BTreeMap, HashMap, HashSet};
}

/// **Application Context** : Config/Log/Env.
pub mod context {
    pub use super::config::{AppConfig, LoggingConfig};
    pub use super::env::{get_optional, get_parsed_optional};
    pub use super::logger::init_logging;
}

/// **Le Prélude** : À utiliser via `use crate::utils::prelude::*;`
pub mod prelude {
    pub use super::context::AppConfig;
    pub use super::core::{AppError, DateTime, Result, Utc, Uuid};
    pub use super::data::{json, Deserialize, Serialize, Value};
    pub use async_trait::async_trait;
    pub use tracing::{debug, error, info, instrument, warn};
}

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use logger::init_logging;
