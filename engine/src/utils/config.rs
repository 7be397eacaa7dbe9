// FICHIER : engine/src/utils/config.rs

//! Configuration explicite du moteur.
//!
//! Pas de singleton global : la configuration est chargée une fois au démarrage
//! (fichier JSON puis surcharges d'environnement) et passée au stockage, au
//! Runner et au Générateur à leur construction.

use crate::json_db::storage::JsonDbConfig;
use crate::utils::{env, json, AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fichier lu dans le répertoire courant quand aucun chemin n'est fourni.
pub const CONFIG_FILE_NAME: &str = "strata.json";

pub const DEFAULT_SPACE: &str = "strata";
pub const DEFAULT_DB: &str = "main";
pub const DEFAULT_LEDGER_COLLECTION: &str = "_migrations";
pub const DEFAULT_BATCH_SIZE: usize = 500;

// --- Variables d'environnement reconnues ---
pub const ENV_DATA_ROOT: &str = "STRATA_DATA_ROOT";
pub const ENV_SPACE: &str = "STRATA_SPACE";
pub const ENV_DB: &str = "STRATA_DB";
pub const ENV_MIGRATIONS_DIR: &str = "STRATA_MIGRATIONS_DIR";
pub const ENV_LEDGER_COLLECTION: &str = "STRATA_LEDGER_COLLECTION";
pub const ENV_BATCH_SIZE: &str = "STRATA_BATCH_SIZE";
pub const ENV_LOG_LEVEL: &str = "STRATA_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "STRATA_LOG_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Racine physique de la base documentaire.
    pub data_root: PathBuf,
    pub space: String,
    pub db: String,
    /// Répertoire des unités déclaratives `<id>_<description>.json`.
    pub migrations_dir: PathBuf,
    pub ledger_collection: String,
    /// Taille des lots de `update_many`.
    pub batch_size: usize,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filtre console par défaut quand RUST_LOG est absent.
    pub level: String,
    /// Dossier du fichier JSON tournant. `None` : console seule.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            dir: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            space: DEFAULT_SPACE.to_string(),
            db: DEFAULT_DB.to_string(),
            migrations_dir: PathBuf::from("migrations"),
            ledger_collection: DEFAULT_LEDGER_COLLECTION.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            logging: LoggingConfig::default(),
        }
    }
}

fn default_data_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("strata_domain")
}

impl AppConfig {
    /// Chargement standard : fichier explicite, sinon `./strata.json` s'il existe,
    /// sinon valeurs par défaut ; puis surcharges d'environnement et validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let local = PathBuf::from(CONFIG_FILE_NAME);
                if local.is_file() {
                    Self::from_file(&local)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "Lecture du fichier de configuration {} impossible : {}",
                path.display(),
                e
            ))
        })?;
        json::parse(&content).map_err(|e| {
            AppError::Config(format!("Configuration invalide ({}) : {}", path.display(), e))
        })
    }

    /// Les variables `STRATA_*` présentes écrasent les valeurs du fichier.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env::get_optional(ENV_DATA_ROOT) {
            self.data_root = PathBuf::from(v);
        }
        if let Some(v) = env::get_optional(ENV_SPACE) {
            self.space = v;
        }
        if let Some(v) = env::get_optional(ENV_DB) {
            self.db = v;
        }
        if let Some(v) = env::get_optional(ENV_MIGRATIONS_DIR) {
            self.migrations_dir = PathBuf::from(v);
        }
        if let Some(v) = env::get_optional(ENV_LEDGER_COLLECTION) {
            self.ledger_collection = v;
        }
        if let Some(v) = env::get_parsed_optional::<usize>(ENV_BATCH_SIZE)? {
            self.batch_size = v;
        }
        if let Some(v) = env::get_optional(ENV_LOG_LEVEL) {
            self.logging.level = v;
        }
        if let Some(v) = env::get_optional(ENV_LOG_DIR) {
            self.logging.dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.space.trim().is_empty() || self.db.trim().is_empty() {
            return Err(AppError::Config(
                "'space' et 'db' ne peuvent pas être vides".to_string(),
            ));
        }
        if self.ledger_collection.trim().is_empty() {
            return Err(AppError::Config(
                "'ledger_collection' ne peut pas être vide".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(AppError::Config(
                "'batch_size' doit être strictement positif".to_string(),
            ));
        }
        Ok(())
    }

    /// Configuration de la couche de stockage dérivée de celle-ci.
    pub fn db_config(&self) -> JsonDbConfig {
        JsonDbConfig::new(self.data_root.clone()).with_batch_size(self.batch_size)
    }

    /// Configuration isolée sous `root` (tests, bacs à sable).
    pub fn sandbox(root: &Path) -> Self {
        Self {
            data_root: root.join("data"),
            migrations_dir: root.join("migrations"),
            ..Self::default()
        }
    }
}
