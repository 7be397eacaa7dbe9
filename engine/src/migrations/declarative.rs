// FICHIER : engine/src/migrations/declarative.rs

//! Unités déclaratives : fichiers `<id>_<description>.json`.
//!
//! ```json
//! {
//!   "title": "Add Approval Fields",
//!   "notes": "revert supprime aussi les valeurs saisies après coup",
//!   "up":   [ { "op": "addField", "collection": "esg_metrics", "field": "approval.status", "default": "pending" } ],
//!   "down": [ { "op": "removeField", "collection": "esg_metrics", "field": "approval" } ]
//! }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::id::MigrationId;
use super::steps::MigrationStep;
use super::unit::{parse_unit_name, MigrationUnit, UnitResult, UnitSummary};
use crate::json_db::collections::CollectionsManager;
use crate::utils::{fs, json, AppError, Result};

/// Contenu d'un fichier d'unité.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub up: Vec<MigrationStep>,
    #[serde(default)]
    pub down: Vec<MigrationStep>,
}

#[derive(Debug, Clone)]
pub struct DeclarativeMigration {
    id: MigrationId,
    description: String,
    document: UnitDocument,
    source: Option<PathBuf>,
}

impl DeclarativeMigration {
    pub fn new(id: MigrationId, description: &str, document: UnitDocument) -> Result<Self> {
        for (direction, steps) in [("up", &document.up), ("down", &document.down)] {
            for (i, step) in steps.iter().enumerate() {
                step.validate().map_err(|e| {
                    AppError::Config(format!(
                        "Unité {}_{} : étape {}[{}] invalide : {}",
                        id, description, direction, i, e
                    ))
                })?;
            }
        }
        Ok(Self {
            id,
            description: description.to_string(),
            document,
            source: None,
        })
    }

    /// Charge un fichier d'unité. Nom ou contenu invalide : erreur de configuration.
    pub async fn load(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AppError::Config(format!("Nom de fichier illisible : {:?}", path)))?;
        let (id, description) = parse_unit_name(stem)?;

        let content = fs::read_to_string(path).await?;
        let document: UnitDocument = json::parse(&content).map_err(|e| {
            AppError::Config(format!("Unité {} illisible : {}", path.display(), e))
        })?;

        let mut unit = Self::new(id, &description, document)?;
        unit.source = Some(path.to_path_buf());
        Ok(unit)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.document.title.as_deref()
    }

    pub fn document(&self) -> &UnitDocument {
        &self.document
    }

    async fn run_steps(&self, steps: &[MigrationStep], db: &CollectionsManager<'_>) -> UnitResult {
        let mut total = 0u64;
        for step in steps {
            match step.execute(db).await {
                Ok(modified) => {
                    tracing::debug!(
                        "{} : {} sur '{}' -> {} document(s)",
                        self.name(),
                        step.describe(),
                        step.collection(),
                        modified
                    );
                    total += modified;
                }
                Err(failure) => return Err(failure.after(total)),
            }
        }
        Ok(UnitSummary::new(total))
    }
}

#[async_trait]
impl MigrationUnit for DeclarativeMigration {
    fn id(&self) -> MigrationId {
        self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn revert_notes(&self) -> Option<&str> {
        self.document.notes.as_deref().filter(|n| !n.trim().is_empty())
    }

    async fn apply(&self, db: &CollectionsManager<'_>) -> UnitResult {
        self.run_steps(&self.document.up, db).await
    }

    async fn revert(&self, db: &CollectionsManager<'_>) -> UnitResult {
        self.run_steps(&self.document.down, db).await
    }
}
