// FICHIER : engine/src/migrations/unit.rs

//! Contrat d'une unité de migration.
//!
//! Une unité ne connaît que la base qu'elle transforme : elle ne touche jamais
//! au registre, c'est le Runner qui l'alimente.
//!
//! Règles imposées aux auteurs :
//! - `apply` doit être rejouable. Toute sélection passe par un filtre
//!   « pas encore migré » explicite (ex. `Condition::missing("approval")`),
//!   de sorte qu'une relance après échec partiel converge.
//! - `revert` est un inverse au mieux. S'il ne peut pas restaurer l'état exact
//!   (valeur par défaut indiscernable d'une valeur saisie, tableau aplati...),
//!   l'unité le documente via `revert_notes`.
//! - Effets permis : index, ajout/suppression de champs en masse, remodelage
//!   de tableaux imbriqués. Interdits : supprimer des documents, renommer une
//!   collection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::id::MigrationId;
use crate::json_db::collections::{BulkWriteError, CollectionsManager};
use crate::utils::{AppError, Result};

/// Bilan d'une exécution réussie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSummary {
    pub documents_modified: u64,
}

impl UnitSummary {
    pub fn new(documents_modified: u64) -> Self {
        Self { documents_modified }
    }
}

/// Échec d'une exécution : la cause et les documents déjà modifiés.
#[derive(Debug, thiserror::Error)]
#[error("{cause} ({documents_modified} document(s) modifié(s))")]
pub struct UnitFailure {
    pub documents_modified: u64,
    #[source]
    pub cause: AppError,
}

impl UnitFailure {
    pub fn new(documents_modified: u64, cause: impl Into<AppError>) -> Self {
        Self {
            documents_modified,
            cause: cause.into(),
        }
    }

    /// Ajoute le travail des étapes précédentes au compteur.
    pub fn after(mut self, already_modified: u64) -> Self {
        self.documents_modified += already_modified;
        self
    }
}

impl From<AppError> for UnitFailure {
    fn from(cause: AppError) -> Self {
        Self::new(0, cause)
    }
}

impl From<BulkWriteError> for UnitFailure {
    fn from(err: BulkWriteError) -> Self {
        Self::new(err.documents_modified, err.cause)
    }
}

pub type UnitResult = std::result::Result<UnitSummary, UnitFailure>;

#[async_trait]
pub trait MigrationUnit: Send + Sync {
    fn id(&self) -> MigrationId;

    /// Slug `[a-z0-9_]+`.
    fn description(&self) -> &str;

    /// Limites connues de `revert`.
    fn revert_notes(&self) -> Option<&str> {
        None
    }

    /// Nom canonique `<id>_<description>`.
    fn name(&self) -> String {
        format!("{}_{}", self.id(), self.description())
    }

    async fn apply(&self, db: &CollectionsManager<'_>) -> UnitResult;

    async fn revert(&self, db: &CollectionsManager<'_>) -> UnitResult;
}

/// Vérifie qu'une description est un slug non vide `[a-z0-9_]+`.
pub fn validate_description(description: &str) -> Result<()> {
    if description.is_empty() {
        return Err(AppError::Validation(
            "La description d'une migration ne peut pas être vide".to_string(),
        ));
    }
    if let Some(bad) = description
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_'))
    {
        return Err(AppError::Validation(format!(
            "Caractère '{}' interdit dans la description '{}' (attendu [a-z0-9_])",
            bad, description
        )));
    }
    Ok(())
}

/// Découpe un nom `<id>_<description>` (sans extension).
/// Toute forme invalide est une erreur de configuration de découverte.
pub fn parse_unit_name(stem: &str) -> Result<(MigrationId, String)> {
    let Some((token, description)) = stem.split_once('_') else {
        return Err(AppError::Config(format!(
            "Nom d'unité '{}' invalide : attendu <id>_<description>",
            stem
        )));
    };
    let id = MigrationId::parse(token)?;
    validate_description(description)
        .map_err(|e| AppError::Config(format!("Unité '{}' : {}", stem, e)))?;
    Ok((id, description.to_string()))
}
