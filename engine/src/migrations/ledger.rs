// FICHIER : engine/src/migrations/ledger.rs

//! Registre des migrations appliquées, stocké dans la base qu'il décrit.
//!
//! Une entrée par migration appliquée, dont l'identifiant de document est
//! l'identifiant de migration. Un index hash unique sur `migrationId` garantit
//! qu'une même migration n'est jamais enregistrée deux fois.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::MigrationId;
use super::unit::UnitSummary;
use crate::json_db::collections::CollectionsManager;
use crate::json_db::indexes::IndexType;
use crate::utils::config::DEFAULT_LEDGER_COLLECTION;
use crate::utils::{json, AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    pub migration_id: MigrationId,
    #[serde(default)]
    pub description: String,
    pub applied_at: DateTime<Utc>,
    pub documents_modified: u64,
}

pub struct MigrationLedger<'a> {
    db: &'a CollectionsManager<'a>,
    collection: String,
}

impl<'a> MigrationLedger<'a> {
    pub fn new(db: &'a CollectionsManager<'a>) -> Self {
        Self::with_collection(db, DEFAULT_LEDGER_COLLECTION)
    }

    pub fn with_collection(db: &'a CollectionsManager<'a>, collection: &str) -> Self {
        Self {
            db,
            collection: collection.to_string(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Crée la collection et son index unique. Idempotent.
    pub async fn init(&self) -> Result<()> {
        self.db.init_db().await?;
        if self.db.create_collection(&self.collection).await? {
            tracing::info!(
                "Registre de migrations '{}' initialisé dans {}/{}",
                self.collection,
                self.db.space,
                self.db.db
            );
        }
        self.db
            .create_index(&self.collection, "migrationId", IndexType::Hash, true)
            .await?;
        Ok(())
    }

    /// Entrées triées par identifiant croissant.
    pub async fn entries(&self) -> Result<Vec<LedgerEntry>> {
        let mut entries = Vec::new();
        for doc in self.db.list_all(&self.collection).await? {
            let entry: LedgerEntry = json::from_value(doc).map_err(|e| {
                AppError::Database(format!(
                    "Entrée corrompue dans le registre '{}' : {}",
                    self.collection, e
                ))
            })?;
            entries.push(entry);
        }
        entries.sort_by_key(|e| e.migration_id);
        Ok(entries)
    }

    pub async fn list_applied(&self) -> Result<Vec<MigrationId>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .map(|e| e.migration_id)
            .collect())
    }

    pub async fn get(&self, id: MigrationId) -> Result<Option<LedgerEntry>> {
        match self.db.get_document(&self.collection, &id.to_string()).await? {
            Some(doc) => Ok(Some(json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn is_applied(&self, id: MigrationId) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }

    /// `Conflict` si la migration est déjà enregistrée.
    pub async fn record_applied(
        &self,
        id: MigrationId,
        description: &str,
        summary: UnitSummary,
    ) -> Result<LedgerEntry> {
        if self.is_applied(id).await? {
            return Err(AppError::Conflict(format!(
                "La migration {} est déjà enregistrée comme appliquée",
                id
            )));
        }
        let entry = LedgerEntry {
            id: id.to_string(),
            migration_id: id,
            description: description.to_string(),
            applied_at: Utc::now(),
            documents_modified: summary.documents_modified,
        };
        self.db
            .insert_document(&self.collection, json::to_value(&entry)?)
            .await?;
        tracing::debug!("Registre : {} enregistrée", id);
        Ok(entry)
    }

    /// Retire l'entrée et la renvoie. `NotFound` si elle est absente.
    pub async fn record_reverted(&self, id: MigrationId) -> Result<LedgerEntry> {
        let Some(entry) = self.get(id).await? else {
            return Err(AppError::NotFound(format!(
                "La migration {} n'est pas enregistrée comme appliquée",
                id
            )));
        };
        self.db
            .delete_document(&self.collection, &entry.id)
            .await?;
        tracing::debug!("Registre : {} retirée", id);
        Ok(entry)
    }
}
