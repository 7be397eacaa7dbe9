// FICHIER : engine/src/json_db/storage/mod.rs

pub mod cache;
pub mod file_storage;

use crate::utils::config::DEFAULT_BATCH_SIZE;
use crate::utils::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

// --- CONFIGURATION ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonDbConfig {
    pub data_root: PathBuf,
    /// Nombre de documents traités par lot dans les mises à jour en masse.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl JsonDbConfig {
    pub fn new(data_root: PathBuf) -> Self {
        Self {
            data_root,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn db_root(&self, space: &str, db: &str) -> PathBuf {
        self.data_root.join(space).join(db)
    }

    pub fn collections_root(&self, space: &str, db: &str) -> PathBuf {
        self.db_root(space, db).join("collections")
    }

    pub fn db_collection_path(&self, space: &str, db: &str, collection: &str) -> PathBuf {
        self.collections_root(space, db).join(collection)
    }

    /// Index système de la base : {db_root}/_system.json
    pub fn system_index_path(&self, space: &str, db: &str) -> PathBuf {
        self.db_root(space, db).join("_system.json")
    }
}

// --- MOTEUR DE STOCKAGE ---

#[derive(Debug, Clone)]
pub struct StorageEngine {
    pub config: JsonDbConfig,
    pub cache: cache::Cache<String, Value>,
}

impl StorageEngine {
    pub fn new(config: JsonDbConfig) -> Self {
        Self {
            config,
            cache: cache::Cache::new(1000, Some(Duration::from_secs(300))),
        }
    }

    fn cache_key(space: &str, db: &str, collection: &str, id: &str) -> String {
        format!("{}/{}/{}/{}", space, db, collection, id)
    }

    /// Écrit un document (Disque atomique + Cache)
    pub async fn write_document(
        &self,
        space: &str,
        db: &str,
        collection: &str,
        id: &str,
        doc: &Value,
    ) -> Result<()> {
        file_storage::write_document(&self.config, space, db, collection, id, doc).await?;
        self.cache
            .put(Self::cache_key(space, db, collection, id), doc.clone());
        Ok(())
    }

    /// Lit un document (Cache Hit d'abord, sinon Disque)
    pub async fn read_document(
        &self,
        space: &str,
        db: &str,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>> {
        let cache_key = Self::cache_key(space, db, collection, id);
        if let Some(doc) = self.cache.get(&cache_key) {
            return Ok(Some(doc));
        }

        let doc_opt = file_storage::read_document(&self.config, space, db, collection, id).await?;
        if let Some(doc) = &doc_opt {
            self.cache.put(cache_key, doc.clone());
        }
        Ok(doc_opt)
    }

    /// Supprime un document (Disque + Cache). Renvoie `false` s'il était absent.
    pub async fn delete_document(
        &self,
        space: &str,
        db: &str,
        collection: &str,
        id: &str,
    ) -> Result<bool> {
        self.cache.remove(&Self::cache_key(space, db, collection, id));
        file_storage::delete_document(&self.config, space, db, collection, id).await
    }
}
