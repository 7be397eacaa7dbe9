// FICHIER : engine/src/json_db/collections/manager.rs

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use super::collection;
use crate::json_db::indexes::{IndexDefinition, IndexManager, IndexType};
use crate::json_db::query::{ComparisonOperator, FilterOperator, QueryFilter};
use crate::json_db::storage::{file_storage, StorageEngine};
use crate::utils::{fs, AppError, Result};

/// Échec d'une mise à jour en masse, avec le nombre de documents déjà réécrits.
#[derive(Debug, thiserror::Error)]
#[error("écriture en masse interrompue après {documents_modified} document(s) : {cause}")]
pub struct BulkWriteError {
    pub documents_modified: u64,
    #[source]
    pub cause: AppError,
}

/// Un identifiant devient un nom de fichier : les noms réservés (`_meta`,
/// `_indexes`...) et les séparateurs de chemin sont refusés.
fn validate_document_id(id: &str) -> Result<()> {
    if id.is_empty() || id.starts_with('_') || id.contains(['/', '\\']) {
        return Err(AppError::Validation(format!(
            "Identifiant de document invalide : '{}'",
            id
        )));
    }
    Ok(())
}

/// Poignée sur une base `(space, db)`. C'est l'objet passé aux migrations.
#[derive(Debug)]
pub struct CollectionsManager<'a> {
    pub storage: &'a StorageEngine,
    pub space: String,
    pub db: String,
}

impl<'a> CollectionsManager<'a> {
    pub fn new(storage: &'a StorageEngine, space: &str, db: &str) -> Self {
        Self {
            storage,
            space: space.to_string(),
            db: db.to_string(),
        }
    }

    fn indexes(&self) -> IndexManager<'a> {
        IndexManager::new(self.storage, &self.space, &self.db)
    }

    /// Crée l'arborescence et l'index système. `Ok(true)` si la base était absente.
    pub async fn init_db(&self) -> Result<bool> {
        let created = file_storage::create_db(&self.storage.config, &self.space, &self.db).await?;
        self.ensure_system_index().await?;
        Ok(created)
    }

    // --- INDEX SYSTÈME (_system.json) ---

    async fn load_system_index(&self) -> Result<Value> {
        let sys_path = self.storage.config.system_index_path(&self.space, &self.db);
        if fs::exists(&sys_path).await {
            return fs::read_json(&sys_path).await;
        }
        Ok(json!({
            "space": self.space,
            "database": self.db,
            "version": 1,
            "createdAt": Utc::now().to_rfc3339(),
            "collections": {}
        }))
    }

    async fn ensure_system_index(&self) -> Result<()> {
        let sys_path = self.storage.config.system_index_path(&self.space, &self.db);
        if fs::exists(&sys_path).await {
            return Ok(());
        }
        let doc = self.load_system_index().await?;
        fs::write_json_atomic(&sys_path, &doc).await
    }

    async fn register_collection(&self, name: &str) -> Result<()> {
        let mut system_doc = self.load_system_index().await?;
        if let Some(cols) = system_doc
            .get_mut("collections")
            .and_then(|c| c.as_object_mut())
        {
            cols.entry(name.to_string())
                .or_insert_with(|| json!({ "createdAt": Utc::now().to_rfc3339() }));
        }
        system_doc["updatedAt"] = Value::String(Utc::now().to_rfc3339());
        let sys_path = self.storage.config.system_index_path(&self.space, &self.db);
        fs::write_json_atomic(&sys_path, &system_doc).await
    }

    // --- GESTION DES COLLECTIONS ---

    pub async fn list_collections(&self) -> Result<Vec<String>> {
        collection::list_collection_names_fs(&self.storage.config, &self.space, &self.db).await
    }

    /// Idempotent. `Ok(true)` si la collection vient d'être créée.
    pub async fn create_collection(&self, name: &str) -> Result<bool> {
        let cfg = &self.storage.config;
        if collection::read_meta(cfg, &self.space, &self.db, name)
            .await?
            .is_some()
        {
            return Ok(false);
        }
        if !file_storage::db_exists(cfg, &self.space, &self.db).await {
            self.init_db().await?;
        }

        collection::create_collection_if_missing(cfg, &self.space, &self.db, name).await?;
        let meta = json!({ "name": name, "createdAt": Utc::now().to_rfc3339() });
        collection::write_meta(cfg, &self.space, &self.db, name, &meta).await?;
        self.register_collection(name).await?;
        tracing::debug!("Collection '{}' créée dans {}/{}", name, self.space, self.db);
        Ok(true)
    }

    // --- LECTURE ---

    pub async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.storage
            .read_document(&self.space, &self.db, collection, id)
            .await
    }

    pub async fn list_ids(&self, collection: &str) -> Result<Vec<String>> {
        collection::list_document_ids(&self.storage.config, &self.space, &self.db, collection).await
    }

    /// Tous les documents, triés par identifiant.
    pub async fn list_all(&self, collection: &str) -> Result<Vec<Value>> {
        let ids = self.list_ids(collection).await?;
        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.get_document(collection, &id).await? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    /// Identifiants candidats : via un index si une égalité porte sur un champ indexé.
    async fn candidate_ids(&self, collection: &str, filter: &QueryFilter) -> Result<Vec<String>> {
        if filter.operator == FilterOperator::And {
            let indexes = self.indexes();
            for cond in &filter.conditions {
                if cond.operator != ComparisonOperator::Eq {
                    continue;
                }
                if let Some(mut ids) = indexes.search(collection, &cond.field, &cond.value).await? {
                    ids.sort();
                    return Ok(ids);
                }
            }
        }
        self.list_ids(collection).await
    }

    /// Documents satisfaisant le filtre, triés par identifiant.
    pub async fn find(&self, collection: &str, filter: &QueryFilter) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        for id in self.candidate_ids(collection, filter).await? {
            if let Some(doc) = self.get_document(collection, &id).await? {
                if filter.matches(&doc) {
                    out.push(doc);
                }
            }
        }
        Ok(out)
    }

    pub async fn count(&self, collection: &str, filter: &QueryFilter) -> Result<u64> {
        Ok(self.find(collection, filter).await?.len() as u64)
    }

    // --- ÉCRITURE ---

    /// Écriture d'un document avec contrôle d'unicité et maintenance des index.
    async fn write_indexed(
        &self,
        collection: &str,
        id: &str,
        old_doc: Option<&Value>,
        new_doc: &Value,
    ) -> Result<()> {
        let indexes = self.indexes();
        indexes.check_unique(collection, id, new_doc).await?;
        self.storage
            .write_document(&self.space, &self.db, collection, id, new_doc)
            .await?;
        indexes
            .update_indexes(collection, id, old_doc, Some(new_doc))
            .await
    }

    /// Insertion stricte : `Conflict` si l'identifiant existe déjà.
    /// Un identifiant UUID v4 est généré si le document n'en porte pas.
    pub async fn insert_document(&self, collection: &str, mut doc: Value) -> Result<Value> {
        let Some(obj) = doc.as_object_mut() else {
            return Err(AppError::Validation(
                "Un document doit être un objet JSON".to_string(),
            ));
        };
        let id = match obj.get("id").and_then(|v| v.as_str()) {
            Some(id) => {
                validate_document_id(id)?;
                id.to_string()
            }
            None => {
                let id = Uuid::new_v4().to_string();
                obj.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };

        if self.get_document(collection, &id).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Le document '{}' existe déjà dans '{}'",
                id, collection
            )));
        }
        self.create_collection(collection).await?;
        self.write_indexed(collection, &id, None, &doc).await?;
        Ok(doc)
    }

    /// Remplacement complet. `NotFound` si le document est absent.
    pub async fn update_document(&self, collection: &str, id: &str, mut doc: Value) -> Result<Value> {
        validate_document_id(id)?;
        let Some(old_doc) = self.get_document(collection, id).await? else {
            return Err(AppError::NotFound(format!(
                "Document '{}' introuvable dans '{}'",
                id, collection
            )));
        };
        if let Some(obj) = doc.as_object_mut() {
            obj.insert("id".to_string(), Value::String(id.to_string()));
        }
        self.write_indexed(collection, id, Some(&old_doc), &doc).await?;
        Ok(doc)
    }

    /// `Ok(false)` si le document était absent.
    pub async fn delete_document(&self, collection: &str, id: &str) -> Result<bool> {
        let Some(old_doc) = self.get_document(collection, id).await? else {
            return Ok(false);
        };
        self.storage
            .delete_document(&self.space, &self.db, collection, id)
            .await?;
        self.indexes()
            .update_indexes(collection, id, Some(&old_doc), None)
            .await?;
        Ok(true)
    }

    /// Mise à jour en masse par lots de `batch_size`.
    ///
    /// Chaque document sélectionné est relu et re-filtré juste avant sa
    /// transformation : un document déjà conforme n'est jamais réécrit.
    /// `transform` renvoie `Ok(false)` pour laisser un document intact.
    /// Le résultat est le nombre de documents effectivement réécrits.
    pub async fn update_many<F>(
        &self,
        collection: &str,
        filter: &QueryFilter,
        mut transform: F,
    ) -> std::result::Result<u64, BulkWriteError>
    where
        F: FnMut(&mut Value) -> Result<bool> + Send,
    {
        let ids = match self.find(collection, filter).await {
            Ok(docs) => docs
                .iter()
                .filter_map(|d| d.get("id").and_then(|v| v.as_str()).map(str::to_string))
                .collect::<Vec<_>>(),
            Err(cause) => {
                return Err(BulkWriteError {
                    documents_modified: 0,
                    cause,
                })
            }
        };

        let batch_size = self.storage.config.batch_size.max(1);
        let mut modified = 0u64;
        for (batch_no, batch) in ids.chunks(batch_size).enumerate() {
            for id in batch {
                match self.rewrite_one(collection, id, filter, &mut transform).await {
                    Ok(true) => modified += 1,
                    Ok(false) => {}
                    Err(cause) => {
                        return Err(BulkWriteError {
                            documents_modified: modified,
                            cause,
                        })
                    }
                }
            }
            tracing::debug!(
                "{} : lot {} traité ({} document(s) réécrit(s) au total)",
                collection,
                batch_no + 1,
                modified
            );
        }
        Ok(modified)
    }

    async fn rewrite_one<F>(
        &self,
        collection: &str,
        id: &str,
        filter: &QueryFilter,
        transform: &mut F,
    ) -> Result<bool>
    where
        F: FnMut(&mut Value) -> Result<bool> + Send,
    {
        let Some(old_doc) = self.get_document(collection, id).await? else {
            return Ok(false);
        };
        if !filter.matches(&old_doc) {
            return Ok(false);
        }

        let mut new_doc = old_doc.clone();
        if !transform(&mut new_doc)? || new_doc == old_doc {
            return Ok(false);
        }
        if new_doc.get("id").and_then(|v| v.as_str()) != Some(id) {
            return Err(AppError::Database(format!(
                "La transformation a modifié l'identifiant du document '{}'",
                id
            )));
        }

        self.write_indexed(collection, id, Some(&old_doc), &new_doc)
            .await?;
        Ok(true)
    }

    // --- INDEX SECONDAIRES ---

    /// Idempotent. `Ok(false)` si l'index existait déjà.
    pub async fn create_index(
        &self,
        collection: &str,
        field: &str,
        kind: IndexType,
        unique: bool,
    ) -> Result<bool> {
        self.create_collection(collection).await?;
        let docs = self.list_all(collection).await?;
        let def = IndexDefinition::for_field(field, kind, unique);
        self.indexes().create_index(collection, def, &docs).await
    }

    /// Idempotent. `Ok(false)` si aucun index n'existait.
    pub async fn drop_index(&self, collection: &str, field: &str) -> Result<bool> {
        self.indexes().drop_index(collection, field).await
    }

    pub async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexDefinition>> {
        self.indexes().list_definitions(collection).await
    }
}
