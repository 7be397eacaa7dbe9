// FICHIER : engine/src/json_db/indexes/manager.rs

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use super::driver::{self, IndexMap};
use super::{paths, IndexDefinition, IndexType};
use crate::json_db::storage::StorageEngine;
use crate::utils::json::get_path;
use crate::utils::{fs, AppError, Result};

type HashIndex = HashMap<String, Vec<String>>;
type BTreeIndex = BTreeMap<String, Vec<String>>;

/// Encodage d'une valeur en clé d'index. Les nombres passent par `f64`,
/// comme l'égalité des filtres : `4` et `4.0` partagent la même clé.
pub fn encode_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) => f.to_string(),
            None => n.to_string(),
        }),
        v => Some(v.to_string()),
    }
}

/// Clé d'index d'un document : absent ou null => non indexé.
pub fn index_key(doc: &Value, field_path: &str) -> Option<String> {
    get_path(doc, field_path).and_then(encode_key)
}

fn doc_id(doc: &Value) -> Option<&str> {
    doc.get("id").and_then(|v| v.as_str())
}

#[derive(Debug)]
pub struct IndexManager<'a> {
    storage: &'a StorageEngine,
    space: String,
    db: String,
}

impl<'a> IndexManager<'a> {
    pub fn new(storage: &'a StorageEngine, space: &str, db: &str) -> Self {
        Self {
            storage,
            space: space.to_string(),
            db: db.to_string(),
        }
    }

    fn path_for(&self, collection: &str, def: &IndexDefinition) -> std::path::PathBuf {
        paths::index_path(
            &self.storage.config,
            &self.space,
            &self.db,
            collection,
            &def.name,
            def.index_type,
        )
    }

    pub async fn list_definitions(&self, collection: &str) -> Result<Vec<IndexDefinition>> {
        let path = paths::definitions_path(&self.storage.config, &self.space, &self.db, collection);
        if !fs::exists(&path).await {
            return Ok(Vec::new());
        }
        fs::read_json(&path).await
    }

    async fn save_definitions(&self, collection: &str, defs: &[IndexDefinition]) -> Result<()> {
        let path = paths::definitions_path(&self.storage.config, &self.space, &self.db, collection);
        fs::write_json_atomic(&path, &defs).await
    }

    pub async fn find_definition(
        &self,
        collection: &str,
        field_path: &str,
    ) -> Result<Option<IndexDefinition>> {
        Ok(self
            .list_definitions(collection)
            .await?
            .into_iter()
            .find(|d| d.field_path == field_path))
    }

    /// Construit l'index à partir des documents existants.
    /// `Ok(false)` si un index existe déjà sur ce champ.
    pub async fn create_index(
        &self,
        collection: &str,
        def: IndexDefinition,
        documents: &[Value],
    ) -> Result<bool> {
        let mut defs = self.list_definitions(collection).await?;
        if defs.iter().any(|d| d.field_path == def.field_path) {
            return Ok(false);
        }
        // Deux chemins distincts ne peuvent pas partager un fichier d'index.
        if let Some(other) = defs.iter().find(|d| d.name == def.name) {
            return Err(AppError::Conflict(format!(
                "L'index '{}' de {} porte déjà sur '{}' : impossible d'indexer '{}'",
                def.name, collection, other.field_path, def.field_path
            )));
        }

        let records: Vec<(String, String)> = documents
            .iter()
            .filter_map(|doc| Some((index_key(doc, &def.field_path)?, doc_id(doc)?.to_string())))
            .collect();

        let path = self.path_for(collection, &def);
        match def.index_type {
            IndexType::Hash => build_and_save::<HashIndex>(&path, &def, records).await?,
            IndexType::BTree => build_and_save::<BTreeIndex>(&path, &def, records).await?,
        }

        tracing::debug!(
            "Index '{}' ({:?}) créé sur {}.{}",
            def.name,
            def.index_type,
            collection,
            def.field_path
        );
        defs.push(def);
        self.save_definitions(collection, &defs).await?;
        Ok(true)
    }

    /// `Ok(false)` si aucun index n'existait sur ce champ.
    pub async fn drop_index(&self, collection: &str, field_path: &str) -> Result<bool> {
        let mut defs = self.list_definitions(collection).await?;
        let Some(pos) = defs.iter().position(|d| d.field_path == field_path) else {
            return Ok(false);
        };
        let def = defs.remove(pos);
        fs::remove_file(&self.path_for(collection, &def)).await?;
        self.save_definitions(collection, &defs).await?;
        Ok(true)
    }

    /// Identifiants indexés pour une valeur exacte.
    ///
    /// `None` si le champ n'est pas indexé ou si l'index ne peut pas répondre :
    /// null (les documents sans valeur ne sont pas indexés), objets et tableaux.
    /// L'appelant doit alors parcourir toute la collection.
    pub async fn search(
        &self,
        collection: &str,
        field_path: &str,
        value: &Value,
    ) -> Result<Option<Vec<String>>> {
        if !matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
            return Ok(None);
        }
        let Some(key) = encode_key(value) else {
            return Ok(None);
        };
        let Some(def) = self.find_definition(collection, field_path).await? else {
            return Ok(None);
        };
        let path = self.path_for(collection, &def);
        let ids = match def.index_type {
            IndexType::Hash => lookup::<HashIndex>(&path, &key).await?,
            IndexType::BTree => lookup::<BTreeIndex>(&path, &key).await?,
        };
        Ok(Some(ids))
    }

    /// Refuse l'écriture si elle viole un index unique.
    pub async fn check_unique(&self, collection: &str, id: &str, new_doc: &Value) -> Result<()> {
        for def in self.list_definitions(collection).await? {
            if !def.unique {
                continue;
            }
            let Some(key) = index_key(new_doc, &def.field_path) else {
                continue;
            };
            let path = self.path_for(collection, &def);
            let holders = match def.index_type {
                IndexType::Hash => lookup::<HashIndex>(&path, &key).await?,
                IndexType::BTree => lookup::<BTreeIndex>(&path, &key).await?,
            };
            if holders.iter().any(|holder| holder != id) {
                return Err(AppError::Conflict(format!(
                    "Valeur {} déjà présente dans l'index unique '{}' de {}",
                    key, def.name, collection
                )));
            }
        }
        Ok(())
    }

    /// Répercute une écriture (old -> new) sur tous les index de la collection.
    pub async fn update_indexes(
        &self,
        collection: &str,
        id: &str,
        old_doc: Option<&Value>,
        new_doc: Option<&Value>,
    ) -> Result<()> {
        for def in self.list_definitions(collection).await? {
            let old_key = old_doc.and_then(|d| index_key(d, &def.field_path));
            let new_key = new_doc.and_then(|d| index_key(d, &def.field_path));
            if old_key == new_key {
                continue;
            }
            let path = self.path_for(collection, &def);
            match def.index_type {
                IndexType::Hash => {
                    apply_change::<HashIndex>(&path, id, old_key.as_deref(), new_key).await?
                }
                IndexType::BTree => {
                    apply_change::<BTreeIndex>(&path, id, old_key.as_deref(), new_key).await?
                }
            }
        }
        Ok(())
    }
}

async fn build_and_save<T: IndexMap>(
    path: &std::path::Path,
    def: &IndexDefinition,
    records: Vec<(String, String)>,
) -> Result<()> {
    let mut index = T::default();
    for (key, id) in records {
        if def.unique && index.get_doc_ids(&key).is_some_and(|ids| !ids.is_empty()) {
            return Err(AppError::Conflict(format!(
                "Impossible de créer l'index unique '{}' : valeur dupliquée {}",
                def.name, key
            )));
        }
        index.insert_record(key, id);
    }
    driver::save(path, &index).await
}

async fn lookup<T: IndexMap>(path: &std::path::Path, key: &str) -> Result<Vec<String>> {
    let index: T = driver::load(path).await?;
    Ok(index.get_doc_ids(key).cloned().unwrap_or_default())
}

async fn apply_change<T: IndexMap>(
    path: &std::path::Path,
    id: &str,
    old_key: Option<&str>,
    new_key: Option<String>,
) -> Result<()> {
    let mut index: T = driver::load(path).await?;
    if let Some(old) = old_key {
        index.remove_record(old, id);
    }
    if let Some(new) = new_key {
        index.insert_record(new, id.to_string());
    }
    driver::save(path, &index).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_db::storage::JsonDbConfig;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_search_drop() {
        let dir = tempdir().unwrap();
        let storage = StorageEngine::new(JsonDbConfig::new(dir.path().to_path_buf()));
        let idx = IndexManager::new(&storage, "s", "d");
        let docs = vec![
            json!({ "id": "a", "kind": "water" }),
            json!({ "id": "b", "kind": "emissions" }),
            json!({ "id": "c" }),
        ];

        let def = IndexDefinition::for_field("kind", IndexType::Hash, false);
        assert!(idx.create_index("metrics", def.clone(), &docs).await.unwrap());
        assert!(!idx.create_index("metrics", def, &docs).await.unwrap());

        let hits = idx.search("metrics", "kind", &json!("water")).await.unwrap();
        assert_eq!(hits, Some(vec!["a".to_string()]));
        assert_eq!(idx.search("metrics", "value", &json!(1)).await.unwrap(), None);

        assert!(idx.drop_index("metrics", "kind").await.unwrap());
        assert!(!idx.drop_index("metrics", "kind").await.unwrap());
        assert!(idx.list_definitions("metrics").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicates() {
        let dir = tempdir().unwrap();
        let storage = StorageEngine::new(JsonDbConfig::new(dir.path().to_path_buf()));
        let idx = IndexManager::new(&storage, "s", "d");
        let docs = vec![json!({ "id": "a", "code": "X" }), json!({ "id": "b", "code": "X" })];

        let def = IndexDefinition::for_field("code", IndexType::BTree, true);
        let err = idx.create_index("metrics", def.clone(), &docs).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(idx.list_definitions("metrics").await.unwrap().is_empty());

        assert!(idx.create_index("metrics", def, &docs[..1]).await.unwrap());
        let clash = json!({ "id": "b", "code": "X" });
        assert!(idx.check_unique("metrics", "b", &clash).await.is_err());
        // Réécriture du même document : autorisée
        assert!(idx.check_unique("metrics", "a", &docs[0]).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_indexes_moves_keys() {
        let dir = tempdir().unwrap();
        let storage = StorageEngine::new(JsonDbConfig::new(dir.path().to_path_buf()));
        let idx = IndexManager::new(&storage, "s", "d");
        let old = json!({ "id": "a", "status": "draft" });
        let def = IndexDefinition::for_field("status", IndexType::Hash, false);
        idx.create_index("metrics", def, std::slice::from_ref(&old))
            .await
            .unwrap();

        let new = json!({ "id": "a", "status": "approved" });
        idx.update_indexes("metrics", "a", Some(&old), Some(&new))
            .await
            .unwrap();

        let draft = idx.search("metrics", "status", &json!("draft")).await.unwrap();
        let approved = idx.search("metrics", "status", &json!("approved")).await.unwrap();
        assert_eq!(draft, Some(vec![]));
        assert_eq!(approved, Some(vec!["a".to_string()]));

        idx.update_indexes("metrics", "a", Some(&new), None).await.unwrap();
        let approved = idx.search("metrics", "status", &json!("approved")).await.unwrap();
        assert_eq!(approved, Some(vec![]));
    }

    #[tokio::test]
    async fn test_search_keys_follow_filter_equality() {
        let dir = tempdir().unwrap();
        let storage = StorageEngine::new(JsonDbConfig::new(dir.path().to_path_buf()));
        let idx = IndexManager::new(&storage, "s", "d");
        let docs = vec![json!({ "id": "a" }), json!({ "id": "c", "score": 4.0 })];
        let def = IndexDefinition::for_field("score", IndexType::BTree, false);
        idx.create_index("metrics", def, &docs).await.unwrap();

        let hits = idx.search("metrics", "score", &json!(4)).await.unwrap();
        assert_eq!(hits, Some(vec!["c".to_string()]));
        // null et valeurs composées : l'index ne répond pas
        assert_eq!(idx.search("metrics", "score", &Value::Null).await.unwrap(), None);
        assert_eq!(idx.search("metrics", "score", &json!([4])).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clashing_index_names_are_rejected() {
        let dir = tempdir().unwrap();
        let storage = StorageEngine::new(JsonDbConfig::new(dir.path().to_path_buf()));
        let idx = IndexManager::new(&storage, "s", "d");
        let docs = vec![json!({ "id": "a", "approval": { "status": "ok" }, "approval_status": 1 })];

        let nested = IndexDefinition::for_field("approval.status", IndexType::Hash, false);
        let flat = IndexDefinition::for_field("approval_status", IndexType::Hash, false);
        assert!(idx.create_index("metrics", nested, &docs).await.unwrap());
        let err = idx.create_index("metrics", flat, &docs).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assert!(!idx.drop_index("metrics", "approval_status").await.unwrap());
        let defs = idx.list_definitions("metrics").await.unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].field_path, "approval.status");
    }
}
