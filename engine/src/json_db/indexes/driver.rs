// FICHIER : engine/src/json_db/indexes/driver.rs

use super::IndexRecord;
use crate::utils::{fs, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Structure d'index en mémoire : clé -> identifiants de documents.
pub trait IndexMap: Default + Serialize + DeserializeOwned {
    fn insert_record(&mut self, key: String, doc_id: String);
    fn remove_record(&mut self, key: &str, doc_id: &str);
    fn get_doc_ids(&self, key: &str) -> Option<&Vec<String>>;
    fn from_records(records: Vec<IndexRecord>) -> Self;
    fn to_records(&self) -> Vec<IndexRecord>;
}

macro_rules! impl_index_map {
    ($map:ty) => {
        impl IndexMap for $map {
            fn insert_record(&mut self, key: String, doc_id: String) {
                let ids = self.entry(key).or_default();
                if !ids.contains(&doc_id) {
                    ids.push(doc_id);
                }
            }

            fn remove_record(&mut self, key: &str, doc_id: &str) {
                if let Some(ids) = self.get_mut(key) {
                    ids.retain(|id| id != doc_id);
                    if ids.is_empty() {
                        self.remove(key);
                    }
                }
            }

            fn get_doc_ids(&self, key: &str) -> Option<&Vec<String>> {
                self.get(key)
            }

            fn from_records(records: Vec<IndexRecord>) -> Self {
                let mut map = <$map>::default();
                for r in records {
                    map.insert_record(r.key, r.document_id);
                }
                map
            }

            fn to_records(&self) -> Vec<IndexRecord> {
                self.iter()
                    .flat_map(|(k, ids)| {
                        ids.iter().map(move |id| IndexRecord {
                            key: k.clone(),
                            document_id: id.clone(),
                        })
                    })
                    .collect()
            }
        }
    };
}

// Hash : accès exact ; BTree : clés ordonnées
impl_index_map!(HashMap<String, Vec<String>>);
impl_index_map!(BTreeMap<String, Vec<String>>);

pub async fn load<T: IndexMap>(path: &Path) -> Result<T> {
    if !fs::exists(path).await {
        return Ok(T::default());
    }
    let records: Vec<IndexRecord> = fs::read_json(path).await?;
    Ok(T::from_records(records))
}

pub async fn save<T: IndexMap>(path: &Path, index: &T) -> Result<()> {
    fs::write_json_atomic(path, &index.to_records()).await
}
