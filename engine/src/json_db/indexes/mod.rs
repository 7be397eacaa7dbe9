// FICHIER : engine/src/json_db/indexes/mod.rs

pub mod driver;
pub mod manager;
pub mod paths;

use serde::{Deserialize, Serialize};

pub use manager::IndexManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    /// Index exact (HashMap). Identifiants, codes uniques.
    #[default]
    Hash,
    /// Index ordonné (BTree). Dates, nombres.
    BTree,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub field_path: String,
    pub index_type: IndexType,
    #[serde(default)]
    pub unique: bool,
}

impl IndexDefinition {
    /// Le nom est dérivé du chemin (`approval.status` -> `approval_status`).
    pub fn for_field(field_path: &str, index_type: IndexType, unique: bool) -> Self {
        Self {
            name: index_name(field_path),
            field_path: field_path.to_string(),
            index_type,
            unique,
        }
    }
}

pub fn index_name(field_path: &str) -> String {
    field_path.replace('.', "_")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub key: String,
    pub document_id: String,
}
