// FICHIER : engine/src/json_db/indexes/paths.rs

use crate::json_db::collections::collection::collection_root;
use crate::json_db::indexes::IndexType;
use crate::json_db::storage::JsonDbConfig;
use std::path::PathBuf;

/// Racine des index : {collection_root}/_indexes
pub fn indexes_root(cfg: &JsonDbConfig, space: &str, db: &str, collection: &str) -> PathBuf {
    collection_root(cfg, space, db, collection).join("_indexes")
}

/// Définitions persistées de tous les index de la collection.
pub fn definitions_path(cfg: &JsonDbConfig, space: &str, db: &str, collection: &str) -> PathBuf {
    indexes_root(cfg, space, db, collection).join("_definitions.json")
}

pub fn index_path(
    cfg: &JsonDbConfig,
    space: &str,
    db: &str,
    collection: &str,
    index_name: &str,
    index_type: IndexType,
) -> PathBuf {
    let extension = match index_type {
        IndexType::Hash => "hash.idx",
        IndexType::BTree => "btree.idx",
    };
    indexes_root(cfg, space, db, collection).join(format!("{index_name}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_structure() {
        let cfg = JsonDbConfig::new(PathBuf::from("/data"));
        let path = index_path(&cfg, "space", "db", "metrics", "kind", IndexType::Hash);
        assert_eq!(
            path,
            PathBuf::from("/data/space/db/collections/metrics/_indexes/kind.hash.idx")
        );
        assert!(definitions_path(&cfg, "space", "db", "metrics").ends_with("_indexes/_definitions.json"));
    }
}
