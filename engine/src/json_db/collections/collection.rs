// FICHIER : engine/src/json_db/collections/collection.rs

//! Primitives collections : dossiers et fichiers JSON d'une collection.
//! Pas de cache ni d'index ici, uniquement persistance et I/O.

use crate::json_db::storage::JsonDbConfig;
use crate::utils::fs::{self, PathBuf};
use crate::utils::Result;
use serde_json::Value;

/// Racine des collections : {db_root}/collections/{collection}
pub fn collection_root(cfg: &JsonDbConfig, space: &str, db: &str, collection: &str) -> PathBuf {
    cfg.db_collection_path(space, db, collection)
}

/// Métadonnées : {collection_root}/_meta.json
pub fn meta_path(cfg: &JsonDbConfig, space: &str, db: &str, collection: &str) -> PathBuf {
    collection_root(cfg, space, db, collection).join("_meta.json")
}

/// S'assure que le dossier de la collection existe.
pub async fn create_collection_if_missing(
    cfg: &JsonDbConfig,
    space: &str,
    db: &str,
    collection: &str,
) -> Result<()> {
    fs::ensure_dir(&collection_root(cfg, space, db, collection)).await
}

/// Identifiants des documents, triés. Les fichiers préfixés `_` sont ignorés.
pub async fn list_document_ids(
    cfg: &JsonDbConfig,
    space: &str,
    db: &str,
    collection: &str,
) -> Result<Vec<String>> {
    let root = collection_root(cfg, space, db, collection);
    let files = fs::list_files_with_extension(&root, "json").await?;
    Ok(files
        .iter()
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()))
        .filter(|stem| !stem.starts_with('_'))
        .map(str::to_string)
        .collect())
}

pub async fn list_collection_names_fs(
    cfg: &JsonDbConfig,
    space: &str,
    db: &str,
) -> Result<Vec<String>> {
    let root = cfg.collections_root(space, db);
    let mut out = Vec::new();
    if !fs::exists(&root).await {
        return Ok(out);
    }
    let mut entries = fs::read_dir(&root).await?;
    while let Some(e) = entries.next_entry().await? {
        if e.file_type().await?.is_dir() {
            if let Ok(name) = e.file_name().into_string() {
                out.push(name);
            }
        }
    }
    out.sort();
    Ok(out)
}

pub async fn read_meta(
    cfg: &JsonDbConfig,
    space: &str,
    db: &str,
    collection: &str,
) -> Result<Option<Value>> {
    let path = meta_path(cfg, space, db, collection);
    if !fs::exists(&path).await {
        return Ok(None);
    }
    Ok(Some(fs::read_json(&path).await?))
}

pub async fn write_meta(
    cfg: &JsonDbConfig,
    space: &str,
    db: &str,
    collection: &str,
    meta: &Value,
) -> Result<()> {
    fs::write_json_atomic(&meta_path(cfg, space, db, collection), meta).await
}
