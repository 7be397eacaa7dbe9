// FICHIER : engine/src/json_db/storage/file_storage.rs

use crate::json_db::storage::JsonDbConfig;
use crate::utils::{fs, json, Result};
use serde_json::Value;

/// Crée l'arborescence physique de la base (idempotent).
/// Renvoie `true` si la base vient d'être créée.
pub async fn create_db(config: &JsonDbConfig, space: &str, db: &str) -> Result<bool> {
    let collections_root = config.collections_root(space, db);
    if fs::exists(&collections_root).await {
        return Ok(false);
    }
    fs::ensure_dir(&collections_root).await?;
    tracing::debug!("📦 Base créée : {:?}", config.db_root(space, db));
    Ok(true)
}

pub async fn db_exists(config: &JsonDbConfig, space: &str, db: &str) -> bool {
    fs::exists(&config.db_root(space, db)).await
}

pub async fn write_document(
    config: &JsonDbConfig,
    space: &str,
    db: &str,
    collection: &str,
    id: &str,
    doc: &Value,
) -> Result<()> {
    let file_path = config
        .db_collection_path(space, db, collection)
        .join(format!("{}.json", id));
    let content = json::stringify_pretty(doc)?;
    fs::write_atomic(&file_path, content.as_bytes()).await
}

pub async fn read_document(
    config: &JsonDbConfig,
    space: &str,
    db: &str,
    collection: &str,
    id: &str,
) -> Result<Option<Value>> {
    let file_path = config
        .db_collection_path(space, db, collection)
        .join(format!("{}.json", id));

    if !fs::exists(&file_path).await {
        return Ok(None);
    }
    Ok(Some(fs::read_json(&file_path).await?))
}

pub async fn delete_document(
    config: &JsonDbConfig,
    space: &str,
    db: &str,
    collection: &str,
    id: &str,
) -> Result<bool> {
    let file_path = config
        .db_collection_path(space, db, collection)
        .join(format!("{}.json", id));
    fs::remove_file(&file_path).await
}
