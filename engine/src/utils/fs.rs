// FICHIER : engine/src/utils/fs.rs

use crate::utils::{json, AppError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

// --- RE-EXPORTS (Isolation de la couche OS) ---
pub use std::path::{Path, PathBuf};
use tokio::fs::ReadDir;

pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Crée récursivement un répertoire s'il n'existe pas.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    if !exists(path).await {
        fs::create_dir_all(path).await?;
    }
    Ok(())
}

pub async fn read_to_string(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path).await?)
}

pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read_to_string(path).await?;
    json::parse(&content)
        .map_err(|e| AppError::Database(format!("{} : {}", path.display(), e)))
}

pub async fn read_dir(path: &Path) -> Result<ReadDir> {
    Ok(fs::read_dir(path).await?)
}

/// Écriture atomique sécurisée (write -> sync -> rename)
pub async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(content).await?;
        // On force l'écriture physique sur le disque
        file.sync_all().await?;
    }

    fs::rename(&temp_path, path).await?;
    Ok(())
}

pub async fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let content = json::stringify_pretty(data)?;
    write_atomic(path, content.as_bytes()).await
}

/// Création exclusive : échoue avec `AlreadyExists` si le fichier est présent.
/// Le contenu existant n'est jamais touché.
pub async fn write_new(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    Ok(())
}

/// Supprime un fichier. Renvoie `false` s'il n'existait pas.
pub async fn remove_file(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Liste les fichiers d'un dossier portant l'extension donnée (triés, non récursif).
pub async fn list_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !exists(dir).await {
        return Ok(out);
    }
    let mut entries = read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(extension)
        {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}
