// FICHIER : engine/src/migrations/generator.rs

//! Générateur de squelettes d'unités déclaratives.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heck::ToSnakeCase;
use regex::Regex;
use tera::{Context, Tera};

use super::id::{Clock, MigrationId, SystemClock};
use super::unit::parse_unit_name;
use crate::utils::error::Context as _;
use crate::utils::{fs, AppConfig, AppError, Result};

const UNIT_TEMPLATE: &str = "unit.json";

const UNIT_SKELETON: &str = r#"{
  "title": {{ title | json_encode() | safe }},
  "createdAt": "{{ created_at }}",
  "notes": "",
  "up": [],
  "down": []
}
"#;

/// Réduit une description libre à un slug `[a-z0-9_]+`.
/// `"Add Approval Fields!"` devient `add_approval_fields`.
pub fn normalize_description(raw: &str) -> Result<String> {
    let separators = Regex::new(r"[^a-z0-9]+").context("motif de normalisation invalide")?;
    let snake = raw.to_snake_case();
    let slug = separators.replace_all(&snake, "_");
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        return Err(AppError::Validation(format!(
            "La description '{}' ne contient aucun caractère exploitable [a-z0-9]",
            raw
        )));
    }
    Ok(slug.to_string())
}

pub struct MigrationGenerator {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    tera: Tera,
}

impl MigrationGenerator {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(UNIT_TEMPLATE, UNIT_SKELETON)?;
        Ok(Self {
            dir: dir.into(),
            clock: Arc::new(SystemClock),
            tera,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.migrations_dir.clone())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Plus grand identifiant présent dans le répertoire.
    /// Les fichiers mal nommés sont ignorés ici ; la découverte les refusera.
    pub async fn latest_id(&self) -> Result<Option<MigrationId>> {
        let files = fs::list_files_with_extension(&self.dir, "json").await?;
        Ok(files
            .iter()
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()))
            .filter_map(|stem| parse_unit_name(stem).ok())
            .map(|(id, _)| id)
            .max())
    }

    /// Crée le squelette `<id>_<description>.json` et renvoie son chemin.
    ///
    /// Un fichier existant n'est jamais écrasé (`Io`, `AlreadyExists`). Si
    /// l'instant courant ne dépasse pas le dernier identifiant du répertoire,
    /// l'identifiant est porté à `dernier + 1`.
    pub async fn create(&self, description: &str) -> Result<PathBuf> {
        let slug = normalize_description(description)?;
        let now = self.clock.now();

        let mut id = MigrationId::from_instant(now);
        if !fs::exists(&self.unit_path(id, &slug)).await {
            if let Some(latest) = self.latest_id().await? {
                if id <= latest {
                    tracing::debug!("Identifiant {} non croissant, porté à {}", id, latest.next());
                    id = latest.next();
                }
            }
        }

        let path = self.unit_path(id, &slug);
        let content = self.render(description.trim(), &now.to_rfc3339())?;
        fs::write_new(&path, content.as_bytes()).await?;
        tracing::info!("Unité de migration créée : {}", path.display());
        Ok(path)
    }

    fn unit_path(&self, id: MigrationId, slug: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.json", id, slug))
    }

    fn render(&self, title: &str, created_at: &str) -> Result<String> {
        let mut context = Context::new();
        context.insert("title", title);
        context.insert("created_at", created_at);
        Ok(self.tera.render(UNIT_TEMPLATE, &context)?)
    }
}
