// FICHIER : engine/src/migrations/registry.rs

//! Découverte des unités : unités compilées enregistrées explicitement, plus
//! les fichiers déclaratifs d'un répertoire. `discover` trie strictement par
//! identifiant et refuse tout doublon.

use std::path::Path;

use super::declarative::DeclarativeMigration;
use super::unit::{validate_description, MigrationUnit};
use crate::utils::{fs, AppError, Result};

#[derive(Default)]
pub struct MigrationRegistry {
    units: Vec<Box<dyn MigrationUnit>>,
}

impl std::fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.units.iter().map(|u| u.name()))
            .finish()
    }
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<U: MigrationUnit + 'static>(&mut self, unit: U) -> &mut Self {
        self.units.push(Box::new(unit));
        self
    }

    pub fn with<U: MigrationUnit + 'static>(mut self, unit: U) -> Self {
        self.register(unit);
        self
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Charge les unités `*.json` du répertoire. Les fichiers préfixés `.` ou `_`
    /// sont ignorés ; un répertoire absent ne contient aucune unité.
    pub async fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !fs::exists(dir).await {
            tracing::debug!("Répertoire de migrations absent : {:?}", dir);
            return Ok(0);
        }

        let mut loaded = 0;
        for path in fs::list_files_with_extension(dir, "json").await? {
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.') || n.starts_with('_'));
            if hidden {
                continue;
            }
            self.register(DeclarativeMigration::load(&path).await?);
            loaded += 1;
        }
        tracing::debug!("{} unité(s) déclarative(s) chargée(s) depuis {:?}", loaded, dir);
        Ok(loaded)
    }

    /// Ordre d'exécution définitif : tri par identifiant, doublons refusés.
    pub fn discover(self) -> Result<Vec<Box<dyn MigrationUnit>>> {
        let mut units = self.units;
        for unit in &units {
            validate_description(unit.description())
                .map_err(|e| AppError::Config(format!("Unité {} : {}", unit.id(), e)))?;
        }

        units.sort_by_key(|u| u.id());
        if let Some(pair) = units.windows(2).find(|w| w[0].id() == w[1].id()) {
            return Err(AppError::Config(format!(
                "Identifiant de migration dupliqué {} : '{}' et '{}'",
                pair[0].id(),
                pair[0].name(),
                pair[1].name()
            )));
        }
        Ok(units)
    }
}
