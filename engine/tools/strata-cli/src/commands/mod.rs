use clap::Args;

use strata::utils::{
    io::{Path, PathBuf},
    prelude::*,
};

pub mod migrate;

/// Base visée. Chaque option l'emporte sur le fichier et l'environnement.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Racine de la base documentaire
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[arg(long, global = true)]
    pub space: Option<String>,

    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Répertoire des unités `<id>_<description>.json`
    #[arg(long, global = true)]
    pub migrations_dir: Option<PathBuf>,
}

impl TargetArgs {
    pub fn resolve(&self, config_file: Option<&Path>) -> Result<AppConfig> {
        let mut config = AppConfig::load(config_file)?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(root) = &self.root {
            config.data_root = root.clone();
        }
        if let Some(space) = &self.space {
            config.space = space.clone();
        }
        if let Some(db) = &self.db {
            config.db = db.clone();
        }
        if let Some(dir) = &self.migrations_dir {
            config.migrations_dir = dir.clone();
        }
    }
}
