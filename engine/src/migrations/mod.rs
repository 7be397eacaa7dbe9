// FICHIER : engine/src/migrations/mod.rs

//! Moteur de migrations versionnées.
//!
//! - `unit` : contrat d'une unité (`apply` rejouable, `revert` au mieux).
//! - `declarative` / `steps` : unités décrites en JSON.
//! - `builtin` : unités compilées.
//! - `registry` : découverte et tri par identifiant.
//! - `ledger` : registre des migrations appliquées, dans la base migrée.
//! - `runner` : exécution séquentielle, arrêt au premier échec.
//! - `generator` : création de squelettes horodatés.

pub mod builtin;
pub mod declarative;
pub mod generator;
pub mod id;
pub mod ledger;
pub mod registry;
pub mod report;
pub mod runner;
pub mod steps;
pub mod unit;

pub use declarative::{DeclarativeMigration, UnitDocument};
pub use generator::{normalize_description, MigrationGenerator};
pub use id::{Clock, FixedClock, MigrationId, SystemClock};
pub use ledger::{LedgerEntry, MigrationLedger};
pub use registry::MigrationRegistry;
pub use report::{BatchReport, Direction, StatusLine, StatusReport, UnitOutcome, UnitState};
pub use runner::{MigrationRunner, RunOptions};
pub use steps::MigrationStep;
pub use unit::{MigrationUnit, UnitFailure, UnitResult, UnitSummary};

use std::path::Path;

use crate::utils::Result;

/// Registre complet : unités compilées puis fichiers du répertoire.
pub async fn load_registry(migrations_dir: &Path) -> Result<MigrationRegistry> {
    let mut registry = MigrationRegistry::new();
    builtin::register_all(&mut registry)?;
    registry.load_dir(migrations_dir).await?;
    Ok(registry)
}
