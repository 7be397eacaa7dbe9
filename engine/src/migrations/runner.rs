// FICHIER : engine/src/migrations/runner.rs

//! Exécution séquentielle des unités contre une base.
//!
//! Marche avant : `apply` puis inscription au registre. Une unité appliquée
//! mais non inscrite (arrêt brutal entre les deux) est simplement rejouée au
//! lancement suivant, ce que le contrat d'idempotence rend sûr.
//! Le premier échec arrête le lot : les unités suivantes peuvent dépendre de
//! la forme produite par celle qui a échoué.

use std::collections::HashSet;
use std::time::Instant;

use super::id::MigrationId;
use super::ledger::MigrationLedger;
use super::registry::MigrationRegistry;
use super::report::{BatchReport, Direction, StatusLine, StatusReport, UnitOutcome, UnitState};
use super::unit::MigrationUnit;
use crate::json_db::collections::CollectionsManager;
use crate::utils::config::DEFAULT_LEDGER_COLLECTION;
use crate::utils::{AppError, Result};

/// Bornes d'un lot. Sans limite, la marche arrière ne défait que la dernière unité.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub limit: Option<usize>,
    pub target: Option<MigrationId>,
}

impl RunOptions {
    pub fn limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            target: None,
        }
    }

    pub fn target(target: MigrationId) -> Self {
        Self {
            limit: None,
            target: Some(target),
        }
    }
}

pub struct MigrationRunner<'a> {
    db: &'a CollectionsManager<'a>,
    units: Vec<Box<dyn MigrationUnit>>,
    ledger_collection: String,
}

impl<'a> MigrationRunner<'a> {
    /// Découvre les unités du registre. Doublon ou identifiant invalide : `Config`.
    pub fn new(db: &'a CollectionsManager<'a>, registry: MigrationRegistry) -> Result<Self> {
        let units = registry.discover()?;
        for unit in &units {
            tracing::trace!("{} : {:?}", unit.name(), UnitState::Discovered);
        }
        Ok(Self {
            db,
            units,
            ledger_collection: DEFAULT_LEDGER_COLLECTION.to_string(),
        })
    }

    pub fn with_ledger_collection(mut self, collection: &str) -> Self {
        self.ledger_collection = collection.to_string();
        self
    }

    pub fn ledger(&self) -> MigrationLedger<'a> {
        MigrationLedger::with_collection(self.db, &self.ledger_collection)
    }

    /// Unités découvertes, par identifiant croissant.
    pub fn units(&self) -> impl Iterator<Item = &dyn MigrationUnit> {
        self.units.iter().map(|u| u.as_ref())
    }

    fn find_unit(&self, id: MigrationId) -> Option<&dyn MigrationUnit> {
        self.units().find(|u| u.id() == id)
    }

    /// Unités découvertes absentes du registre, dans l'ordre d'exécution.
    pub async fn pending(&self) -> Result<Vec<&dyn MigrationUnit>> {
        let applied: HashSet<MigrationId> =
            self.ledger().list_applied().await?.into_iter().collect();
        Ok(self.units().filter(|u| !applied.contains(&u.id())).collect())
    }

    pub async fn status(&self) -> Result<StatusReport> {
        let entries = self.ledger().entries().await?;
        let mut report = StatusReport::default();

        for unit in self.units() {
            let entry = entries.iter().find(|e| e.migration_id == unit.id());
            report.units.push(StatusLine {
                migration_id: unit.id(),
                description: unit.description().to_string(),
                status: if entry.is_some() {
                    UnitState::Applied
                } else {
                    UnitState::Pending
                },
                applied_at: entry.map(|e| e.applied_at),
                revert_notes: unit.revert_notes().map(str::to_string),
            });
        }

        for entry in &entries {
            if self.find_unit(entry.migration_id).is_none() {
                tracing::warn!(
                    "Migration {} inscrite au registre mais introuvable parmi les unités",
                    entry.migration_id
                );
                report.orphans.push(entry.migration_id);
            }
        }
        Ok(report)
    }

    /// Exécute un lot. Les échecs d'unité sont portés par le rapport ;
    /// `Err` est réservé aux erreurs de sélection (cible inconnue, unité manquante, registre illisible).
    pub async fn run(&self, direction: Direction, options: RunOptions) -> Result<BatchReport> {
        let ledger = self.ledger();
        ledger.init().await?;

        let report = match direction {
            Direction::Forward => self.run_forward(&ledger, options).await?,
            Direction::Backward => self.run_backward(&ledger, options).await?,
        };

        if report.is_noop() {
            tracing::info!("Aucune migration à exécuter ({})", direction);
        } else if report.is_success() {
            tracing::info!("✅ {}", report.summary());
        } else {
            tracing::error!("❌ {}", report.summary());
        }
        Ok(report)
    }

    async fn run_forward(
        &self,
        ledger: &MigrationLedger<'_>,
        options: RunOptions,
    ) -> Result<BatchReport> {
        if let Some(target) = options.target {
            if self.find_unit(target).is_none() {
                return Err(AppError::NotFound(format!(
                    "Aucune unité ne porte l'identifiant cible {}",
                    target
                )));
            }
        }

        let applied: HashSet<MigrationId> = ledger.list_applied().await?.into_iter().collect();
        let selected: Vec<&dyn MigrationUnit> = self
            .units()
            .filter(|u| !applied.contains(&u.id()))
            .filter(|u| options.target.map_or(true, |t| u.id() <= t))
            .take(options.limit.unwrap_or(usize::MAX))
            .collect();

        for unit in &selected {
            tracing::debug!("{} : {:?}", unit.name(), UnitState::Pending);
        }
        self.execute_all(ledger, Direction::Forward, selected).await
    }

    async fn run_backward(
        &self,
        ledger: &MigrationLedger<'_>,
        options: RunOptions,
    ) -> Result<BatchReport> {
        let applied = ledger.list_applied().await?;

        let selected_ids: Vec<MigrationId> = match options.target {
            Some(target) => {
                if !applied.contains(&target) {
                    return Err(AppError::NotFound(format!(
                        "La migration cible {} n'est pas appliquée",
                        target
                    )));
                }
                applied
                    .iter()
                    .rev()
                    .filter(|id| **id >= target)
                    .take(options.limit.unwrap_or(usize::MAX))
                    .copied()
                    .collect()
            }
            None => applied
                .iter()
                .rev()
                .take(options.limit.unwrap_or(1))
                .copied()
                .collect(),
        };

        // Toutes les unités doivent être résolues avant le premier revert.
        let mut selected = Vec::with_capacity(selected_ids.len());
        for id in selected_ids {
            let unit = self.find_unit(id).ok_or_else(|| {
                AppError::Config(format!(
                    "La migration {} est inscrite au registre mais aucune unité ne la décrit",
                    id
                ))
            })?;
            selected.push(unit);
        }
        self.execute_all(ledger, Direction::Backward, selected).await
    }

    async fn execute_all(
        &self,
        ledger: &MigrationLedger<'_>,
        direction: Direction,
        units: Vec<&dyn MigrationUnit>,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::new(direction);
        for unit in units {
            let outcome = self.execute(ledger, direction, unit).await;
            let halted = outcome.status == UnitState::Failed;
            report.push(outcome);
            if halted {
                break;
            }
        }
        Ok(report.finish())
    }

    async fn execute(
        &self,
        ledger: &MigrationLedger<'_>,
        direction: Direction,
        unit: &dyn MigrationUnit,
    ) -> UnitOutcome {
        let name = unit.name();
        tracing::info!("🚀 {} ({}) : {:?}", name, direction, UnitState::Running);
        let started = Instant::now();

        let result = match direction {
            Direction::Forward => unit.apply(self.db).await,
            Direction::Backward => unit.revert(self.db).await,
        };

        let (status, documents_modified, error) = match result {
            Ok(summary) => {
                let recorded = match direction {
                    Direction::Forward => ledger
                        .record_applied(unit.id(), unit.description(), summary)
                        .await
                        .map(|_| UnitState::Applied),
                    Direction::Backward => ledger
                        .record_reverted(unit.id())
                        .await
                        .map(|_| UnitState::Reverted),
                };
                match recorded {
                    Ok(state) => (state, summary.documents_modified, None),
                    Err(e) => (
                        UnitState::Failed,
                        summary.documents_modified,
                        Some(format!("Inscription au registre impossible : {}", e)),
                    ),
                }
            }
            Err(failure) => (
                UnitState::Failed,
                failure.documents_modified,
                Some(failure.cause.to_string()),
            ),
        };

        let elapsed = started.elapsed();
        match &error {
            None => tracing::info!(
                "✅ Migration '{}' terminée en {:.2}s ({} document(s))",
                name,
                elapsed.as_secs_f64(),
                documents_modified
            ),
            Some(cause) => tracing::error!(
                "❌ Migration '{}' en échec après {} document(s) : {}",
                name,
                documents_modified,
                cause
            ),
        }

        UnitOutcome {
            migration_id: unit.id(),
            description: unit.description().to_string(),
            status,
            documents_modified,
            error,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
