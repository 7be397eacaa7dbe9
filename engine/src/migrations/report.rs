// FICHIER : engine/src/migrations/report.rs

//! Rapports structurés produits par le Runner.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::MigrationId;
use crate::utils::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "forward" => Ok(Direction::Forward),
            "down" | "backward" => Ok(Direction::Backward),
            other => Err(AppError::Validation(format!(
                "Direction inconnue '{}' (attendu up|down)",
                other
            ))),
        }
    }
}

/// Cycle de vie d'une unité pendant un lot.
///
/// `Discovered -> Pending -> Running -> Applied | Failed`, et en marche
/// arrière `Running -> Reverted | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitState {
    Discovered,
    Pending,
    Running,
    Applied,
    Failed,
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOutcome {
    pub migration_id: MigrationId,
    pub description: String,
    pub status: UnitState,
    pub documents_modified: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl UnitOutcome {
    /// Erreur d'exécution équivalente, pour un résultat en échec.
    pub fn execution_error(&self) -> Option<AppError> {
        if self.status != UnitState::Failed {
            return None;
        }
        Some(AppError::Execution {
            migration_id: self.migration_id.to_string(),
            documents_modified: self.documents_modified,
            cause: self.error.clone().unwrap_or_default(),
        })
    }
}

/// Bilan d'un appel à `run`. Un lot s'arrête au premier échec : `failure`
/// est alors toujours le dernier résultat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub direction: Direction,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<UnitOutcome>,
}

impl BatchReport {
    pub fn new(direction: Direction) -> Self {
        let now = Utc::now();
        Self {
            direction,
            started_at: now,
            finished_at: now,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: UnitOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn is_noop(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.failure().is_none()
    }

    pub fn failure(&self) -> Option<&UnitOutcome> {
        self.outcomes.iter().find(|o| o.status == UnitState::Failed)
    }

    /// Identifiants traités avec succès, dans l'ordre d'exécution.
    pub fn applied_ids(&self) -> Vec<MigrationId> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, UnitState::Applied | UnitState::Reverted))
            .map(|o| o.migration_id)
            .collect()
    }

    pub fn total_documents_modified(&self) -> u64 {
        self.outcomes.iter().map(|o| o.documents_modified).sum()
    }

    /// Convertit un lot interrompu en `AppError::Execution`.
    pub fn into_result(self) -> Result<Self> {
        match self.failure().and_then(UnitOutcome::execution_error) {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    pub fn summary(&self) -> String {
        if self.is_noop() {
            return format!("{} : rien à faire", self.direction);
        }
        let done = self.applied_ids().len();
        match self.failure() {
            Some(failed) => format!(
                "{} : {} unité(s) traitée(s), arrêt sur {} ({} document(s) modifié(s) avant l'échec)",
                self.direction, done, failed.migration_id, failed.documents_modified
            ),
            None => format!(
                "{} : {} unité(s) traitée(s), {} document(s) modifié(s)",
                self.direction,
                done,
                self.total_documents_modified()
            ),
        }
    }
}

// --- ÉTAT GLOBAL ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLine {
    pub migration_id: MigrationId,
    pub description: String,
    pub status: UnitState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_notes: Option<String>,
}

/// Vue d'ensemble : unités découvertes avec leur état, et entrées du registre
/// sans unité correspondante.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub units: Vec<StatusLine>,
    pub orphans: Vec<MigrationId>,
}

impl StatusReport {
    pub fn pending(&self) -> impl Iterator<Item = &StatusLine> {
        self.units.iter().filter(|l| l.status == UnitState::Pending)
    }

    pub fn applied(&self) -> impl Iterator<Item = &StatusLine> {
        self.units.iter().filter(|l| l.status == UnitState::Applied)
    }
}
