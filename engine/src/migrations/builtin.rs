// FICHIER : engine/src/migrations/builtin.rs

//! Unités compilées, pour les réécritures qu'aucune étape déclarative n'exprime.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use super::id::MigrationId;
use super::registry::MigrationRegistry;
use super::unit::{MigrationUnit, UnitFailure, UnitResult, UnitSummary};
use crate::json_db::collections::CollectionsManager;
use crate::json_db::query::{Condition, QueryFilter};
use crate::utils::error::Context;
use crate::utils::{AppError, Result};

pub const ESG_METRICS: &str = "esg_metrics";

/// Enregistre toutes les unités compilées.
pub fn register_all(registry: &mut MigrationRegistry) -> Result<()> {
    registry.register(SplitReportingPeriod::new()?);
    Ok(())
}

/// `period: "2023-Q1"` devient `period: { year: 2023, quarter: 1 }`.
///
/// Le revert reconstruit la chaîne. Une période au format inattendu fait
/// échouer l'unité : le document reste tel quel et l'opérateur corrige la
/// donnée avant de relancer.
pub struct SplitReportingPeriod {
    id: MigrationId,
    pattern: Regex,
}

impl SplitReportingPeriod {
    pub const ID: &'static str = "20240115093000000";

    pub fn new() -> Result<Self> {
        Ok(Self {
            id: MigrationId::parse(Self::ID)?,
            pattern: Regex::new(r"^(\d{4})-Q([1-4])$").context("motif de période invalide")?,
        })
    }

    fn split(&self, doc: &mut Value) -> Result<bool> {
        let Some(raw) = doc.get("period").and_then(Value::as_str) else {
            return Ok(false);
        };
        let caps = self.pattern.captures(raw).ok_or_else(|| {
            AppError::Database(format!(
                "Période '{}' illisible dans le document {}",
                raw,
                doc.get("id").unwrap_or(&Value::Null)
            ))
        })?;
        let year: u32 = caps[1]
            .parse()
            .map_err(|e| AppError::Database(format!("Année illisible : {}", e)))?;
        let quarter: u32 = caps[2]
            .parse()
            .map_err(|e| AppError::Database(format!("Trimestre illisible : {}", e)))?;
        doc["period"] = json!({ "year": year, "quarter": quarter });
        Ok(true)
    }

    fn join(doc: &mut Value) -> Result<bool> {
        let (Some(year), Some(quarter)) = (
            doc.pointer("/period/year").and_then(Value::as_u64),
            doc.pointer("/period/quarter").and_then(Value::as_u64),
        ) else {
            return Ok(false);
        };
        doc["period"] = Value::String(format!("{}-Q{}", year, quarter));
        Ok(true)
    }
}

#[async_trait]
impl MigrationUnit for SplitReportingPeriod {
    fn id(&self) -> MigrationId {
        self.id
    }

    fn description(&self) -> &str {
        "split_reporting_period"
    }

    async fn apply(&self, db: &CollectionsManager<'_>) -> UnitResult {
        // Pas encore migré : une période présente, sans sous-champ `year`.
        let pending = QueryFilter::all(vec![
            Condition::exists("period"),
            Condition::missing("period.year"),
        ]);
        let modified = db
            .update_many(ESG_METRICS, &pending, |doc: &mut Value| self.split(doc))
            .await
            .map_err(UnitFailure::from)?;
        Ok(UnitSummary::new(modified))
    }

    async fn revert(&self, db: &CollectionsManager<'_>) -> UnitResult {
        let pending = QueryFilter::all(vec![Condition::exists("period.year")]);
        let modified = db
            .update_many(ESG_METRICS, &pending, Self::join)
            .await
            .map_err(UnitFailure::from)?;
        Ok(UnitSummary::new(modified))
    }
}
