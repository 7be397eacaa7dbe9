//! Filtres de sélection de documents.
//!
//! Les migrations expriment leur prédicat « pas encore migré » avec ces filtres,
//! typiquement `Condition::missing("approval")`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::{AppError, Result};

pub mod filter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    #[serde(default)]
    pub operator: FilterOperator,
    pub conditions: Vec<Condition>,
    /// Sous-filtres combinés avec le même opérateur que les conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<QueryFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    #[default]
    And,
    Or,
    /// Aucune des conditions ne doit être vraie.
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Chemin pointé (`approval.status`).
    pub field: String,
    pub operator: ComparisonOperator,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Contains,
    /// `value` booléen (vrai par défaut) : présence du champ.
    Exists,
    /// `value` est un `QueryFilter` appliqué à chaque élément du tableau.
    ElemMatch,
}

impl Condition {
    pub fn new(field: &str, operator: ComparisonOperator, value: Value) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value,
        }
    }

    pub fn eq(field: &str, value: Value) -> Self {
        Self::new(field, ComparisonOperator::Eq, value)
    }

    pub fn ne(field: &str, value: Value) -> Self {
        Self::new(field, ComparisonOperator::Ne, value)
    }

    pub fn exists(field: &str) -> Self {
        Self::new(field, ComparisonOperator::Exists, Value::Bool(true))
    }

    pub fn missing(field: &str) -> Self {
        Self::new(field, ComparisonOperator::Exists, Value::Bool(false))
    }

    /// Vrai si au moins un élément du tableau `field` satisfait `filter`.
    pub fn elem_match(field: &str, filter: QueryFilter) -> Self {
        let value = serde_json::to_value(filter).unwrap_or(Value::Null);
        Self::new(field, ComparisonOperator::ElemMatch, value)
    }
}

impl QueryFilter {
    pub fn new(operator: FilterOperator, conditions: Vec<Condition>) -> Self {
        Self {
            operator,
            conditions,
            groups: Vec::new(),
        }
    }

    /// Ajoute un sous-filtre (`a ET (b OU c)`).
    pub fn with_group(mut self, group: QueryFilter) -> Self {
        self.groups.push(group);
        self
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        Self::new(FilterOperator::And, conditions)
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Self::new(FilterOperator::Or, conditions)
    }

    pub fn none(conditions: Vec<Condition>) -> Self {
        Self::new(FilterOperator::Not, conditions)
    }

    /// Filtre vide : sélectionne tout.
    pub fn match_all() -> Self {
        Self::all(Vec::new())
    }

    /// Vérifie la cohérence des opérandes (tableaux pour `in`, sous-filtres valides).
    pub fn validate(&self) -> Result<()> {
        for cond in &self.conditions {
            if cond.field.trim().is_empty() {
                return Err(AppError::Validation(
                    "Condition sans champ dans un filtre".to_string(),
                ));
            }
            match cond.operator {
                ComparisonOperator::In if !cond.value.is_array() => {
                    return Err(AppError::Validation(format!(
                        "L'opérateur 'in' sur '{}' attend un tableau",
                        cond.field
                    )));
                }
                ComparisonOperator::Exists if !(cond.value.is_boolean() || cond.value.is_null()) => {
                    return Err(AppError::Validation(format!(
                        "L'opérateur 'exists' sur '{}' attend un booléen",
                        cond.field
                    )));
                }
                ComparisonOperator::ElemMatch => {
                    let nested: QueryFilter = serde_json::from_value(cond.value.clone())
                        .map_err(|e| {
                            AppError::Validation(format!(
                                "Sous-filtre 'elemMatch' invalide sur '{}' : {}",
                                cond.field, e
                            ))
                        })?;
                    nested.validate()?;
                }
                _ => {}
            }
        }
        self.groups.iter().try_for_each(QueryFilter::validate)
    }

    pub fn matches(&self, doc: &Value) -> bool {
        filter::evaluate(doc, self)
    }
}
