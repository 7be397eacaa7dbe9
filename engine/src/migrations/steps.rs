// FICHIER : engine/src/migrations/steps.rs

//! Catalogue des étapes déclaratives.
//!
//! Chaque étape de réécriture porte son propre filtre « pas encore migré »
//! (`pending_filter`) : `update_many` ne sélectionne que les documents qui ne
//! sont pas déjà dans la forme cible, ce qui rend l'étape rejouable.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::unit::UnitFailure;
use crate::json_db::collections::CollectionsManager;
use crate::json_db::indexes::IndexType;
use crate::json_db::query::{Condition, QueryFilter};
use crate::utils::json::{get_path, get_path_mut, remove_path, set_path};
use crate::utils::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum MigrationStep {
    CreateIndex {
        collection: String,
        field: String,
        #[serde(default)]
        kind: IndexType,
        #[serde(default)]
        unique: bool,
    },
    DropIndex {
        collection: String,
        field: String,
    },
    AddField {
        collection: String,
        field: String,
        #[serde(default)]
        default: Value,
    },
    RemoveField {
        collection: String,
        field: String,
    },
    RenameField {
        collection: String,
        from: String,
        to: String,
    },
    /// Le filtre est obligatoire : c'est le prédicat fourni par l'auteur.
    SetFields {
        collection: String,
        filter: QueryFilter,
        #[serde(default)]
        set: Map<String, Value>,
        #[serde(default)]
        unset: Vec<String>,
    },
    AddArrayItemField {
        collection: String,
        array: String,
        field: String,
        #[serde(default)]
        default: Value,
    },
    RemoveArrayItemField {
        collection: String,
        array: String,
        field: String,
    },
    /// Déplace des champs de premier niveau dans un tableau d'un seul objet.
    NestIntoArray {
        collection: String,
        fields: Vec<String>,
        array: String,
    },
    /// Inverse de `NestIntoArray`. Seul le premier élément est remonté.
    UnnestFromArray {
        collection: String,
        array: String,
        fields: Vec<String>,
    },
}

fn non_empty(label: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("'{}' ne peut pas être vide", label)));
    }
    Ok(())
}

fn shape_error(op: &str, detail: String) -> AppError {
    AppError::Database(format!("{} : {}", op, detail))
}

impl MigrationStep {
    pub fn collection(&self) -> &str {
        match self {
            Self::CreateIndex { collection, .. }
            | Self::DropIndex { collection, .. }
            | Self::AddField { collection, .. }
            | Self::RemoveField { collection, .. }
            | Self::RenameField { collection, .. }
            | Self::SetFields { collection, .. }
            | Self::AddArrayItemField { collection, .. }
            | Self::RemoveArrayItemField { collection, .. }
            | Self::NestIntoArray { collection, .. }
            | Self::UnnestFromArray { collection, .. } => collection,
        }
    }

    /// Libellé court pour les logs.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateIndex { field, kind, .. } => format!("createIndex({:?}) {}", kind, field),
            Self::DropIndex { field, .. } => format!("dropIndex {}", field),
            Self::AddField { field, .. } => format!("addField {}", field),
            Self::RemoveField { field, .. } => format!("removeField {}", field),
            Self::RenameField { from, to, .. } => format!("renameField {} -> {}", from, to),
            Self::SetFields { set, unset, .. } => {
                format!("setFields ({} set, {} unset)", set.len(), unset.len())
            }
            Self::AddArrayItemField { array, field, .. } => {
                format!("addArrayItemField {}[].{}", array, field)
            }
            Self::RemoveArrayItemField { array, field, .. } => {
                format!("removeArrayItemField {}[].{}", array, field)
            }
            Self::NestIntoArray { fields, array, .. } => {
                format!("nestIntoArray {:?} -> {}", fields, array)
            }
            Self::UnnestFromArray { array, fields, .. } => {
                format!("unnestFromArray {} -> {:?}", array, fields)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        non_empty("collection", self.collection())?;
        match self {
            Self::CreateIndex { field, .. }
            | Self::DropIndex { field, .. }
            | Self::AddField { field, .. }
            | Self::RemoveField { field, .. } => non_empty("field", field),
            Self::RenameField { from, to, .. } => {
                non_empty("from", from)?;
                non_empty("to", to)?;
                if from == to {
                    return Err(AppError::Validation(format!(
                        "renameField : '{}' renommé en lui-même",
                        from
                    )));
                }
                Ok(())
            }
            Self::SetFields {
                filter, set, unset, ..
            } => {
                if filter.conditions.is_empty() {
                    return Err(AppError::Validation(
                        "setFields exige un filtre « pas encore migré » non vide".to_string(),
                    ));
                }
                if set.is_empty() && unset.is_empty() {
                    return Err(AppError::Validation(
                        "setFields sans 'set' ni 'unset'".to_string(),
                    ));
                }
                filter.validate()
            }
            Self::AddArrayItemField { array, field, .. }
            | Self::RemoveArrayItemField { array, field, .. } => {
                non_empty("array", array)?;
                non_empty("field", field)
            }
            Self::NestIntoArray { fields, array, .. }
            | Self::UnnestFromArray { array, fields, .. } => {
                non_empty("array", array)?;
                if fields.is_empty() {
                    return Err(AppError::Validation("'fields' ne peut pas être vide".to_string()));
                }
                fields.iter().try_for_each(|f| non_empty("fields[]", f))
            }
        }
    }

    /// Prédicat « pas encore migré ». `None` pour les étapes d'index.
    pub fn pending_filter(&self) -> Option<QueryFilter> {
        let filter = match self {
            Self::CreateIndex { .. } | Self::DropIndex { .. } => return None,
            Self::AddField { field, .. } => QueryFilter::all(vec![Condition::missing(field)]),
            Self::RemoveField { field, .. } => QueryFilter::all(vec![Condition::exists(field)]),
            Self::RenameField { from, to, .. } => {
                QueryFilter::all(vec![Condition::exists(from), Condition::missing(to)])
            }
            Self::SetFields { filter, .. } => filter.clone(),
            Self::AddArrayItemField { array, field, .. } => QueryFilter::all(vec![
                Condition::elem_match(array, QueryFilter::all(vec![Condition::missing(field)])),
            ]),
            Self::RemoveArrayItemField { array, field, .. } => QueryFilter::all(vec![
                Condition::elem_match(array, QueryFilter::all(vec![Condition::exists(field)])),
            ]),
            Self::NestIntoArray { fields, array, .. } => {
                QueryFilter::all(vec![Condition::missing(array)]).with_group(QueryFilter::any(
                    fields.iter().map(|f| Condition::exists(f)).collect(),
                ))
            }
            Self::UnnestFromArray { array, .. } => QueryFilter::all(vec![Condition::exists(array)]),
        };
        Some(filter)
    }

    /// Réécrit un document sélectionné. `Ok(false)` : rien à changer.
    pub fn transform(&self, doc: &mut Value) -> Result<bool> {
        match self {
            Self::CreateIndex { .. } | Self::DropIndex { .. } => Ok(false),

            Self::AddField { field, default, .. } => {
                if set_path(doc, field, default.clone()) {
                    Ok(true)
                } else {
                    Err(shape_error("addField", format!("'{}' n'est pas sous un objet", field)))
                }
            }

            Self::RemoveField { field, .. } => Ok(remove_path(doc, field).is_some()),

            Self::RenameField { from, to, .. } => {
                let Some(value) = remove_path(doc, from) else {
                    return Ok(false);
                };
                if set_path(doc, to, value) {
                    Ok(true)
                } else {
                    Err(shape_error("renameField", format!("'{}' n'est pas sous un objet", to)))
                }
            }

            Self::SetFields { set, unset, .. } => {
                for (path, value) in set {
                    if !set_path(doc, path, value.clone()) {
                        return Err(shape_error(
                            "setFields",
                            format!("'{}' n'est pas sous un objet", path),
                        ));
                    }
                }
                for path in unset {
                    remove_path(doc, path);
                }
                Ok(true)
            }

            Self::AddArrayItemField {
                array,
                field,
                default,
                ..
            } => {
                let items = array_items(doc, array, "addArrayItemField")?;
                let mut changed = false;
                for item in items.iter_mut() {
                    if !item.is_object() {
                        return Err(shape_error(
                            "addArrayItemField",
                            format!("élément non objet dans '{}'", array),
                        ));
                    }
                    if get_path(item, field).is_none() {
                        changed |= set_path(item, field, default.clone());
                    }
                }
                Ok(changed)
            }

            Self::RemoveArrayItemField { array, field, .. } => {
                let items = array_items(doc, array, "removeArrayItemField")?;
                let mut changed = false;
                for item in items.iter_mut() {
                    changed |= remove_path(item, field).is_some();
                }
                Ok(changed)
            }

            Self::NestIntoArray { fields, array, .. } => {
                let mut nested = Map::new();
                for field in fields {
                    if let Some(value) = remove_path(doc, field) {
                        nested.insert(field.clone(), value);
                    }
                }
                if nested.is_empty() {
                    return Ok(false);
                }
                if set_path(doc, array, Value::Array(vec![Value::Object(nested)])) {
                    Ok(true)
                } else {
                    Err(shape_error("nestIntoArray", format!("'{}' n'est pas sous un objet", array)))
                }
            }

            Self::UnnestFromArray { array, fields, .. } => {
                let Some(removed) = remove_path(doc, array) else {
                    return Ok(false);
                };
                let first = match removed {
                    Value::Array(items) => items.into_iter().next(),
                    other => {
                        return Err(shape_error(
                            "unnestFromArray",
                            format!("'{}' n'est pas un tableau ({})", array, other),
                        ))
                    }
                };
                if let Some(Value::Object(mut item)) = first {
                    for field in fields {
                        if let Some(value) = item.remove(field) {
                            set_path(doc, field, value);
                        }
                    }
                }
                Ok(true)
            }
        }
    }

    /// Exécute l'étape. Renvoie le nombre de documents réécrits.
    pub async fn execute(&self, db: &CollectionsManager<'_>) -> std::result::Result<u64, UnitFailure> {
        match self {
            Self::CreateIndex {
                collection,
                field,
                kind,
                unique,
            } => {
                db.create_index(collection, field, *kind, *unique).await?;
                Ok(0)
            }
            Self::DropIndex { collection, field } => {
                db.drop_index(collection, field).await?;
                Ok(0)
            }
            _ => {
                let Some(filter) = self.pending_filter() else {
                    return Ok(0);
                };
                let modified = db
                    .update_many(self.collection(), &filter, |doc: &mut Value| {
                        self.transform(doc)
                    })
                    .await?;
                Ok(modified)
            }
        }
    }
}

fn array_items<'a>(doc: &'a mut Value, array: &str, op: &str) -> Result<&'a mut Vec<Value>> {
    match get_path_mut(doc, array) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(shape_error(op, format!("'{}' n'est pas un tableau", array))),
    }
}
