// FICHIER : engine/tests/migrations_suite/runner_scenarios.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::{init_test_env, METRICS};
use strata::json_db::collections::CollectionsManager;
use strata::json_db::query::{Condition, QueryFilter};
use strata::migrations::{
    BatchReport, DeclarativeMigration, Direction, MigrationId, MigrationLedger, MigrationRegistry,
    MigrationRunner, MigrationStep, MigrationUnit, RunOptions, UnitDocument, UnitResult, UnitState, UnitSummary,
};
use strata::utils::prelude::*;

const ID_1: &str = "20240101000000000";
const ID_2: &str = "20240201000000000";
const ID_3: &str = "20240301000000000";

fn id(token: &str) -> MigrationId {
    MigrationId::parse(token).unwrap()
}

fn add_status_unit(token: &str) -> DeclarativeMigration {
    let document = UnitDocument {
        up: vec![MigrationStep::AddField {
            collection: METRICS.into(),
            field: "status".into(),
            default: json!("draft"),
        }],
        down: vec![MigrationStep::RemoveField {
            collection: METRICS.into(),
            field: "status".into(),
        }],
        ..UnitDocument::default()
    };
    DeclarativeMigration::new(id(token), "add_field", document).unwrap()
}

fn nest_unit(token: &str) -> DeclarativeMigration {
    let document = UnitDocument {
        notes: Some("seul le premier élément est remonté".into()),
        up: vec![MigrationStep::NestIntoArray {
            collection: METRICS.into(),
            fields: vec!["status".into(), "value".into()],
            array: "entries".into(),
        }],
        down: vec![MigrationStep::UnnestFromArray {
            collection: METRICS.into(),
            array: "entries".into(),
            fields: vec!["status".into(), "value".into()],
        }],
        ..UnitDocument::default()
    };
    DeclarativeMigration::new(id(token), "reshape_array", document).unwrap()
}

async fn seed(db: &CollectionsManager<'_>, n: usize) {
    for i in 0..n {
        db.insert_document(METRICS, json!({ "id": format!("m{:02}", i), "value": i }))
            .await
            .unwrap();
    }
}

/// Remplit `approval` ; tombe en panne après `fail_after` écritures si défini.
/// Chaque passe laisse son numéro dans le document.
struct FlakyApproval {
    fail_after: Arc<Mutex<Option<u64>>>,
    passes: AtomicU64,
}

#[async_trait]
impl MigrationUnit for FlakyApproval {
    fn id(&self) -> MigrationId {
        id(ID_2)
    }

    fn description(&self) -> &str {
        "flaky_approval"
    }

    async fn apply(&self, db: &CollectionsManager<'_>) -> UnitResult {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        let limit = *self.fail_after.lock().unwrap();
        let mut written = 0u64;
        let pending = QueryFilter::all(vec![Condition::missing("approval")]);
        let modified = db
            .update_many(METRICS, &pending, |doc: &mut Value| {
                if limit.is_some_and(|l| written >= l) {
                    return Err(AppError::Database("panne simulée".into()));
                }
                doc["approval"] = json!({ "status": "pending", "pass": pass });
                written += 1;
                Ok(true)
            })
            .await?;
        Ok(UnitSummary::new(modified))
    }

    async fn revert(&self, db: &CollectionsManager<'_>) -> UnitResult {
        let applied = QueryFilter::all(vec![Condition::exists("approval")]);
        let modified = db
            .update_many(METRICS, &applied, |doc: &mut Value| {
                Ok(doc.as_object_mut().and_then(|o| o.remove("approval")).is_some())
            })
            .await?;
        Ok(UnitSummary::new(modified))
    }
}

/// Écrit lui-même son entrée de registre puis la retire au retour arrière :
/// l'inscription faite ensuite par le runner échoue dans les deux sens.
struct SelfRecording;

#[async_trait]
impl MigrationUnit for SelfRecording {
    fn id(&self) -> MigrationId {
        id(ID_2)
    }

    fn description(&self) -> &str {
        "self_recording"
    }

    async fn apply(&self, db: &CollectionsManager<'_>) -> UnitResult {
        let pending = QueryFilter::all(vec![Condition::missing("audited")]);
        let modified = db
            .update_many(METRICS, &pending, |doc: &mut Value| {
                doc["audited"] = json!(true);
                Ok(true)
            })
            .await?;
        let summary = UnitSummary::new(modified);
        MigrationLedger::new(db)
            .record_applied(self.id(), self.description(), summary)
            .await?;
        Ok(summary)
    }

    async fn revert(&self, db: &CollectionsManager<'_>) -> UnitResult {
        MigrationLedger::new(db).record_reverted(self.id()).await?;
        Ok(UnitSummary::new(0))
    }
}

fn statuses(report: &BatchReport) -> Vec<(MigrationId, UnitState)> {
    report
        .outcomes
        .iter()
        .map(|o| (o.migration_id, o.status))
        .collect()
}

#[tokio::test]
async fn test_forward_applies_in_order_then_noop() {
    let env = init_test_env().await;
    let db = env.manager();
    seed(&db, 5).await;

    let registry = MigrationRegistry::new()
        .with(nest_unit(ID_2))
        .with(add_status_unit(ID_1));
    let runner = MigrationRunner::new(&db, registry).unwrap();

    let report = runner.run(Direction::Forward, RunOptions::default()).await.unwrap();
    assert_eq!(
        statuses(&report),
        vec![(id(ID_1), UnitState::Applied), (id(ID_2), UnitState::Applied)]
    );
    assert_eq!(runner.ledger().list_applied().await.unwrap(), vec![id(ID_1), id(ID_2)]);

    // L'unité 2 a vu la forme produite par l'unité 1.
    let doc = db.get_document(METRICS, "m03").await.unwrap().unwrap();
    assert_eq!(doc["entries"], json!([{ "status": "draft", "value": 3 }]));

    let again = runner.run(Direction::Forward, RunOptions::default()).await.unwrap();
    assert!(again.is_noop());
    assert!(again.outcomes.is_empty());
}

#[tokio::test]
async fn test_partial_failure_then_convergent_rerun() {
    let env = init_test_env().await;
    let db = env.manager();
    seed(&db, 10).await;

    let fail_after = Arc::new(Mutex::new(None));
    let registry = MigrationRegistry::new()
        .with(add_status_unit(ID_1))
        .with(FlakyApproval {
            fail_after: fail_after.clone(),
            passes: AtomicU64::new(0),
        });
    let runner = MigrationRunner::new(&db, registry).unwrap();

    // Registre à [1] avant l'incident.
    runner.run(Direction::Forward, RunOptions::limit(1)).await.unwrap();
    assert_eq!(runner.ledger().list_applied().await.unwrap(), vec![id(ID_1)]);

    *fail_after.lock().unwrap() = Some(3);
    let report = runner.run(Direction::Forward, RunOptions::default()).await.unwrap();
    let failed = report.failure().expect("le lot doit s'arrêter");
    assert_eq!(failed.migration_id, id(ID_2));
    assert_eq!(failed.status, UnitState::Failed);
    assert_eq!(failed.documents_modified, 3);
    assert!(failed.error.as_deref().unwrap_or_default().contains("panne simulée"));
    assert_eq!(runner.ledger().list_applied().await.unwrap(), vec![id(ID_1)]);

    match report.into_result() {
        Err(AppError::Execution {
            migration_id,
            documents_modified,
            ..
        }) => {
            assert_eq!(migration_id, ID_2);
            assert_eq!(documents_modified, 3);
        }
        other => panic!("Attendu ExecutionError, obtenu {:?}", other.map(|r| r.outcomes.len())),
    }

    // Relance : seuls les 7 documents restants sont touchés.
    *fail_after.lock().unwrap() = None;
    let report = runner.run(Direction::Forward, RunOptions::default()).await.unwrap();
    assert_eq!(statuses(&report), vec![(id(ID_2), UnitState::Applied)]);
    assert_eq!(report.outcomes[0].documents_modified, 7);
    assert_eq!(runner.ledger().list_applied().await.unwrap(), vec![id(ID_1), id(ID_2)]);

    let docs = db.list_all(METRICS).await.unwrap();
    let first_pass = docs.iter().filter(|d| d["approval"]["pass"] == 1).count();
    let second_pass = docs.iter().filter(|d| d["approval"]["pass"] == 2).count();
    assert_eq!((first_pass, second_pass), (3, 7));
}

#[tokio::test]
async fn test_apply_twice_is_idempotent() {
    let env = init_test_env().await;
    let db = env.manager();
    seed(&db, 6).await;

    let unit = add_status_unit(ID_1);
    assert_eq!(unit.apply(&db).await.unwrap().documents_modified, 6);
    let once = db.list_all(METRICS).await.unwrap();
    assert_eq!(unit.apply(&db).await.unwrap().documents_modified, 0);
    assert_eq!(db.list_all(METRICS).await.unwrap(), once);
}

#[tokio::test]
async fn test_apply_then_revert_restores_ledger() {
    let env = init_test_env().await;
    let db = env.manager();
    seed(&db, 3).await;

    let registry = MigrationRegistry::new()
        .with(add_status_unit(ID_1))
        .with(nest_unit(ID_2));
    let runner = MigrationRunner::new(&db, registry).unwrap();
    runner.run(Direction::Forward, RunOptions::default()).await.unwrap();

    let report = runner.run(Direction::Backward, RunOptions::limit(2)).await.unwrap();
    assert_eq!(
        statuses(&report),
        vec![(id(ID_2), UnitState::Reverted), (id(ID_1), UnitState::Reverted)]
    );
    assert!(runner.ledger().list_applied().await.unwrap().is_empty());

    let doc = db.get_document(METRICS, "m01").await.unwrap().unwrap();
    assert_eq!(doc, json!({ "id": "m01", "value": 1 }));
}

#[tokio::test]
async fn test_duplicate_ids_fail_discovery() {
    let env = init_test_env().await;
    let db = env.manager();
    let registry = MigrationRegistry::new()
        .with(add_status_unit(ID_1))
        .with(nest_unit(ID_1));
    assert!(matches!(
        MigrationRunner::new(&db, registry),
        Err(AppError::Config(_))
    ));
}

#[tokio::test]
async fn test_target_and_limit_bounds() {
    let env = init_test_env().await;
    let db = env.manager();
    seed(&db, 2).await;

    let third = DeclarativeMigration::new(
        id(ID_3),
        "tag_source",
        UnitDocument {
            up: vec![MigrationStep::AddField {
                collection: METRICS.into(),
                field: "source".into(),
                default: json!("import"),
            }],
            down: vec![MigrationStep::RemoveField {
                collection: METRICS.into(),
                field: "source".into(),
            }],
            ..UnitDocument::default()
        },
    )
    .unwrap();
    let registry = MigrationRegistry::new()
        .with(add_status_unit(ID_1))
        .with(nest_unit(ID_2))
        .with(third);
    let runner = MigrationRunner::new(&db, registry).unwrap();

    let unknown = runner
        .run(Direction::Forward, RunOptions::target(id("20991231000000000")))
        .await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));

    let report = runner.run(Direction::Forward, RunOptions::limit(1)).await.unwrap();
    assert_eq!(report.applied_ids(), vec![id(ID_1)]);

    let report = runner.run(Direction::Forward, RunOptions::target(id(ID_2))).await.unwrap();
    assert_eq!(report.applied_ids(), vec![id(ID_2)]);
    assert_eq!(runner.pending().await.unwrap().len(), 1);

    runner.run(Direction::Forward, RunOptions::default()).await.unwrap();

    let not_applied = runner
        .run(Direction::Backward, RunOptions::target(id("20240115000000000")))
        .await;
    assert!(matches!(not_applied, Err(AppError::NotFound(_))));

    let report = runner.run(Direction::Backward, RunOptions::target(id(ID_2))).await.unwrap();
    assert_eq!(report.applied_ids(), vec![id(ID_3), id(ID_2)]);
    assert_eq!(runner.ledger().list_applied().await.unwrap(), vec![id(ID_1)]);

    let status = runner.status().await.unwrap();
    assert_eq!(status.applied().count(), 1);
    assert_eq!(status.pending().count(), 2);
    assert_eq!(
        status.units[1].revert_notes.as_deref(),
        Some("seul le premier élément est remonté")
    );
}

#[tokio::test]
async fn test_backward_revert_failure_halts() {
    let env = init_test_env().await;
    let db = env.manager();
    db.insert_document(METRICS, json!({ "id": "bad", "entries": "pas un tableau" }))
        .await
        .unwrap();

    let registry = MigrationRegistry::new()
        .with(add_status_unit(ID_1))
        .with(nest_unit(ID_2));
    let runner = MigrationRunner::new(&db, registry).unwrap();
    runner.run(Direction::Forward, RunOptions::default()).await.unwrap();

    let report = runner.run(Direction::Backward, RunOptions::limit(2)).await.unwrap();
    assert_eq!(statuses(&report), vec![(id(ID_2), UnitState::Failed)]);
    assert_eq!(runner.ledger().list_applied().await.unwrap(), vec![id(ID_1), id(ID_2)]);
}

#[tokio::test]
async fn test_ledger_write_failure_halts_batch() {
    let env = init_test_env().await;
    let db = env.manager();
    seed(&db, 3).await;

    let registry = MigrationRegistry::new()
        .with(add_status_unit(ID_1))
        .with(SelfRecording)
        .with(nest_unit(ID_3));
    let runner = MigrationRunner::new(&db, registry).unwrap();

    let report = runner.run(Direction::Forward, RunOptions::default()).await.unwrap();
    assert_eq!(
        statuses(&report),
        vec![(id(ID_1), UnitState::Applied), (id(ID_2), UnitState::Failed)]
    );
    let failed = report.failure().unwrap();
    assert_eq!(failed.documents_modified, 3);
    assert!(failed.error.as_deref().unwrap().contains("registre"));
    // L'unité 3 n'a pas été tentée.
    let doc = db.get_document(METRICS, "m00").await.unwrap().unwrap();
    assert!(doc.get("entries").is_none());
    assert!(matches!(report.into_result(), Err(AppError::Execution { .. })));

    let report = runner.run(Direction::Backward, RunOptions::default()).await.unwrap();
    assert_eq!(statuses(&report), vec![(id(ID_2), UnitState::Failed)]);
    assert!(report.failure().unwrap().error.is_some());
    assert_eq!(runner.ledger().list_applied().await.unwrap(), vec![id(ID_1)]);
}
