// FICHIER : engine/tests/migrations_suite/declarative_units.rs

use std::path::PathBuf;

use crate::{init_test_env, METRICS};
use strata::json_db::collections::CollectionsManager;
use strata::migrations::builtin::SplitReportingPeriod;
use strata::migrations::{
    load_registry, Direction, MigrationId, MigrationRunner, RunOptions, UnitState,
};
use strata::utils::prelude::*;

fn shipped_migrations() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

fn legacy_doc(i: usize) -> Value {
    let kind = if i % 2 == 0 { "scope1" } else { "scope2" };
    let amount = 10 * i;
    json!({
        "id": format!("metric-{}", i),
        "kind": kind,
        "reportedAt": format!("2023-0{}-15", i + 1),
        "period": format!("2023-Q{}", i + 1),
        "readingList": [ { "amount": amount }, { "amount": amount + 1 } ],
        "target": 100,
        "baseline": 80
    })
}

async fn seed(db: &CollectionsManager<'_>) -> Vec<Value> {
    let mut docs = Vec::new();
    for i in 0..4 {
        docs.push(db.insert_document(METRICS, legacy_doc(i)).await.unwrap());
    }
    docs
}

#[tokio::test]
async fn test_shipped_units_forward_and_back() {
    let env = init_test_env().await;
    let db = env.manager();
    let originals = seed(&db).await;

    let registry = load_registry(&shipped_migrations()).await.unwrap();
    assert_eq!(registry.len(), 5);
    let runner = MigrationRunner::new(&db, registry).unwrap();

    let ids: Vec<String> = runner.units().map(|u| u.id().to_string()).collect();
    assert_eq!(ids[1], SplitReportingPeriod::ID);

    let report = runner.run(Direction::Forward, RunOptions::default()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.outcomes.len(), 5);
    assert!(report.outcomes.iter().all(|o| o.status == UnitState::Applied));

    let doc = db.get_document(METRICS, "metric-2").await.unwrap().unwrap();
    assert_eq!(doc["period"], json!({ "year": 2023, "quarter": 3 }));
    assert_eq!(doc["approval"], json!({ "status": "pending", "reviewedBy": null }));
    assert_eq!(doc["readings"][1], json!({ "amount": 21, "unit": "tCO2e" }));
    assert!(doc.get("readingList").is_none());
    assert_eq!(doc["targets"], json!([{ "target": 100, "baseline": 80 }]));

    let pending = db
        .find(
            METRICS,
            &strata::json_db::query::QueryFilter::all(vec![
                strata::json_db::query::Condition::eq("approval.status", json!("pending")),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(pending.len(), 4);

    assert!(runner
        .run(Direction::Forward, RunOptions::default())
        .await
        .unwrap()
        .is_noop());

    let first = MigrationId::parse("20240110080000000").unwrap();
    let back = runner
        .run(Direction::Backward, RunOptions::target(first))
        .await
        .unwrap();
    assert!(back.is_success());
    assert_eq!(back.outcomes.len(), 5);
    assert_eq!(back.outcomes.last().map(|o| o.migration_id), Some(first));
    assert!(runner.ledger().list_applied().await.unwrap().is_empty());

    for original in originals {
        let id = original["id"].as_str().unwrap();
        let restored = db.get_document(METRICS, id).await.unwrap().unwrap();
        assert_eq!(restored, original);
    }
    assert!(db.list_indexes(METRICS).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_shipped_units_document_lossy_reverts() {
    let env = init_test_env().await;
    let db = env.manager();
    let registry = load_registry(&shipped_migrations()).await.unwrap();
    let runner = MigrationRunner::new(&db, registry).unwrap();

    let status = runner.status().await.unwrap();
    let nest = status
        .units
        .iter()
        .find(|l| l.description == "nest_metric_targets")
        .unwrap();
    assert!(nest.revert_notes.as_deref().unwrap().contains("perte"));
    assert_eq!(status.pending().count(), 5);
}
