// FICHIER : engine/tests/migrations_suite/ledger_ops.rs

use crate::init_test_env;
use strata::json_db::indexes::IndexType;
use strata::migrations::{MigrationId, MigrationLedger, UnitSummary};
use strata::utils::prelude::*;

fn id(token: &str) -> MigrationId {
    MigrationId::parse(token).unwrap()
}

#[tokio::test]
async fn test_ledger_lives_in_migrated_db() {
    let env = init_test_env().await;
    let db = env.manager();
    let ledger = MigrationLedger::with_collection(&db, &env.config.ledger_collection);
    ledger.init().await.unwrap();

    assert!(db
        .list_collections()
        .await
        .unwrap()
        .contains(&env.config.ledger_collection));

    let indexes = db.list_indexes(ledger.collection()).await.unwrap();
    let index = indexes
        .iter()
        .find(|i| i.field_path == "migrationId")
        .expect("index sur migrationId");
    assert!(index.unique);
    assert_eq!(index.index_type, IndexType::Hash);
}

#[tokio::test]
async fn test_list_applied_is_ascending() {
    let env = init_test_env().await;
    let db = env.manager();
    let ledger = MigrationLedger::new(&db);
    ledger.init().await.unwrap();

    for token in ["20240301000000000", "20240101000000000", "20240201000000000"] {
        ledger
            .record_applied(id(token), "unit", UnitSummary::new(1))
            .await
            .unwrap();
    }
    assert_eq!(
        ledger.list_applied().await.unwrap(),
        vec![
            id("20240101000000000"),
            id("20240201000000000"),
            id("20240301000000000")
        ]
    );
}

#[tokio::test]
async fn test_conflict_and_not_found() {
    let env = init_test_env().await;
    let db = env.manager();
    let ledger = MigrationLedger::new(&db);
    ledger.init().await.unwrap();

    ledger
        .record_applied(id("20240101000000000"), "unit", UnitSummary::default())
        .await
        .unwrap();
    let err = ledger
        .record_applied(id("20240101000000000"), "unit", UnitSummary::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    ledger.record_reverted(id("20240101000000000")).await.unwrap();
    let err = ledger
        .record_reverted(id("20240101000000000"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_corrupt_entry_is_reported() {
    let env = init_test_env().await;
    let db = env.manager();
    let ledger = MigrationLedger::new(&db);
    ledger.init().await.unwrap();

    db.insert_document(ledger.collection(), json!({ "id": "x", "migrationId": "oops" }))
        .await
        .unwrap();
    assert!(matches!(
        ledger.list_applied().await,
        Err(AppError::Database(_))
    ));
}
