// FICHIER : engine/tests/migrations_suite/generator_scenarios.rs

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::init_test_env;
use strata::migrations::{
    Direction, FixedClock, MigrationGenerator, MigrationRegistry, MigrationRunner, RunOptions,
    UnitState,
};
use strata::utils::prelude::*;

fn generator_at(env: &crate::TestEnv, millis: i64) -> MigrationGenerator {
    let instant = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
        + chrono::Duration::milliseconds(millis);
    MigrationGenerator::from_config(&env.config)
        .unwrap()
        .with_clock(Arc::new(FixedClock(instant)))
}

#[tokio::test]
async fn test_same_window_collision_is_io_error() {
    let env = init_test_env().await;
    let generator = generator_at(&env, 0);

    let first = generator.create("Add Approval Fields!").await.unwrap();
    assert_eq!(
        first.file_name().unwrap().to_str().unwrap(),
        "20240201120000000_add_approval_fields.json"
    );
    let original = std::fs::read_to_string(&first).unwrap();

    let err = generator.create("Add Approval Fields!").await.unwrap_err();
    assert!(matches!(err, AppError::Io(_)));
    assert!(err.is_already_exists());
    assert_eq!(std::fs::read_to_string(&first).unwrap(), original);
}

#[tokio::test]
async fn test_empty_description_is_validation_error() {
    let env = init_test_env().await;
    let generator = generator_at(&env, 0);
    for raw in ["", "   ", "!!!", "--__--"] {
        assert!(matches!(
            generator.create(raw).await,
            Err(AppError::Validation(_))
        ));
    }
    assert!(!env.config.migrations_dir.exists());
}

#[tokio::test]
async fn test_ids_stay_monotonic() {
    let env = init_test_env().await;

    let later = generator_at(&env, 500).create("later").await.unwrap();
    // Horloge en retard : l'identifiant est porté au-delà du dernier.
    let earlier = generator_at(&env, 0).create("earlier").await.unwrap();
    assert!(later.ends_with("20240201120000500_later.json"));
    assert!(earlier.ends_with("20240201120000501_earlier.json"));
}

#[tokio::test]
async fn test_generated_skeleton_is_runnable() {
    let env = init_test_env().await;
    generator_at(&env, 0).create("Add Approval Fields!").await.unwrap();

    let mut registry = MigrationRegistry::new();
    assert_eq!(registry.load_dir(&env.config.migrations_dir).await.unwrap(), 1);

    let db = env.manager();
    let runner = MigrationRunner::new(&db, registry).unwrap();
    let report = runner.run(Direction::Forward, RunOptions::default()).await.unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].status, UnitState::Applied);
    assert_eq!(report.outcomes[0].description, "add_approval_fields");
    assert_eq!(report.outcomes[0].documents_modified, 0);
}
