use clap::Args;

use strata::json_db::collections::CollectionsManager;
use strata::json_db::storage::StorageEngine;
use strata::migrations::{
    load_registry, BatchReport, Direction, MigrationGenerator, MigrationId, MigrationRunner,
    RunOptions, StatusReport, UnitState,
};
use strata::{
    user_info, user_success,
    utils::{data, prelude::*},
};

// --- DÉFINITION DES ARGUMENTS ---

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Nombre maximal d'unités à traiter
    #[arg(long)]
    pub limit: Option<usize>,

    /// Identifiant cible (17 chiffres)
    #[arg(long)]
    pub target: Option<String>,

    /// Rapport JSON sur la sortie standard
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct StatusArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Description libre, normalisée en `[a-z0-9_]`
    #[arg(required = true, num_args = 1..)]
    pub words: Vec<String>,
}

impl CreateArgs {
    pub fn description(&self) -> String {
        self.words.join(" ")
    }
}

// --- HANDLERS ---

pub async fn run(config: &AppConfig, direction: Direction, args: RunArgs) -> Result<()> {
    let options = RunOptions {
        limit: args.limit,
        target: args.target.as_deref().map(MigrationId::parse).transpose()?,
    };

    let storage = StorageEngine::new(config.db_config());
    let db = CollectionsManager::new(&storage, &config.space, &config.db);
    let registry = load_registry(&config.migrations_dir).await?;
    let runner =
        MigrationRunner::new(&db, registry)?.with_ledger_collection(&config.ledger_collection);

    let report = runner.run(direction, options).await?;
    if args.json {
        println!("{}", data::stringify_pretty(&report)?);
    } else {
        print_report(&report);
    }
    // Un lot interrompu sort en erreur (code de retour non nul).
    report.into_result().map(|_| ())
}

pub async fn status(config: &AppConfig, args: StatusArgs) -> Result<()> {
    let storage = StorageEngine::new(config.db_config());
    let db = CollectionsManager::new(&storage, &config.space, &config.db);
    let registry = load_registry(&config.migrations_dir).await?;
    let runner =
        MigrationRunner::new(&db, registry)?.with_ledger_collection(&config.ledger_collection);

    let report = runner.status().await?;
    if args.json {
        println!("{}", data::stringify_pretty(&report)?);
    } else {
        print_status(&report);
    }
    Ok(())
}

pub async fn create(config: &AppConfig, args: CreateArgs) -> Result<()> {
    let generator = MigrationGenerator::from_config(config)?;
    let path = generator.create(&args.description()).await?;
    user_success!("Unité créée : {}", path.display());
    Ok(())
}

// --- AFFICHAGE ---

fn print_report(report: &BatchReport) {
    if report.is_noop() {
        user_info!("Aucune migration à exécuter ({})", report.direction);
        return;
    }
    for outcome in &report.outcomes {
        let icon = match outcome.status {
            UnitState::Failed => "❌",
            _ => "✅",
        };
        println!(
            "{} {}_{} : {:?}, {} document(s), {} ms",
            icon,
            outcome.migration_id,
            outcome.description,
            outcome.status,
            outcome.documents_modified,
            outcome.duration_ms
        );
        if let Some(error) = &outcome.error {
            println!("   -> {}", error);
        }
    }
    if report.is_success() {
        user_success!("{}", report.summary());
    }
}

fn print_status(report: &StatusReport) {
    if report.units.is_empty() && report.orphans.is_empty() {
        user_info!("Aucune unité de migration découverte");
        return;
    }
    for line in &report.units {
        let when = line
            .applied_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {}_{}  {}",
            format!("{:?}", line.status).to_uppercase(),
            line.migration_id,
            line.description,
            when
        );
    }
    for orphan in &report.orphans {
        println!("{:<10} {}  (aucune unité correspondante)", "ORPHAN", orphan);
    }
    user_info!(
        "{} appliquée(s), {} en attente",
        report.applied().count(),
        report.pending().count()
    );
}
