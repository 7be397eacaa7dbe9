use clap::{Parser, Subcommand};

mod commands;

use strata::{
    user_error,
    utils::{context, io::PathBuf, prelude::*},
};

#[derive(Parser, Debug)]
#[command(name = "strata-cli")]
#[command(about = "Migrations de schéma versionnées pour la base documentaire Strata", long_about = None)]
#[command(version)]
struct Cli {
    /// Fichier de configuration JSON (défaut : ./strata.json s'il existe)
    #[arg(long, global = true, env = "STRATA_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    target: commands::TargetArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Applique les migrations en attente
    Up(commands::migrate::RunArgs),

    /// Défait les dernières migrations appliquées
    Down(commands::migrate::RunArgs),

    /// Liste les migrations appliquées et en attente
    Status(commands::migrate::StatusArgs),

    /// Crée un squelette d'unité horodaté
    Create(commands::migrate::CreateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Configuration (fichier, environnement, puis options de la ligne de commande)
    let config = match cli.target.resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ CRITICAL ERROR: Impossible de charger la configuration.");
            eprintln!("   Détails : {}", e);
            std::process::exit(1);
        }
    };

    // 2. Logger
    context::init_logging(&config.logging);
    tracing::debug!(
        "Base {}/{} sous {:?}, unités dans {:?}",
        config.space,
        config.db,
        config.data_root,
        config.migrations_dir
    );

    // 3. Dispatch
    if let Err(e) = execute_command(cli.command, &config).await {
        user_error!(component = "strata-cli", "{}", e);
        std::process::exit(1);
    }

    tracing::debug!("Fin de l'exécution du CLI");
    Ok(())
}

async fn execute_command(cmd: Commands, config: &AppConfig) -> Result<()> {
    use strata::migrations::Direction;

    match cmd {
        Commands::Up(args) => commands::migrate::run(config, Direction::Forward, args).await,
        Commands::Down(args) => commands::migrate::run(config, Direction::Backward, args).await,
        Commands::Status(args) => commands::migrate::status(config, args).await,
        Commands::Create(args) => commands::migrate::create(config, args).await,
    }
}
