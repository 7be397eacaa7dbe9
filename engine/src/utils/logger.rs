// FICHIER : engine/src/utils/logger.rs

use crate::utils::config::LoggingConfig;
use std::sync::Once;
use tracing_appender::rolling;
use tracing_subscriber::{
    filter::filter_fn, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

pub const LOG_FILE_NAME: &str = "strata.log";

// Sécurité pour éviter la double initialisation (crash fréquent en tests)
static INIT: Once = Once::new();

/// Installe le subscriber global : console compacte + fichier JSON tournant optionnel.
/// Les appels suivants sont ignorés.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        // =========================================================================
        // LAYER 1 : FICHIER (JSON, rotation quotidienne)
        // =========================================================================
        let file_layer = config.dir.as_ref().map(|log_dir| {
            std::fs::create_dir_all(log_dir).ok();
            fmt::layer()
                .json()
                .with_writer(rolling::daily(log_dir, LOG_FILE_NAME))
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
        });

        // =========================================================================
        // LAYER 2 : CONSOLE (Pour l'opérateur)
        // =========================================================================
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

        // Les macros user_* affichent déjà leur message : pas de doublon console
        let anti_double_filter =
            filter_fn(|metadata| !metadata.fields().iter().any(|f| f.name() == "event"));

        let console_layer = fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .with_filter(anti_double_filter);

        let registry = tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer);

        if registry.try_init().is_err() {
            tracing::warn!("⚠️ [Logger] Subscriber global déjà actif, ré-initialisation ignorée.");
            return;
        }

        match &config.dir {
            Some(dir) => tracing::info!("🚀 Logger initialisé. Logs disponibles dans : {:?}", dir),
            None => tracing::debug!("Logger initialisé (console seule)"),
        }
    });
}
