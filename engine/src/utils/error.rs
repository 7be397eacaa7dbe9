use serde::Serialize;
use std::io;

// --- RE-EXPORTS ANYHOW (contexte ad hoc, converti en AppError::System) ---
pub use anyhow::Context;

// --- GESTION D'ERREUR STRICTE ---

/// Type de résultat standard du moteur de migrations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Enumération centrale des erreurs.
///
/// Les six familles du moteur de migration (validation, configuration, conflit,
/// introuvable, exécution, E/S) sont des variantes de premier niveau pour que
/// l'appelant puisse les distinguer par `match`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Description ou nom invalide (Générateur).
    #[error("Erreur de validation : {0}")]
    Validation(String),

    /// Identifiants dupliqués ou malformés, fichier d'unité illisible, variable mal typée.
    #[error("Erreur de configuration : {0}")]
    Config(String),

    /// Le registre possède déjà une entrée pour cet identifiant.
    #[error("Conflit : {0}")]
    Conflict(String),

    #[error("Introuvable : {0}")]
    NotFound(String),

    /// Une transformation a échoué en cours de lot.
    #[error(
        "Échec de la migration {migration_id} ({documents_modified} document(s) modifié(s) avant l'échec) : {cause}"
    )]
    Execution {
        migration_id: String,
        documents_modified: u64,
        cause: String,
    },

    #[error("Erreur d'entrée/sortie : {0}")]
    Io(#[from] io::Error),

    #[error("Erreur Base de Données : {0}")]
    Database(String),

    #[error("Erreur de sérialisation : {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Erreur de template : {0}")]
    Template(#[from] tera::Error),

    #[error("Erreur Système : {0}")]
    System(#[from] anyhow::Error),
}

impl AppError {
    /// Vrai pour une collision de fichier (création exclusive refusée).
    pub fn is_already_exists(&self) -> bool {
        matches!(self, AppError::Io(e) if e.kind() == io::ErrorKind::AlreadyExists)
    }
}

// Les rapports de lot embarquent les erreurs : on les sérialise en simple chaîne.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

// Permet de faire : return Err("Mon erreur".into());
impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::System(anyhow::anyhow!(s))
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::System(anyhow::anyhow!(s.to_string()))
    }
}
