// FICHIER : engine/src/migrations/id.rs

//! Identifiants de migration et source de temps.
//!
//! Un identifiant est un jeton de 17 chiffres `YYYYMMDDHHMMSSmmm` (UTC, milliseconde).
//! Largeur fixe : l'ordre lexical des noms de fichiers coïncide avec l'ordre
//! numérique, qui est l'ordre chronologique de création.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{AppError, Result};

pub const ID_WIDTH: usize = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MigrationId(u64);

impl MigrationId {
    /// Parse un jeton de 17 chiffres. Toute autre forme est une erreur de configuration.
    pub fn parse(token: &str) -> Result<Self> {
        if token.len() != ID_WIDTH || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::Config(format!(
                "Identifiant de migration malformé '{}' : {} chiffres attendus",
                token, ID_WIDTH
            )));
        }
        token
            .parse::<u64>()
            .map(Self)
            .map_err(|e| AppError::Config(format!("Identifiant '{}' illisible : {}", token, e)))
    }

    /// Identifiant dérivé d'un instant, à la milliseconde.
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        let date = instant.date_naive();
        let time = instant.time();
        // Seconde intercalaire : chrono la représente par nanos >= 1e9
        let millis = u64::from((time.nanosecond() / 1_000_000).min(999));
        let raw = u64::from(date.year().clamp(0, 9999) as u32) * 10_000_000_000_000
            + u64::from(date.month()) * 100_000_000_000
            + u64::from(date.day()) * 1_000_000_000
            + u64::from(time.hour()) * 10_000_000
            + u64::from(time.minute()) * 100_000
            + u64::from(time.second()) * 1_000
            + millis;
        Self(raw)
    }

    /// Identifiant immédiatement suivant (compteur monotone).
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Instant de création encodé, si le jeton décrit une date valide.
    pub fn created_at(self) -> Option<DateTime<Utc>> {
        let s = self.to_string();
        let field = |range: std::ops::Range<usize>| s.get(range)?.parse::<u32>().ok();
        let date = NaiveDate::from_ymd_opt(field(0..4)? as i32, field(4..6)?, field(6..8)?)?;
        let naive = date.and_hms_milli_opt(field(8..10)?, field(10..12)?, field(12..14)?, field(14..17)?)?;
        Some(Utc.from_utc_datetime(&naive))
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:017}", self.0)
    }
}

impl FromStr for MigrationId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MigrationId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<MigrationId> for String {
    fn from(id: MigrationId) -> Self {
        id.to_string()
    }
}

// --- HORLOGE ---

/// Source de temps injectée dans le Générateur.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Horloge figée (tests, générations reproductibles).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
