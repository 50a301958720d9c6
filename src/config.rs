//! Runtime configuration
//!
//! Read once at startup from `MEALTRACK_*` environment variables.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::models::{is_supported_locale, DEFAULT_LOCALE};

pub const DATABASE_PATH_VAR: &str = "MEALTRACK_DATABASE_PATH";
pub const LOCALE_VAR: &str = "MEALTRACK_LOCALE";
pub const CATALOG_PATH_VAR: &str = "MEALTRACK_CATALOG_PATH";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    /// Locale used for food names when a request does not name one
    pub locale: String,
    /// Catalog CSV imported at startup, if set
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_path = var(DATABASE_PATH_VAR).map(PathBuf::from).unwrap_or_else(|| {
            let path = default_database_path();
            info!("{DATABASE_PATH_VAR} not set, using default: {}", path.display());
            path
        });

        let locale = match var(LOCALE_VAR) {
            Some(locale) if is_supported_locale(&locale) => locale,
            Some(locale) => {
                warn!("Unsupported {LOCALE_VAR} value '{locale}', using {DEFAULT_LOCALE}");
                DEFAULT_LOCALE.to_string()
            }
            None => DEFAULT_LOCALE.to_string(),
        };

        Self {
            database_path,
            locale,
            catalog_path: var(CATALOG_PATH_VAR).map(PathBuf::from),
        }
    }
}

/// `data/mealtrack.db` under the project root
pub fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push("mealtrack.db");
    path
}
