use std::env;

use opening_graph::opening::OPENING_DB_PATH;
use opening_graph::ImportSettings;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub opening_db_path: String,
    /// Ply cap applied to imports that don't set their own.
    pub max_import_plies: Option<usize>,
    /// Games ingested between cooperative yields during an import.
    pub import_yield_every: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            opening_db_path: env::var("OPENING_DB_PATH")
                .unwrap_or_else(|_| OPENING_DB_PATH.to_string()),
            max_import_plies: env::var("MAX_IMPORT_PLIES")
                .ok()
                .and_then(|v| v.parse().ok()),
            import_yield_every: env::var("IMPORT_YIELD_EVERY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
        }
    }

    /// Default import settings derived from the environment.
    pub fn import_settings(&self) -> ImportSettings {
        ImportSettings {
            max_plies: self.max_import_plies,
            only_color: None,
        }
    }
}
