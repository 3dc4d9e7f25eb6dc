use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

const DEFAULT_MAX_UPLOAD_MB: usize = 30;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub deployment: String,
    /// JSON document used when no remote persistence endpoints are configured
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub persistence_load_url: Option<String>,
    pub persistence_save_url: Option<String>,
    pub listen_addr: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok(); // Load from .env file if available

        let max_upload_mb = env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_MB);

        Config {
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "operations-api".to_string()),
            deployment: env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            db_path: env::var("DB_PATH")
                .unwrap_or_else(|_| "data/bdd.json".to_string())
                .into(),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            persistence_load_url: env::var("PERSISTENCE_LOAD_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            persistence_save_url: env::var("PERSISTENCE_SAVE_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            listen_addr: env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        }
    }

    /// Both persistence endpoints, when the document lives behind a remote service
    pub fn remote_persistence(&self) -> Option<(String, String)> {
        match (&self.persistence_load_url, &self.persistence_save_url) {
            (Some(load), Some(save)) => Some((load.clone(), save.clone())),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            app_name: "operations-api-test".to_string(),
            deployment: "test".to_string(),
            db_path: PathBuf::from("bdd.json"),
            upload_dir: PathBuf::from("uploads"),
            persistence_load_url: None,
            persistence_save_url: None,
            listen_addr: "127.0.0.1:0".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::database::services::Database;
    use crate::database::store::{JsonFileStore, MemoryStore};
    use crate::routes::build_router;
    use axum::Router;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Application wired to a document file and upload directory inside `dir`
    pub fn setup_test_app(dir: &TempDir) -> Router {
        let mut config = Config::for_tests();
        config.db_path = dir.path().join("bdd.json");
        config.upload_dir = dir.path().join("uploads");
        let database = Database::new(Arc::new(JsonFileStore::new(&config.db_path)));
        build_router(database, &config)
    }

    /// Application over an in-memory store the test keeps a handle on
    pub fn setup_memory_app(store: Arc<MemoryStore>) -> Router {
        build_router(Database::new(store), &Config::for_tests())
    }
}
