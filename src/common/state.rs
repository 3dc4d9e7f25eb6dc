use crate::config::Config;
use crate::database::services::Database;

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Config,
}

impl AppState {
    pub fn new(database: Database, config: Config) -> Self {
        Self { database, config }
    }
}
