use crate::config::Config;
use crate::errors::AppError;
use crate::models::AppData;
use crate::storage::persist_data;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub data: Arc<Mutex<AppData>>,
}

impl AppState {
    pub fn new(config: Config, data: AppData) -> Self {
        Self {
            config: Arc::new(config),
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Writes the snapshot; callers hold the data lock so writes stay ordered.
    pub async fn persist(&self, data: &AppData) -> Result<(), AppError> {
        persist_data(&self.config.data_path, data).await
    }
}
