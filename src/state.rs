use crate::errors::AppError;
use crate::storage::persist_data;
use crate::store::StoredData;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

/// Shared by every handler; writes hold the lock until persisted.
#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub data: Arc<Mutex<StoredData>>,
}

impl AppState {
    pub fn new(data_path: PathBuf, data: StoredData) -> Self {
        Self {
            data_path,
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Runs `change` on a copy of the data, which replaces the live data
    /// only once it has been written to disk.
    pub async fn write<T>(
        &self,
        change: impl FnOnce(&mut StoredData) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut data = self.data.lock().await;
        let mut draft = data.clone();
        let outcome = change(&mut draft)?;
        persist_data(&self.data_path, &draft).await?;
        *data = draft;
        Ok(outcome)
    }
}
