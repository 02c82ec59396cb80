use crate::errors::AppError;
use crate::store::StoredData;
use std::path::Path;
use tokio::fs;
use tracing::{error, info};

pub async fn load_data(path: &Path) -> StoredData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<StoredData>(&bytes) {
            Ok(data) => {
                info!(
                    templates = data.habits.daily_templates.len(),
                    "loaded habits from {}",
                    path.display()
                );
                data
            }
            Err(err) => {
                error!("failed to parse data file: {err}");
                StoredData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoredData::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            StoredData::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &StoredData) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}
