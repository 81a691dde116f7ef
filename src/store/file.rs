//! JSON file document backend.

use std::marker::PhantomData;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

use super::{Document, StoreError};

/// A document persisted as pretty-printed UTF-8 JSON.
///
/// Writes go to `<file>.tmp` first and are then renamed over the target, so
/// readers never observe a half-written document.
#[derive(Debug)]
pub struct JsonFileDocument<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileDocument<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T> Document<T> for JsonFileDocument<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn is_persistent(&self) -> bool {
        true
    }

    async fn load(&self) -> Result<Option<T>, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io(
                format!("Failed to read {}", self.path.display()),
                err,
            )),
        }
    }

    async fn save(&self, value: &T) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            super::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(value)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)
            .await
            .map_err(|e| StoreError::io(format!("Failed to write {}", tmp_path.display()), e))?;
        fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            StoreError::io(format!("Failed to finalize {}", self.path.display()), e)
        })?;
        tracing::debug!("Saved {}", self.path.display());
        Ok(())
    }
}
