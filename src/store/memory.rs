//! In-memory document backend (non-persistent).

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Document, StoreError};

#[derive(Debug)]
pub struct InMemoryDocument<T> {
    value: RwLock<Option<T>>,
}

impl<T> InMemoryDocument<T> {
    pub fn new() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }

    pub fn with_value(value: T) -> Self {
        Self {
            value: RwLock::new(Some(value)),
        }
    }
}

impl<T> Default for InMemoryDocument<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Document<T> for InMemoryDocument<T>
where
    T: Clone + Send + Sync,
{
    fn is_persistent(&self) -> bool {
        false
    }

    async fn load(&self) -> Result<Option<T>, StoreError> {
        Ok(self.value.read().await.clone())
    }

    async fn save(&self, value: &T) -> Result<(), StoreError> {
        *self.value.write().await = Some(value.clone());
        Ok(())
    }
}
