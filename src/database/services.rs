use super::models::DatabaseDocument;
use super::store::{DocumentStore, StoreError};
use crate::common::errors::BusinessResult;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handle on the database document.
///
/// Every mutation is a load → mutate → replace transaction. Transactions are
/// serialized through one lock, so concurrent writers in this process cannot
/// overwrite each other's changes.
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
    write_lock: Arc<Mutex<()>>,
}

impl Database {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Current document; a store that has never been written reads as empty
    pub async fn load(&self) -> BusinessResult<DatabaseDocument> {
        match self.store.load_document().await {
            Ok(document) => Ok(document),
            Err(StoreError::NotFound) => {
                tracing::debug!("no database document yet, starting empty");
                Ok(DatabaseDocument::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the whole document
    pub async fn replace(&self, document: DatabaseDocument) -> BusinessResult<()> {
        let _guard = self.write_lock.lock().await;
        self.store.replace_document(&document).await?;
        tracing::info!(operations = document.operations.len(), "database replaced");
        Ok(())
    }

    /// Load, apply `mutate`, then write back. Nothing is written when `mutate` fails.
    pub async fn transaction<T, F>(&self, mutate: F) -> BusinessResult<T>
    where
        F: FnOnce(&mut DatabaseDocument) -> BusinessResult<T>,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;
        let output = mutate(&mut document)?;
        self.store.replace_document(&document).await?;
        Ok(output)
    }

    /// True when the store answers, including with "no document yet"
    pub async fn ping(&self) -> bool {
        matches!(
            self.store.load_document().await,
            Ok(_) | Err(StoreError::NotFound)
        )
    }
}
