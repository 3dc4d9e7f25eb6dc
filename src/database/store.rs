//! Where the database document lives.
//!
//! The document has no partial-update protocol: a store can only hand back the
//! whole document or replace it wholesale.

use super::models::DatabaseDocument;
use crate::common::errors::BusinessError;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No document has been written yet
    NotFound,
    /// The store could not be reached or refused the request
    Unavailable(String),
    /// A document exists but is not a valid database document
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => f.write_str("database document not found"),
            StoreError::Unavailable(message) => write!(f, "document store unavailable: {message}"),
            StoreError::Corrupt(message) => write!(f, "database document is invalid: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for BusinessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => BusinessError::NotFound {
                resource: "Database document".to_string(),
                id: "operations".to_string(),
            },
            StoreError::Unavailable(message) => BusinessError::PersistenceUnavailable { message },
            StoreError::Corrupt(message) => BusinessError::InternalError {
                message: format!("database document is invalid: {message}"),
            },
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load_document(&self) -> Result<DatabaseDocument, StoreError>;
    async fn replace_document(&self, document: &DatabaseDocument) -> Result<(), StoreError>;
}

fn parse_document(bytes: &[u8]) -> Result<DatabaseDocument, StoreError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(StoreError::NotFound);
    }
    serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt(e.to_string()))
}

/// Document kept as a pretty-printed JSON file on local disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn load_document(&self) -> Result<DatabaseDocument, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => parse_document(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(StoreError::Unavailable(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn replace_document(&self, document: &DatabaseDocument) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(document)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Unavailable(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        // Write next to the target then rename so readers never see a partial document
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        tokio::fs::write(&staging, json).await.map_err(|e| {
            StoreError::Unavailable(format!("failed to write {}: {e}", staging.display()))
        })?;
        tokio::fs::rename(&staging, &self.path).await.map_err(|e| {
            StoreError::Unavailable(format!("failed to replace {}: {e}", self.path.display()))
        })?;

        tracing::debug!(
            path = %self.path.display(),
            operations = document.operations.len(),
            "database document written"
        );
        Ok(())
    }
}

/// Document served by a remote load/save endpoint pair
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    client: reqwest::Client,
    load_url: String,
    save_url: String,
}

impl HttpDocumentStore {
    pub fn new(load_url: String, save_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            load_url,
            save_url,
        }
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn load_document(&self) -> Result<DatabaseDocument, StoreError> {
        let response = self
            .client
            .get(&self.load_url)
            .header("cache-control", "no-store")
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        if !response.status().is_success() {
            return Err(StoreError::Unavailable(format!(
                "load answered with status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        parse_document(&bytes)
    }

    async fn replace_document(&self, document: &DatabaseDocument) -> Result<(), StoreError> {
        let response = self
            .client
            .post(&self.save_url)
            .json(document)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "save rejected with status {}",
                response.status()
            )))
        }
    }
}

/// Volatile store for tests, optionally refusing writes
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: tokio::sync::Mutex<Option<DatabaseDocument>>,
    pub reject_writes: std::sync::atomic::AtomicBool,
    pub reject_reads: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_document(document: DatabaseDocument) -> Self {
        Self {
            document: tokio::sync::Mutex::new(Some(document)),
            ..Self::default()
        }
    }

    pub async fn snapshot(&self) -> Option<DatabaseDocument> {
        self.document.lock().await.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load_document(&self) -> Result<DatabaseDocument, StoreError> {
        if self.reject_reads.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        self.document.lock().await.clone().ok_or(StoreError::NotFound)
    }

    async fn replace_document(&self, document: &DatabaseDocument) -> Result<(), StoreError> {
        if self
            .reject_writes
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        *self.document.lock().await = Some(document.clone());
        Ok(())
    }
}
