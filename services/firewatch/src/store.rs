//! Archived-session persistence
//!
//! The completed-session archive is one JSON document holding a single
//! `fire_sessions` collection: read once at startup, overwritten on every
//! session closure and every manual deletion.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::session::FireSession;

/// Abstraction over archive persistence for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveStore: Send + Sync {
    /// Load the archived sessions. An absent document yields an empty list.
    async fn load(&self) -> crate::Result<Vec<FireSession>>;

    /// Overwrite the document with the given sessions
    async fn save(&self, sessions: &[FireSession]) -> crate::Result<()>;
}

#[derive(Debug, Default, Deserialize)]
struct ArchiveDocument {
    #[serde(default)]
    fire_sessions: Vec<FireSession>,
}

#[derive(Serialize)]
struct ArchiveDocumentRef<'a> {
    fire_sessions: &'a [FireSession],
}

/// Production archive store backed by a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ArchiveStore for JsonFileStore {
    async fn load(&self) -> crate::Result<Vec<FireSession>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No archive at {:?}, starting empty", self.path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let document: ArchiveDocument = serde_json::from_str(&content).map_err(|e| {
            crate::FirewatchError::Store(format!("Corrupt archive {:?}: {}", self.path, e))
        })?;
        tracing::debug!(
            "Loaded {} archived sessions from {:?}",
            document.fire_sessions.len(),
            self.path
        );
        Ok(document.fire_sessions)
    }

    async fn save(&self, sessions: &[FireSession]) -> crate::Result<()> {
        let document = ArchiveDocumentRef {
            fire_sessions: sessions,
        };
        let content = serde_json::to_string_pretty(&document)?;
        tokio::fs::write(&self.path, content).await?;
        tracing::debug!(
            "Persisted {} archived sessions to {:?}",
            sessions.len(),
            self.path
        );
        Ok(())
    }
}
