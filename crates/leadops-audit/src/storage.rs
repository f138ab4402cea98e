//! Audit storage backends.

use crate::error::AuditError;
use crate::event::AuditEvent;
use crate::logger::AuditFilter;
use async_trait::async_trait;
use leadops_core::config::{AuditConfig, StorageBackend};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Trait for audit storage backends.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Store an audit event.
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError>;

    /// Query stored events, oldest first.
    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError>;
}

/// Create a storage backend based on configuration.
pub fn create_storage(config: &AuditConfig) -> Result<Box<dyn AuditStorage>, AuditError> {
    if !config.enabled {
        return Ok(Box::new(NullStorage));
    }
    match config.backend {
        StorageBackend::Console => Ok(Box::new(ConsoleStorage)),
        StorageBackend::File => Ok(Box::new(FileStorage::new(&config.file_path)?)),
        StorageBackend::Dual => Ok(Box::new(DualStorage::new(&config.file_path)?)),
    }
}

/// Discards everything.
pub struct NullStorage;

#[async_trait]
impl AuditStorage for NullStorage {
    async fn store(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }

    async fn query(&self, _filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        Ok(vec![])
    }
}

/// Console storage. Writes to stderr so stdout stays clean for `--json`.
pub struct ConsoleStorage;

#[async_trait]
impl AuditStorage for ConsoleStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        eprintln!("[AUDIT] {}", event.to_log_line());
        Ok(())
    }

    async fn query(&self, _filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        // Console storage doesn't support querying
        Ok(vec![])
    }
}

/// File storage (JSON Lines, append-only).
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage, creating the parent directory if needed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(AuditError::InitializationFailed(
                "audit file path is empty".to_string(),
            ));
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

#[async_trait]
impl AuditStorage for FileStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(&event)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut results = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEvent>(&line) {
                Ok(event) if filter.matches(&event) => results.push(event),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = lineno + 1,
                        error = %e,
                        "Skipping unreadable audit line"
                    );
                }
            }
        }

        if let Some(limit) = filter.limit
            && results.len() > limit
        {
            results.drain(..results.len() - limit);
        }

        Ok(results)
    }
}

/// File + console.
pub struct DualStorage {
    file: FileStorage,
    console: ConsoleStorage,
}

impl DualStorage {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        Ok(Self {
            file: FileStorage::new(path)?,
            console: ConsoleStorage,
        })
    }
}

#[async_trait]
impl AuditStorage for DualStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.console.store(event.clone()).await?;
        self.file.store(event).await
    }

    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.file.query(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AuditEventType;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_console_storage() {
        let storage = ConsoleStorage;
        let event = AuditEvent::new(AuditEventType::BindingAudited);

        // Should not error
        storage.store(event).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_storage_query() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested/audit.jsonl")).unwrap();
        let ws_a = Uuid::new_v4();
        let ws_b = Uuid::new_v4();

        storage
            .store(
                AuditEvent::builder(AuditEventType::MembershipInserted)
                    .workspace(ws_a)
                    .build(),
            )
            .await
            .unwrap();
        storage
            .store(
                AuditEvent::builder(AuditEventType::MembershipInserted)
                    .workspace(ws_b)
                    .build(),
            )
            .await
            .unwrap();

        let filter = AuditFilter {
            workspace_id: Some(ws_a),
            ..Default::default()
        };
        let results = storage.query(filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].workspace_id, Some(ws_a));
    }

    #[tokio::test]
    async fn test_file_storage_limit_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("audit.jsonl")).unwrap();
        for role in ["owner", "admin", "seller"] {
            storage
                .store(
                    AuditEvent::builder(AuditEventType::MembershipInserted)
                        .role(role)
                        .build(),
                )
                .await
                .unwrap();
        }

        let results = storage
            .query(AuditFilter {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        let roles: Vec<_> = results.iter().filter_map(|e| e.role.as_deref()).collect();
        assert_eq!(roles, vec!["admin", "seller"]);
    }

    #[tokio::test]
    async fn test_file_storage_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("never-written.jsonl")).unwrap();
        assert!(storage.query(AuditFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_storage_skips_garbage_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        std::fs::write(&path, "not json\n").unwrap();
        let storage = FileStorage::new(&path).unwrap();
        storage
            .store(AuditEvent::new(AuditEventType::BindingAudited))
            .await
            .unwrap();

        let results = storage.query(AuditFilter::default()).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(matches!(
            FileStorage::new(""),
            Err(AuditError::InitializationFailed(_))
        ));
    }

    #[test]
    fn test_create_storage_disabled() {
        let config = AuditConfig {
            enabled: false,
            file_path: String::new(),
            ..Default::default()
        };
        // Disabled config never touches the (invalid) path.
        assert!(create_storage(&config).is_ok());
    }
}
