// libs/appointment-cell/src/services/persistence.rs
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::models::{Appointment, SchedulingError};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<StorageError> for SchedulingError {
    fn from(err: StorageError) -> Self {
        SchedulingError::PersistenceError(err.to_string())
    }
}

/// Opaque blob storage the scheduling store snapshots itself into.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Last saved snapshot, or `None` when nothing was ever saved.
    async fn load(&self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replaces the saved snapshot as a whole.
    async fn save(&self, snapshot: &[u8]) -> Result<(), StorageError>;

    /// Held across a whole load, check and save cycle so that stores sharing
    /// this storage commit one at a time.
    async fn lock_for_commit(&self) -> OwnedMutexGuard<()>;
}

// ==============================================================================
// FILE STORAGE
// ==============================================================================

/// Snapshot kept in one JSON file. Commits are serialized per instance, so
/// processes sharing the file are not coordinated.
pub struct FileSnapshotStore {
    path: PathBuf,
    commit: Arc<Mutex<()>>,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            commit: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot at {}", self.path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, snapshot: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Stage beside the target, then rename over it.
        let staging = self.staging_path();
        tokio::fs::write(&staging, snapshot).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        debug!("Saved {} byte snapshot to {}", snapshot.len(), self.path.display());
        Ok(())
    }

    async fn lock_for_commit(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.commit).lock_owned().await
    }
}

// ==============================================================================
// IN-MEMORY STORAGE
// ==============================================================================

#[derive(Default)]
pub struct InMemorySnapshotStore {
    blob: Mutex<Option<Vec<u8>>>,
    commit: Arc<Mutex<()>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Vec<u8>) -> Self {
        Self {
            blob: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    pub async fn contents(&self) -> Option<Vec<u8>> {
        self.blob.lock().await.clone()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.blob.lock().await.clone())
    }

    async fn save(&self, snapshot: &[u8]) -> Result<(), StorageError> {
        *self.blob.lock().await = Some(snapshot.to_vec());
        Ok(())
    }

    async fn lock_for_commit(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.commit).lock_owned().await
    }
}

// ==============================================================================
// SNAPSHOT FORMAT
// ==============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub appointments: Vec<Appointment>,
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("appointment id {0} appears more than once")]
    DuplicateId(uuid::Uuid),

    #[error("slot {time} on {date} for doctor {doctor_id} is double-booked")]
    DoubleBooked {
        doctor_id: String,
        date: chrono::NaiveDate,
        time: crate::models::TimeSlot,
    },
}

impl StoreSnapshot {
    pub fn encode(appointments: &[Appointment]) -> Result<Vec<u8>, StorageError> {
        #[derive(Serialize)]
        struct Borrowed<'a> {
            version: u32,
            appointments: &'a [Appointment],
        }

        Ok(serde_json::to_vec(&Borrowed {
            version: SNAPSHOT_VERSION,
            appointments,
        })?)
    }

    /// Parses and validates a saved snapshot. A snapshot that would break the
    /// store's invariants is rejected whole.
    pub fn decode(bytes: &[u8]) -> Result<Vec<Appointment>, SnapshotError> {
        let snapshot: StoreSnapshot = serde_json::from_slice(bytes)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }

        let mut ids = HashSet::new();
        let mut held_slots = HashSet::new();

        for apt in &snapshot.appointments {
            if !ids.insert(apt.id) {
                return Err(SnapshotError::DuplicateId(apt.id));
            }
            if apt.status.is_active() && !held_slots.insert((apt.doctor_id.clone(), apt.date, apt.time)) {
                return Err(SnapshotError::DoubleBooked {
                    doctor_id: apt.doctor_id.clone(),
                    date: apt.date,
                    time: apt.time,
                });
            }
        }

        Ok(snapshot.appointments)
    }
}
