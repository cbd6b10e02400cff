//! JSON snapshot file
//!
//! The whole data set is written as one JSON document. Writes go to a
//! sibling temp file, are fsynced, then renamed over the target so a crash
//! never leaves a half-written snapshot behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{StorageError, StorageResult};
use crate::auth::User;
use crate::teams::models::{Availability, ChatMessage, MatchRequest, Team};

/// Current snapshot layout version
pub const SNAPSHOT_VERSION: u32 = 1;

/// A user as persisted, password hash included
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            password_hash: record.password_hash,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Everything the service persists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSnapshot {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub availabilities: Vec<Availability>,
    #[serde(default)]
    pub match_requests: Vec<MatchRequest>,
    #[serde(default)]
    pub chat_messages: Vec<ChatMessage>,
}

/// Location of the snapshot on disk
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot; a missing or empty file is an empty data set
    pub fn load(&self) -> StorageResult<DataSnapshot> {
        if !self.path.exists() {
            return Ok(DataSnapshot::default());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| StorageError::io(format!("failed to read {}", self.path.display()), e))?;
        if content.trim().is_empty() {
            return Ok(DataSnapshot::default());
        }

        let snapshot: DataSnapshot = serde_json::from_str(&content)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    /// Write the snapshot atomically
    pub fn save(&self, snapshot: &DataSnapshot) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::io(format!("failed to create {}", parent.display()), e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let mut file = File::create(&tmp)
            .map_err(|e| StorageError::io(format!("failed to create {}", tmp.display()), e))?;
        file.write_all(&json)
            .map_err(|e| StorageError::io(format!("failed to write {}", tmp.display()), e))?;
        file.sync_all()
            .map_err(|e| StorageError::io(format!("failed to fsync {}", tmp.display()), e))?;

        fs::rename(&tmp, &self.path)
            .map_err(|e| StorageError::io(format!("failed to replace {}", self.path.display()), e))
    }
}
