//! Reconciliation records
//!
//! Manages the `.apimflow/state.json` file which holds, per resource address,
//! the identity, last applied configuration and last observed state.
//! Reconcilers never touch this file; the host does.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".apimflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const STATE_STAGING: &str = "state.json.tmp";
const LOCK_FILE: &str = "lock.json";
const LOCK_STAGING: &str = "lock.json.tmp";

/// A lock not refreshed for this long is assumed abandoned
///
/// Holders refresh at every checkpoint, so this must outlast the longest
/// single backend operation between two checkpoints.
pub const STALE_LOCK_AFTER: Duration = Duration::from_secs(3 * 60 * 60);

/// An unparseable lock file older than this was left by a crashed writer
const UNREADABLE_LOCK_AFTER: Duration = Duration::from_secs(60);

/// All records known to the host, indexed by address (`type.label`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of one resource type
    pub fn by_type(&self, resource_type: &str) -> Vec<(&String, &ResourceState)> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type)
            .collect()
    }

    /// Add or replace a record
    pub fn set_resource(&mut self, address: String, state: ResourceState) {
        self.resources.insert(address, state);
        self.updated_at = Utc::now();
    }

    /// Remove a record
    pub fn remove_resource(&mut self, address: &str) -> Option<ResourceState> {
        let result = self.resources.remove(address);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    pub fn get_resource(&self, address: &str) -> Option<&ResourceState> {
        self.resources.get(address)
    }

    pub fn get_resource_mut(&mut self, address: &str) -> Option<&mut ResourceState> {
        self.resources.get_mut(address)
    }
}

/// Reconciliation record for a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Identity assigned at creation; empty until known
    pub id: String,

    pub resource_type: String,

    pub status: ResourceStatus,

    /// Configuration last applied (conformed)
    pub config: serde_json::Value,

    /// State last observed on the backend
    pub attributes: serde_json::Value,

    /// Last error reported for this record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            status: ResourceStatus::Creating,
            config: serde_json::Value::Null,
            attributes: serde_json::Value::Null,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_attributes(mut self, attributes: serde_json::Value) -> Self {
        self.attributes = attributes;
        self
    }

    /// Record a successful observation
    pub fn observe(&mut self, attributes: serde_json::Value) {
        self.attributes = attributes;
        self.status = ResourceStatus::Present;
        self.error = None;
        self.updated_at = Utc::now();
    }

    /// Record a failed transition
    pub fn fail(&mut self, status: ResourceStatus, error: impl Into<String>) {
        self.status = status;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Lifecycle status of a recorded resource
///
/// A resource without a record is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Creating,
    Present,
    Updating,
    Deleting,
    /// Applied on the backend but the follow-up read failed
    Unsynced,
    Failed,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Creating => write!(f, "creating"),
            ResourceStatus::Present => write!(f, "present"),
            ResourceStatus::Updating => write!(f, "updating"),
            ResourceStatus::Deleting => write!(f, "deleting"),
            ResourceStatus::Unsynced => write!(f, "unsynced"),
            ResourceStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Reads and writes the record store of one project
pub struct StateManager {
    dir: PathBuf,
}

impl StateManager {
    /// Records live in `<project_root>/.apimflow/`
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            dir: project_root.as_ref().join(STATE_DIR),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Load the record store; a project without one starts empty
    pub async fn load(&self) -> Result<GlobalState> {
        let content = match fs::read_to_string(self.path(STATE_FILE)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No state file in {}", self.dir.display());
                return Ok(GlobalState::new());
            }
            Err(e) => return Err(e.into()),
        };

        let state: GlobalState = serde_json::from_str(&content)
            .map_err(|e| CloudError::StateError(format!("{}: {}", STATE_FILE, e)))?;
        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "{} has version {}, this build reads up to {}",
                STATE_FILE, state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded {} record(s)", state.resources.len());
        Ok(state)
    }

    /// Persist the record store
    ///
    /// The previous file becomes `state.json.backup`; the new content is
    /// written to a temporary file first and renamed into place.
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let current = self.path(STATE_FILE);
        let staged = self.path(STATE_STAGING);
        fs::write(&staged, serde_json::to_vec_pretty(state)?).await?;

        if fs::try_exists(&current).await? {
            fs::copy(&current, self.path(STATE_BACKUP)).await?;
        }
        fs::rename(&staged, &current).await?;

        tracing::debug!("Saved {} record(s)", state.resources.len());
        Ok(())
    }

    /// Take the advisory lock guarding the record store
    ///
    /// The lock file is created exclusively. A lock not refreshed within
    /// [`STALE_LOCK_AFTER`] is assumed abandoned and taken over, as is an
    /// unparseable lock file that has not been written for a minute.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path(LOCK_FILE);
        let info = LockInfo::current();
        let content = serde_json::to_vec_pretty(&info)?;

        for _ in 0..2 {
            match create_exclusive(&path, &content).await {
                Ok(()) => {
                    tracing::debug!("Locked {}", path.display());
                    return Ok(StateLock {
                        path,
                        info,
                        released: false,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }

            let (holder, since, limit) = match read_lock(&path).await? {
                LockFile::Missing => continue,
                LockFile::Held(existing) => (
                    format!("{} (pid {})", existing.holder, existing.pid),
                    existing.refreshed_at,
                    STALE_LOCK_AFTER,
                ),
                LockFile::Unreadable(modified) => (
                    "an unreadable lock file".to_string(),
                    modified,
                    UNREADABLE_LOCK_AFTER,
                ),
            };

            let stale = Utc::now()
                .signed_duration_since(since)
                .to_std()
                .is_ok_and(|age| age >= limit);
            if !stale {
                return Err(CloudError::LockError(format!(
                    "held by {}, last refreshed {}; remove {} if that run is gone",
                    holder,
                    since,
                    path.display()
                )));
            }

            tracing::warn!("Taking over stale lock held by {} since {}", holder, since);
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Err(CloudError::LockError(format!(
            "{} keeps reappearing",
            path.display()
        )))
    }
}

async fn create_exclusive(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content).await?;
    file.flush().await
}

enum LockFile {
    Missing,
    Held(LockInfo),
    /// Last modification time of a lock file that does not parse
    Unreadable(DateTime<Utc>),
}

async fn read_lock(path: &Path) -> Result<LockFile> {
    let content = match fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LockFile::Missing),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_slice(&content) {
        Ok(info) => Ok(LockFile::Held(info)),
        Err(e) => {
            tracing::debug!("Unreadable lock file {}: {}", path.display(), e);
            match fs::metadata(path).await {
                Ok(metadata) => Ok(LockFile::Unreadable(metadata.modified()?.into())),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LockFile::Missing),
                Err(e) => Err(e.into()),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    pid: u32,
    refreshed_at: DateTime<Utc>,
}

impl LockInfo {
    fn current() -> Self {
        let holder = ["HOSTNAME", "HOST", "COMPUTERNAME"]
            .iter()
            .find_map(|var| std::env::var(var).ok())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            holder,
            pid: std::process::id(),
            refreshed_at: Utc::now(),
        }
    }

    fn same_holder(&self, other: &LockInfo) -> bool {
        self.holder == other.holder && self.pid == other.pid
    }
}

/// Held state lock; removed on [`StateLock::release`] or drop
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
    info: LockInfo,
    released: bool,
}

impl StateLock {
    /// Stamp the lock as live again
    ///
    /// Fails when the lock file is gone or now belongs to another run.
    pub async fn refresh(&mut self) -> Result<()> {
        match read_lock(&self.path).await? {
            LockFile::Held(current) if current.same_holder(&self.info) => {}
            LockFile::Held(current) => {
                return Err(CloudError::LockError(format!(
                    "lock was taken over by {} (pid {})",
                    current.holder, current.pid
                )));
            }
            LockFile::Missing | LockFile::Unreadable(_) => {
                return Err(CloudError::LockError(format!(
                    "{} is no longer held by this run",
                    self.path.display()
                )));
            }
        }

        self.info.refreshed_at = Utc::now();
        let staged = self.path.with_file_name(LOCK_STAGING);
        fs::write(&staged, serde_json::to_vec_pretty(&self.info)?).await?;
        fs::rename(&staged, &self.path).await?;
        Ok(())
    }

    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
