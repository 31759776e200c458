//! Cloud-sync stub tasks.
//!
//! The sync endpoints represent a future cloud-storage integration; the
//! task body is a placeholder delay. What is real is the bookkeeping: a
//! trigger registers a task with the [`SyncManager`], runs detached, and
//! reports completion or failure over a channel instead of vanishing.

pub mod manager;

use std::str::FromStr;
use std::sync::mpsc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use manager::SyncManager;

/// Supported cloud-storage services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncService {
    GoogleDrive,
    Dropbox,
}

impl SyncService {
    pub fn display_name(&self) -> &'static str {
        match self {
            SyncService::GoogleDrive => "Google Drive",
            SyncService::Dropbox => "Dropbox",
        }
    }

    /// Stand-in for the real transfer time until an actual client exists.
    fn placeholder_delay(&self) -> Duration {
        match self {
            SyncService::GoogleDrive => Duration::from_secs(5),
            SyncService::Dropbox => Duration::from_secs(3),
        }
    }
}

/// Error for unknown service names; the API maps it to a 400.
#[derive(Debug, thiserror::Error)]
#[error("unsupported cloud service `{0}`; supported: google_drive, dropbox")]
pub struct UnknownService(pub String);

impl FromStr for SyncService {
    type Err = UnknownService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google_drive" => Ok(SyncService::GoogleDrive),
            "dropbox" => Ok(SyncService::Dropbox),
            other => Err(UnknownService(other.to_string())),
        }
    }
}

/// Unique identifier for a sync task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TaskId(pub u64);

impl TaskId {
    fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        TaskId(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

/// State of a sync task as last observed by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Completed,
    Failed(String),
}

/// Update messages sent from the detached task via its channel.
#[derive(Debug, Clone)]
pub enum TaskUpdate {
    Completed { message: String },
    Failed { error: String },
}

/// A registered sync task with its state and update channel.
pub struct SyncTask {
    pub id: TaskId,
    pub service: SyncService,
    pub state: TaskState,
    pub receiver: mpsc::Receiver<TaskUpdate>,
}

impl SyncTask {
    fn new(service: SyncService, receiver: mpsc::Receiver<TaskUpdate>) -> Self {
        Self {
            id: TaskId::next(),
            service,
            state: TaskState::Running,
            receiver,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }
}

/// Body of a detached sync task.
///
/// A real integration would authenticate, walk the remote tree and pull
/// metadata into the store; for now the delay stands in for all of it.
pub async fn run_sync(service: SyncService, updates: mpsc::Sender<TaskUpdate>) {
    tracing::info!("starting {} sync", service.display_name());
    tokio::time::sleep(service.placeholder_delay()).await;
    tracing::info!("{} sync finished", service.display_name());
    let _ = updates.send(TaskUpdate::Completed {
        message: format!("{} sync finished", service.display_name()),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_services_parse() {
        assert_eq!(
            "google_drive".parse::<SyncService>().unwrap(),
            SyncService::GoogleDrive
        );
        assert_eq!("dropbox".parse::<SyncService>().unwrap(), SyncService::Dropbox);
    }

    #[test]
    fn unknown_service_is_rejected() {
        let err = "carrier_pigeon".parse::<SyncService>().unwrap_err();
        assert_eq!(err.0, "carrier_pigeon");
    }

    #[test]
    fn service_names_are_exact() {
        assert!("Google_Drive".parse::<SyncService>().is_err());
        assert!("".parse::<SyncService>().is_err());
    }
}
