//! Registry of sync tasks, providing centralized status tracking.

use std::collections::HashMap;
use std::sync::mpsc;

use super::{run_sync, SyncService, SyncTask, TaskId, TaskState, TaskUpdate};

/// Tracks every triggered sync task. Completed and failed tasks stay in
/// the registry so their outcome remains queryable.
pub struct SyncManager {
    tasks: HashMap<TaskId, SyncTask>,
}

impl SyncManager {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Register a task for `service` and spawn its detached body.
    /// Returns the id the caller can poll.
    pub fn start(&mut self, service: SyncService) -> TaskId {
        let (tx, rx) = mpsc::channel();
        let task = SyncTask::new(service, rx);
        let id = task.id;
        self.tasks.insert(id, task);

        tokio::spawn(run_sync(service, tx));
        id
    }

    /// Drain pending updates from every task channel.
    pub fn poll_updates(&mut self) {
        for task in self.tasks.values_mut() {
            while let Ok(update) = task.receiver.try_recv() {
                match update {
                    TaskUpdate::Completed { message } => {
                        tracing::info!(task = task.id.0, "{message}");
                        task.state = TaskState::Completed;
                    }
                    TaskUpdate::Failed { error } => {
                        tracing::warn!(task = task.id.0, "sync failed: {error}");
                        task.state = TaskState::Failed(error);
                    }
                }
            }
        }
    }

    /// Current state of one task, refreshed from its channel first.
    pub fn status(&mut self, id: TaskId) -> Option<(SyncService, TaskState)> {
        self.poll_updates();
        self.tasks.get(&id).map(|t| (t.service, t.state.clone()))
    }

    pub fn has_running_tasks(&self) -> bool {
        self.tasks.values().any(|t| t.is_running())
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Default for SyncManager {
    fn default() -> Self {
        Self::new()
    }
}
