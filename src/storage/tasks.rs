//! In-memory task records for the web API.
//!
//! One writer per key: only the runner spawned for a task mutates its record.
//! Pollers get cloned snapshots, so a reader may observe a record between two
//! field updates of the same step; that is accepted.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::download::arena::{remove_dir_quietly, TaskArena};
use crate::download::pipeline::PipelineOutput;
use crate::download::source::{FetchMethod, MediaKind};

/// Length of the opaque task token handed to clients.
const TASK_ID_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A submitted download as exposed by the status route.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub status: TaskStatus,
    pub url: String,
    pub created_at: DateTime<Utc>,
    /// Human-readable pipeline step while downloading
    pub progress: Option<String>,
    pub error: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub kind: Option<MediaKind>,
    pub media_count: Option<usize>,
    pub method: Option<FetchMethod>,
    #[serde(skip)]
    pub file_path: Option<PathBuf>,
    #[serde(skip)]
    pub dir: PathBuf,
}

impl TaskRecord {
    fn new(task_id: String, url: String, dir: PathBuf) -> Self {
        Self {
            task_id,
            status: TaskStatus::Pending,
            url,
            created_at: Utc::now(),
            progress: None,
            error: None,
            file_name: None,
            file_size: None,
            width: None,
            height: None,
            kind: None,
            media_count: None,
            method: None,
            file_path: None,
            dir,
        }
    }
}

/// Task map plus the root their arena directories live under.
#[derive(Clone)]
pub struct TaskStore {
    tasks: Arc<DashMap<String, TaskRecord>>,
    root: PathBuf,
}

impl TaskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            tasks: Arc::new(DashMap::new()),
            root: root.into(),
        }
    }

    fn fresh_id(&self) -> String {
        loop {
            let id: String = Uuid::new_v4().simple().to_string().chars().take(TASK_ID_LEN).collect();
            if !self.tasks.contains_key(&id) {
                return id;
            }
        }
    }

    /// Registers a pending task and creates its arena directory.
    pub async fn create(&self, url: &str) -> std::io::Result<(TaskRecord, TaskArena)> {
        let id = self.fresh_id();
        let arena = TaskArena::create_with_token(&self.root, id.clone()).await?;
        let record = TaskRecord::new(id.clone(), url.to_string(), arena.dir().to_path_buf());
        self.tasks.insert(id, record.clone());
        Ok((record, arena))
    }

    /// Snapshot of one record.
    pub fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.tasks.get(task_id).map(|entry| entry.value().clone())
    }

    fn update(&self, task_id: &str, apply: impl FnOnce(&mut TaskRecord)) {
        if let Some(mut entry) = self.tasks.get_mut(task_id) {
            apply(entry.value_mut());
        }
    }

    pub fn mark_downloading(&self, task_id: &str) {
        self.update(task_id, |record| record.status = TaskStatus::Downloading);
    }

    pub fn set_progress(&self, task_id: &str, label: String) {
        self.update(task_id, |record| record.progress = Some(label));
    }

    pub fn complete(&self, task_id: &str, output: &PipelineOutput) {
        self.update(task_id, |record| {
            record.status = TaskStatus::Completed;
            record.progress = None;
            record.file_name = Some(output.file_name());
            record.file_size = Some(output.file_size);
            record.width = output.probe.as_ref().and_then(|p| p.width);
            record.height = output.probe.as_ref().and_then(|p| p.height);
            record.kind = Some(output.kind);
            record.media_count = Some(output.media_count());
            record.method = Some(output.method);
            record.file_path = Some(output.artifact.clone());
        });
    }

    pub fn fail(&self, task_id: &str, message: String) {
        self.update(task_id, |record| {
            record.status = TaskStatus::Failed;
            record.progress = None;
            record.error = Some(message);
        });
    }

    /// Drops records older than `retention` and deletes their directories.
    /// Returns how many were removed.
    pub async fn sweep_expired(&self, retention: Duration) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        let cutoff = Utc::now() - retention;
        let expired: Vec<String> = self
            .tasks
            .iter()
            .filter(|entry| entry.created_at < cutoff)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for id in expired {
            if let Some((_, record)) = self.tasks.remove(&id) {
                remove_dir_quietly(&record.dir).await;
                removed += 1;
            }
        }
        if removed > 0 {
            log::info!("🧹 Swept {} expired task(s)", removed);
        }
        removed
    }

    /// Test hook: backdates a record's creation time.
    #[doc(hidden)]
    pub fn backdate(&self, task_id: &str, by: Duration) {
        if let Ok(by) = chrono::Duration::from_std(by) {
            self.update(task_id, |record| record.created_at -= by);
        }
    }
}
