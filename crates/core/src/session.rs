//! Sequential tagging pass over a list of discovered images.
//!
//! The session owns the detector for its lifetime and emits one
//! [`ProgressEvent`] per step over a channel. Per-file failures are recorded in
//! the [`SessionReport`] and never stop the pass.

use crate::labels::fetch_labels;
use crate::metadata::{try_write_tags, MetadataStore, TagField};
use providers::LabelDetector;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileOutcome {
    Tagged { field: TagField, tags: String },
    NoLabels,
    LabelFetchFailed { reason: String },
    WriteFailed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    LabelFetch,
    MetadataWrite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub stage: FailureStage,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub total: usize,
    pub failures: Vec<FileFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started { total: usize },
    /// `index` is 1-based.
    Processing {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    Finished { path: PathBuf, outcome: FileOutcome },
    Completed(SessionReport),
}

pub struct TaggingSession {
    detector: Arc<dyn LabelDetector>,
    store: Arc<dyn MetadataStore>,
    events: UnboundedSender<ProgressEvent>,
}

impl TaggingSession {
    pub fn new(
        detector: Arc<dyn LabelDetector>,
        store: Arc<dyn MetadataStore>,
        events: UnboundedSender<ProgressEvent>,
    ) -> Self {
        Self {
            detector,
            store,
            events,
        }
    }

    fn emit(&self, event: ProgressEvent) {
        // A closed receiver only means nobody is watching.
        let _ = self.events.send(event);
    }

    pub async fn run(self, paths: Vec<PathBuf>) -> SessionReport {
        let total = paths.len();
        let mut report = SessionReport {
            total,
            failures: Vec::new(),
        };
        info!("Starting tagging pass over {} images...", total);
        self.emit(ProgressEvent::Started { total });

        for (i, path) in paths.into_iter().enumerate() {
            self.emit(ProgressEvent::Processing {
                index: i + 1,
                total,
                path: path.clone(),
            });

            let outcome = self.process(&path).await;
            match &outcome {
                FileOutcome::LabelFetchFailed { reason } => report.failures.push(FileFailure {
                    path: path.clone(),
                    stage: FailureStage::LabelFetch,
                    reason: reason.clone(),
                }),
                FileOutcome::WriteFailed { reason } => report.failures.push(FileFailure {
                    path: path.clone(),
                    stage: FailureStage::MetadataWrite,
                    reason: reason.clone(),
                }),
                FileOutcome::Tagged { .. } | FileOutcome::NoLabels => {}
            }
            self.emit(ProgressEvent::Finished { path, outcome });
        }

        info!(
            "Tagging complete. {} of {} images failed.",
            report.failures.len(),
            total
        );
        self.emit(ProgressEvent::Completed(report.clone()));
        report
    }

    async fn process(&self, path: &Path) -> FileOutcome {
        let labels = match fetch_labels(path, self.detector.as_ref()).await {
            Ok(labels) => labels,
            Err(e) => {
                warn!("Error processing {}: {:#}", path.display(), e);
                return FileOutcome::LabelFetchFailed {
                    reason: format!("{:#}", e),
                };
            }
        };
        if labels.is_empty() {
            return FileOutcome::NoLabels;
        }

        let tags = labels.tag_string();
        match self.write(path.to_path_buf(), tags.clone()).await {
            Ok(field) => FileOutcome::Tagged { field, tags },
            Err(reason) => FileOutcome::WriteFailed { reason },
        }
    }

    async fn write(&self, path: PathBuf, tags: String) -> Result<TagField, String> {
        let store = Arc::clone(&self.store);
        let joined =
            tokio::task::spawn_blocking(move || try_write_tags(store.as_ref(), &path, &tags))
                .await;
        match joined {
            Ok(Ok(field)) => Ok(field),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(format!("metadata writer task failed: {e}")),
        }
    }
}
