use providers::{Label, LabelDetector, ProviderError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tagger_core::discovery::discover;
use tagger_core::labels::fetch_labels;
use tagger_core::metadata::{MetadataError, MetadataStore, TagField};
use tagger_core::pipeline::spawn_session_with;
use tagger_core::session::{FailureStage, FileOutcome, ProgressEvent};
use tempfile::tempdir;

/// Answers with fixed labels, or fails for files whose bytes are `b"boom"`.
struct FixedDetector {
    labels: Vec<&'static str>,
    calls: Mutex<usize>,
}

impl FixedDetector {
    fn new(labels: Vec<&'static str>) -> Self {
        Self {
            labels,
            calls: Mutex::new(0),
        }
    }
}

#[async_trait::async_trait]
impl LabelDetector for FixedDetector {
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<Label>, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        if image == b"boom" {
            return Err(ProviderError::RequestFailed("connection reset".into()));
        }
        Ok(self.labels.iter().map(|l| Label::new(*l)).collect())
    }
}

#[derive(Default)]
struct RecordingStore {
    calls: Mutex<Vec<(PathBuf, TagField, String)>>,
    reject: HashMap<PathBuf, Vec<TagField>>,
}

impl RecordingStore {
    fn calls(&self) -> Vec<(PathBuf, TagField, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl MetadataStore for RecordingStore {
    fn write_field(&self, path: &Path, field: TagField, value: &str) -> Result<(), MetadataError> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), field, value.to_string()));
        match self.reject.get(path) {
            Some(fields) if fields.contains(&field) => {
                Err(MetadataError::Write("read-only container".into()))
            }
            _ => Ok(()),
        }
    }
}

fn fixture() -> (tempfile::TempDir, Vec<PathBuf>) {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("sub")).unwrap();
    for name in ["a.jpg", "b.png", "sub/c.gif"] {
        fs::write(root.join(name), b"pixels").unwrap();
    }
    fs::write(root.join("notes.txt"), b"not an image").unwrap();
    let images = vec![root.join("a.jpg"), root.join("b.png"), root.join("sub").join("c.gif")];
    (temp, images)
}

async fn drain(
    mut rx: tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>,
) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn end_to_end_writes_joined_labels_once_per_image() {
    let (temp, mut expected) = fixture();

    let mut found = discover(temp.path()).unwrap();
    found.sort();
    expected.sort();
    assert_eq!(found, expected);

    let detector = Arc::new(FixedDetector::new(vec!["x", "y"]));
    let store = Arc::new(RecordingStore::default());
    let (handle, rx) = spawn_session_with(detector.clone(), store.clone(), found.clone());
    let events = drain(rx).await;
    let report = handle.await.unwrap();

    assert_eq!(report.total, 3);
    assert!(report.failures.is_empty());
    assert_eq!(*detector.calls.lock().unwrap(), 3);

    let calls = store.calls();
    assert_eq!(calls.len(), 3);
    for path in &found {
        let for_path: Vec<_> = calls.iter().filter(|(p, _, _)| p == path).collect();
        assert_eq!(for_path.len(), 1);
        assert_eq!(for_path[0].1, TagField::Description);
        assert_eq!(for_path[0].2, "x, y");
    }

    assert_eq!(events.first(), Some(&ProgressEvent::Started { total: 3 }));
    assert!(matches!(events.last(), Some(ProgressEvent::Completed(r)) if r == &report));
    let indices: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Processing { index, total, .. } => Some((*index, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(indices, vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn failures_are_collected_and_the_pass_continues() {
    let (temp, images) = fixture();
    let broken = temp.path().join("b.png");
    fs::write(&broken, b"boom").unwrap();
    let locked = temp.path().join("a.jpg");
    let missing = temp.path().join("vanished.jpg");

    let detector = Arc::new(FixedDetector::new(vec!["tree"]));
    let store = Arc::new(RecordingStore {
        reject: HashMap::from([(
            locked.clone(),
            vec![TagField::Description, TagField::UserComment],
        )]),
        ..RecordingStore::default()
    });

    let mut paths = images.clone();
    paths.push(missing.clone());
    let (handle, rx) = spawn_session_with(detector, store.clone(), paths);
    let events = drain(rx).await;
    let report = handle.await.unwrap();

    assert_eq!(report.total, 4);
    let stages: Vec<_> = report
        .failures
        .iter()
        .map(|f| (f.path.clone(), f.stage))
        .collect();
    assert_eq!(
        stages,
        vec![
            (locked.clone(), FailureStage::MetadataWrite),
            (broken.clone(), FailureStage::LabelFetch),
            (missing.clone(), FailureStage::LabelFetch),
        ]
    );

    // The locked file got both attempts, the gif was still tagged.
    let calls = store.calls();
    let locked_fields: Vec<_> = calls
        .iter()
        .filter(|(p, _, _)| p == &locked)
        .map(|(_, f, _)| *f)
        .collect();
    assert_eq!(locked_fields, vec![TagField::Description, TagField::UserComment]);
    let gif = temp.path().join("sub").join("c.gif");
    assert!(events.iter().any(|e| matches!(
        e,
        ProgressEvent::Finished { path, outcome: FileOutcome::Tagged { field: TagField::Description, tags } }
            if path == &gif && tags == "tree"
    )));
}

#[tokio::test]
async fn empty_label_set_skips_the_write() {
    let (_temp, images) = fixture();
    let store = Arc::new(RecordingStore::default());
    let (handle, rx) = spawn_session_with(Arc::new(FixedDetector::new(vec![])), store.clone(), images);
    let events = drain(rx).await;
    let report = handle.await.unwrap();

    assert!(report.failures.is_empty());
    assert!(store.calls().is_empty());
    let no_labels = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::Finished { outcome: FileOutcome::NoLabels, .. }))
        .count();
    assert_eq!(no_labels, 3);
}

#[tokio::test]
async fn empty_pass_still_completes() {
    let store = Arc::new(RecordingStore::default());
    let (handle, rx) = spawn_session_with(Arc::new(FixedDetector::new(vec!["x"])), store, vec![]);
    let events = drain(rx).await;
    let report = handle.await.unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(
        events,
        vec![
            ProgressEvent::Started { total: 0 },
            ProgressEvent::Completed(report)
        ]
    );
}

#[tokio::test]
async fn fetch_labels_reads_file_bytes() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("cat.jpg");
    fs::write(&path, b"pixels").unwrap();

    let detector = FixedDetector::new(vec!["cat", "outdoors"]);
    let labels = fetch_labels(&path, &detector).await.unwrap();
    assert_eq!(labels.tag_string(), "cat, outdoors");

    let err = fetch_labels(&temp.path().join("nope.jpg"), &detector)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("nope.jpg"));
    assert_eq!(*detector.calls.lock().unwrap(), 1);
}
