use std::path::Path;
use tagger_core::session::{FileOutcome, ProgressEvent, SessionReport};

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One status line per event.
pub fn render(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Started { .. } => "Starting...".to_string(),
        ProgressEvent::Processing { index, total, path } => {
            format!("Processing image {}/{}: {}", index, total, file_name(path))
        }
        ProgressEvent::Finished { outcome, .. } => match outcome {
            FileOutcome::Tagged { field, tags } => format!("  {field} <- {tags}"),
            FileOutcome::NoLabels => "  no labels detected".to_string(),
            FileOutcome::LabelFetchFailed { reason } => format!("  skipped: {reason}"),
            FileOutcome::WriteFailed { reason } => format!("  not tagged: {reason}"),
        },
        ProgressEvent::Completed(report) => completion_line(report),
    }
}

pub fn completion_line(report: &SessionReport) -> String {
    if report.failures.is_empty() {
        "Tagging complete.".to_string()
    } else {
        format!(
            "Tagging complete. {} of {} images could not be tagged.",
            report.failures.len(),
            report.total
        )
    }
}

pub fn report_json(report: &SessionReport) -> serde_json::Result<serde_json::Value> {
    let mut value = serde_json::to_value(report)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("status".into(), "ok".into());
    }
    Ok(value)
}
