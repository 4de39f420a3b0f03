use anyhow::Context;
use providers::{Label, LabelDetector};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordered label descriptions for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet(pub Vec<String>);

impl LabelSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The string written into metadata: labels joined by `", "`.
    pub fn tag_string(&self) -> String {
        self.0.join(", ")
    }
}

impl From<Vec<Label>> for LabelSet {
    fn from(labels: Vec<Label>) -> Self {
        LabelSet(labels.into_iter().map(|l| l.description).collect())
    }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        LabelSet(iter.into_iter().map(Into::into).collect())
    }
}

pub async fn fetch_labels(path: &Path, detector: &dyn LabelDetector) -> anyhow::Result<LabelSet> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let labels = detector
        .detect_labels(&bytes)
        .await
        .with_context(|| format!("label detection for {}", path.display()))?;
    Ok(LabelSet::from(labels))
}
