use crate::{Label, LabelDetector, ProviderError};

/// Detector that never finds anything. Useful for dry runs.
#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl LabelDetector for NoopProvider {
    async fn detect_labels(&self, _image: &[u8]) -> Result<Vec<Label>, ProviderError> {
        Ok(Vec::new())
    }
}
