//! Provider abstractions for label detection.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod noop;
pub mod vision;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

/// One label reported by a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Label {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            score: None,
        }
    }
}

/// Turns raw image bytes into an ordered list of labels.
#[async_trait::async_trait]
pub trait LabelDetector: Send + Sync {
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<Label>, ProviderError>;
}

#[derive(Default, Clone)]
pub struct DetectorRegistry {
    detectors: HashMap<String, Arc<dyn LabelDetector>>,
    pub preferred: Option<String>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detector(mut self, name: &str, detector: Arc<dyn LabelDetector>) -> Self {
        self.detectors.insert(name.to_string(), detector);
        self
    }

    pub fn set_preferred(mut self, name: &str) -> Self {
        self.preferred = Some(name.to_string());
        self
    }

    pub fn detector(&self, name: Option<&str>) -> Result<Arc<dyn LabelDetector>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred.clone())
            .ok_or_else(|| ProviderError::UnknownProvider("no detector configured".into()))?;
        self.detectors
            .get(&key)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(key))
    }
}
