use crate::config::AppConfig;
use crate::metadata::{ExifStore, MetadataStore};
use crate::session::{ProgressEvent, SessionReport, TaggingSession};
use providers::noop::NoopProvider;
use providers::vision::{GoogleVisionProvider, VisionConfig, VisionCredentials};
use providers::{DetectorRegistry, LabelDetector, ProviderError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Resolves the Vision credential: config first, then the environment.
pub fn vision_credentials(config: &AppConfig) -> Option<VisionCredentials> {
    let env = |name: &str| {
        std::env::var_os(name)
            .map(|v| v.to_string_lossy().into_owned())
            .filter(|v| !v.trim().is_empty())
    };
    config
        .vision
        .api_key
        .clone()
        .or_else(|| env(API_KEY_ENV))
        .map(VisionCredentials::ApiKey)
        .or_else(|| {
            config
                .vision
                .access_token
                .clone()
                .or_else(|| env(ACCESS_TOKEN_ENV))
                .map(VisionCredentials::AccessToken)
        })
}

/// Registers every detector that can be built. The Google client is only
/// registered when its credentials are usable.
pub fn build_registry(config: &AppConfig) -> DetectorRegistry {
    let mut reg = DetectorRegistry::new().with_detector("noop", Arc::new(NoopProvider));

    let vision = VisionConfig {
        endpoint: config.vision.endpoint.clone(),
        credentials: vision_credentials(config),
        max_results: config.vision.max_results,
        timeout: config.vision.timeout_secs.map(Duration::from_secs),
    };
    match GoogleVisionProvider::new(vision) {
        Ok(provider) => reg = reg.with_detector("google", Arc::new(provider)),
        Err(e) => debug!("google detector unavailable: {}", e),
    }

    reg.set_preferred(&config.vision.provider)
}

/// Builds the session-scoped detector. A missing Google credential is an
/// authentication failure, reported before any file is touched.
pub fn build_detector(config: &AppConfig) -> Result<Arc<dyn LabelDetector>, ProviderError> {
    if config.vision.provider == "google" && vision_credentials(config).is_none() {
        return Err(ProviderError::Authentication(format!(
            "Failed to authenticate with Google Cloud Vision API: set {} or {}",
            API_KEY_ENV, ACCESS_TOKEN_ENV
        )));
    }
    build_registry(config).detector(None)
}

/// Starts a tagging pass on a background task writing through `store`.
pub fn spawn_session_with(
    detector: Arc<dyn LabelDetector>,
    store: Arc<dyn MetadataStore>,
    paths: Vec<PathBuf>,
) -> (JoinHandle<SessionReport>, UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = TaggingSession::new(detector, store, tx);
    info!("Spawning tagging session for {} images", paths.len());
    (tokio::spawn(session.run(paths)), rx)
}

/// Starts a tagging pass that writes EXIF metadata in place.
pub fn spawn_session(
    detector: Arc<dyn LabelDetector>,
    paths: Vec<PathBuf>,
) -> (JoinHandle<SessionReport>, UnboundedReceiver<ProgressEvent>) {
    spawn_session_with(detector, Arc::new(ExifStore), paths)
}
