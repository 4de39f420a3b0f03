//! Google Cloud Vision `images:annotate` client, LABEL_DETECTION only.

use crate::{Label, LabelDetector, ProviderError};
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

#[derive(Clone)]
pub enum VisionCredentials {
    /// Sent as the `key` query parameter.
    ApiKey(String),
    /// OAuth access token, sent as a bearer header.
    AccessToken(String),
}

impl std::fmt::Debug for VisionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisionCredentials::ApiKey(_) => f.write_str("ApiKey(..)"),
            VisionCredentials::AccessToken(_) => f.write_str("AccessToken(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub endpoint: String,
    pub credentials: Option<VisionCredentials>,
    pub max_results: Option<u32>,
    pub timeout: Option<Duration>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials: None,
            max_results: None,
            timeout: None,
        }
    }
}

#[derive(Clone)]
pub struct GoogleVisionProvider {
    client: Client,
    cfg: Arc<VisionConfig>,
    credentials: VisionCredentials,
}

impl GoogleVisionProvider {
    /// Builds the client. Fails up front when no usable credential is configured.
    pub fn new(cfg: VisionConfig) -> Result<Self, ProviderError> {
        let credentials = match &cfg.credentials {
            Some(VisionCredentials::ApiKey(k)) if !k.trim().is_empty() => {
                VisionCredentials::ApiKey(k.trim().to_string())
            }
            Some(VisionCredentials::AccessToken(t)) if !t.trim().is_empty() => {
                VisionCredentials::AccessToken(t.trim().to_string())
            }
            _ => {
                return Err(ProviderError::Authentication(
                    "no Cloud Vision credentials; set GOOGLE_API_KEY or GOOGLE_OAUTH_ACCESS_TOKEN"
                        .into(),
                ))
            }
        };

        let mut builder = Client::builder();
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::Authentication(e.to_string()))?;

        Ok(Self {
            client,
            cfg: Arc::new(cfg),
            credentials,
        })
    }
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<ImageRequest<'a>>,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    image: ImageContent,
    features: Vec<Feature<'a>>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct LabelAnnotation {
    #[serde(default)]
    description: String,
    score: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

fn build_request(image: &[u8], max_results: Option<u32>) -> AnnotateRequest<'static> {
    AnnotateRequest {
        requests: vec![ImageRequest {
            image: ImageContent {
                content: general_purpose::STANDARD.encode(image),
            },
            features: vec![Feature {
                kind: "LABEL_DETECTION",
                max_results,
            }],
        }],
    }
}

fn labels_from_response(parsed: AnnotateResponse) -> Result<Vec<Label>, ProviderError> {
    let Some(first) = parsed.responses.into_iter().next() else {
        return Ok(Vec::new());
    };
    if let Some(status) = first.error {
        if status.code != 0 {
            return Err(ProviderError::Api {
                status: status.code.clamp(0, u16::MAX as i32) as u16,
                message: status.message,
            });
        }
    }
    Ok(first
        .label_annotations
        .into_iter()
        .filter(|a| !a.description.is_empty())
        .map(|a| Label {
            description: a.description,
            score: a.score,
        })
        .collect())
}

fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned())
}

#[async_trait::async_trait]
impl LabelDetector for GoogleVisionProvider {
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<Label>, ProviderError> {
        let body = build_request(image, self.cfg.max_results);

        let mut builder = self.client.post(&self.cfg.endpoint).json(&body);
        builder = match &self.credentials {
            VisionCredentials::ApiKey(key) => builder.query(&[("key", key)]),
            VisionCredentials::AccessToken(token) => builder.bearer_auth(token),
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.bytes().await.unwrap_or(Bytes::from_static(b""));
            let message = error_message(&body);
            tracing::debug!("vision request failed with {}: {}", status, message);
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::Authentication(message),
                code => ProviderError::Api {
                    status: code,
                    message,
                },
            });
        }

        let parsed: AnnotateResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        labels_from_response(parsed)
    }
}
