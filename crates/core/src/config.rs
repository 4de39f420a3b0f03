use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub vision: VisionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionSettings {
    /// Detector name: `google` or `noop`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub max_results: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: default_endpoint(),
            api_key: None,
            access_token: None,
            max_results: None,
            timeout_secs: None,
        }
    }
}

fn default_provider() -> String {
    "google".to_string()
}

fn default_endpoint() -> String {
    providers::vision::DEFAULT_ENDPOINT.to_string()
}

pub const ENV_PREFIX: &str = "IMAGE_TAGGER";

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
