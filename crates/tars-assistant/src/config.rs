//! Configuration for the assistant

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::http::HttpOptions;

/// Main assistant configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TarsConfig {
    /// Chat generation configuration
    pub llm: LlmConfig,
    /// Vision (image description) configuration
    pub vision: VisionConfig,
    /// Web page loader configuration
    pub web: WebConfig,
    /// YouTube transcript loader configuration
    pub video: VideoConfig,
    /// PDF document loader configuration
    pub documents: DocumentConfig,
}

impl TarsConfig {
    /// Load configuration: defaults, then the TOML file if any, then environment
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// `TARS_CONFIG` if set, otherwise `<config dir>/tars/config.toml` when it exists
    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("TARS_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir()
            .map(|dir| dir.join("tars").join("config.toml"))
            .filter(|path| path.exists())
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("ANTHROPIC_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = non_empty("TARS_MODEL") {
            self.llm.model = model.clone();
            self.vision.model = model;
        }
        if let Some(url) = non_empty("SITE_URL") {
            self.web.default_url = Some(url);
        }
        if let Some(url) = non_empty("YOUTUBE_URL") {
            self.video.default_url = Some(url);
        }
        if let Some(list) = non_empty("YOUTUBE_PROXIES") {
            self.video.proxies = list
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(url) = lookup("TARS_RELAY_URL") {
            // An empty value disables the relay strategy
            self.video.relay_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(dir) = non_empty("TARS_DOCUMENTS_DIR") {
            self.documents.directory = PathBuf::from(dir);
        }
    }

    /// HTTP options shared by the scraping loaders
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            user_agent: self.web.user_agent.clone(),
            timeout: Some(Duration::from_secs(self.web.timeout_secs)),
            accept_invalid_certs: self.web.accept_invalid_certs,
        }
    }
}

/// Chat generation configuration (Anthropic Messages API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key (usually from `ANTHROPIC_API_KEY`)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// Maximum tokens per reply
    pub max_tokens: u32,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-5-sonnet-20240620".to_string(),
            max_tokens: 4000,
            temperature: 0.8,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Vision configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Vision-capable model name
    pub model: String,
    /// Maximum tokens of the description
    pub max_tokens: u32,
    /// Temperature for the description
    pub temperature: f32,
    /// Fixed instruction sent with every image
    pub instruction: String,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-sonnet-20240620".to_string(),
            max_tokens: 1000,
            temperature: 0.3,
            instruction: "Describe this image in detail. If there is any visible text in the image, \
                transcribe it as well. Provide a complete description of the visual content."
                .to_string(),
        }
    }
}

/// Web loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// URL used when the caller passes none (`SITE_URL`)
    pub default_url: Option<String>,
    /// User agent sent with every scraping request
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Accept self-signed and misconfigured certificates
    pub accept_invalid_certs: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            default_url: None,
            user_agent: "Mozilla/5.0".to_string(),
            timeout_secs: 30,
            accept_invalid_certs: true,
        }
    }
}

/// YouTube transcript loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// URL used when the caller passes none (`YOUTUBE_URL`)
    pub default_url: Option<String>,
    /// Candidate egress proxies for the rotation strategy
    pub proxies: Vec<String>,
    /// Pause between two proxy attempts, in milliseconds
    pub proxy_delay_ms: u64,
    /// Transcript relay endpoint (`None` disables the relay strategy)
    pub relay_url: Option<String>,
    /// Route the relay request through a pooled proxy
    pub relay_via_proxy: bool,
    /// Relay request timeout in seconds
    pub relay_timeout_secs: u64,
    /// oEmbed-style metadata endpoint used for titles
    pub noembed_url: String,
    /// Timeout of the title fetches in seconds
    pub title_timeout_secs: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            default_url: None,
            proxies: Vec::new(),
            proxy_delay_ms: 1500,
            relay_url: Some("https://projectlounge.pw/ytdl/download".to_string()),
            relay_via_proxy: false,
            relay_timeout_secs: 15,
            noembed_url: "https://noembed.com/embed".to_string(),
            title_timeout_secs: 10,
        }
    }
}

impl VideoConfig {
    pub fn proxy_delay(&self) -> Duration {
        Duration::from_millis(self.proxy_delay_ms)
    }
}

/// PDF document loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Directory scanned when no explicit paths are given
    pub directory: PathBuf,
    /// Timeout for parsing a single file in seconds
    pub parse_timeout_secs: u64,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("documents"),
            parse_timeout_secs: 60,
        }
    }
}
