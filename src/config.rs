use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration. Every section is optional: a missing config
/// file runs entirely on defaults, with the API key supplied through the
/// environment.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Data API v3 key. May be left empty and supplied via
    /// `TUBECAST_API_KEY` instead.
    #[serde(default)]
    pub key: String,
    /// Items per `playlistItems.list` page (the API caps this at 50).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Database file location. Defaults to `tubecast/cache.db` under the
    /// platform's user cache directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

fn default_true() -> bool {
    true
}

impl CacheConfig {
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let dir = dirs::cache_dir().context("could not determine the user cache directory")?;
        Ok(dir.join("tubecast").join("cache.db"))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Feed size when a request does not specify one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Download format, passed through to the resolver command's
    /// `--format`.
    #[serde(default = "default_format")]
    pub format: String,
    /// MIME type written into enclosure tags.
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    /// Command used to resolve playable media URLs in serve mode.
    #[serde(default = "default_ytdl_command")]
    pub ytdl_command: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            format: default_format(),
            mime_type: default_mime_type(),
            ytdl_command: default_ytdl_command(),
        }
    }
}

fn default_limit() -> usize {
    50
}
fn default_format() -> String {
    "best[ext=mp4]".to_string()
}
fn default_mime_type() -> String {
    "video/mp4".to_string()
}
fn default_ytdl_command() -> String {
    "yt-dlp".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// The URL under which the server is reachable; enclosure links are
    /// built against it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_url: default_base_url(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:9494".to_string()
}
fn default_base_url() -> String {
    "http://localhost:9494".to_string()
}

impl Config {
    /// API key from the config file or the `TUBECAST_API_KEY` environment
    /// variable.
    pub fn api_key(&self) -> Result<String> {
        if !self.api.key.is_empty() {
            return Ok(self.api.key.clone());
        }
        std::env::var("TUBECAST_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .context("no API key configured: set [api].key or TUBECAST_API_KEY")
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    // An absent file is not an error: everything has a usable default and
    // the API key can come from the environment.
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate api
    if config.api.page_size == 0 || config.api.page_size > 50 {
        anyhow::bail!("api.page_size must be in 1..=50");
    }

    // Validate feed
    if config.feed.default_limit == 0 {
        anyhow::bail!("feed.default_limit must be > 0");
    }

    // Validate server
    if config.server.bind.is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }
    url::Url::parse(&config.server.base_url)
        .with_context(|| format!("server.base_url is not a valid URL: {}", config.server.base_url))?;

    Ok(config)
}
