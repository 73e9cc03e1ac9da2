//! TOML configuration for the SkillSync server.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below, so an empty file (or no file at all) yields a working
//! local setup on `127.0.0.1:5000` with AI disabled.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:5000"
//! cors_origin = "http://localhost:3000"
//!
//! [ai]
//! provider = "openai"
//! model = "gpt-4o-mini"
//! base_url = "https://api.openai.com/v1"
//! api_key_env = "OPENAI_API_KEY"
//!
//! [uploads]
//! dir = "./uploads"
//!
//! [auth]
//! admin_password = "admin"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Location checked when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/skillsync.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Allowed CORS origin. `"*"` allows any origin.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}
fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    /// `"disabled"` or `"openai"` (any OpenAI-compatible endpoint).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key. The key is
    /// optional; local servers usually run without one.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Number of knowledge items placed in the prompt as context.
    #[serde(default = "default_context_items")]
    pub context_items: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            context_items: default_context_items(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl AiConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_context_items() -> usize {
    3
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.3
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadsConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_bytes: default_max_bytes(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}
fn default_max_bytes() -> usize {
    50 * 1024 * 1024
}
fn default_allowed_types() -> Vec<String> {
    vec![
        "application/pdf".to_string(),
        "application/msword".to_string(),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_string(),
        "text/plain".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Password of the seeded `admin` account.
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_password: default_admin_password(),
        }
    }
}

fn default_admin_password() -> String {
    "admin".to_string()
}

/// Parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Resolve the effective configuration.
///
/// An explicit path must exist. Without one, [`DEFAULT_CONFIG_PATH`] is used
/// when present and built-in defaults otherwise. `PORT` and `CORS_ORIGIN`
/// from the environment are applied last.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(default_path)?
            } else {
                Config::default()
            }
        }
    };

    config.apply_env_overrides(
        std::env::var("PORT").ok().as_deref(),
        std::env::var("CORS_ORIGIN").ok().as_deref(),
    )?;
    Ok(config)
}

impl Config {
    /// Replace the bind port and/or CORS origin.
    pub fn apply_env_overrides(
        &mut self,
        port: Option<&str>,
        cors_origin: Option<&str>,
    ) -> Result<()> {
        if let Some(port) = port.map(str::trim).filter(|p| !p.is_empty()) {
            let port: u16 = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", port))?;
            let host = self
                .server
                .bind
                .rsplit_once(':')
                .map(|(host, _)| host)
                .unwrap_or("127.0.0.1");
            self.server.bind = format!("{}:{}", host, port);
        }
        if let Some(origin) = cors_origin.map(str::trim).filter(|o| !o.is_empty()) {
            self.server.cors_origin = origin.to_string();
        }
        Ok(())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }

    match config.ai.provider.as_str() {
        "disabled" | "openai" => {}
        other => bail!(
            "Unknown ai provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.ai.is_enabled() {
        if config.ai.model.trim().is_empty() {
            bail!(
                "ai.model must be specified when provider is '{}'",
                config.ai.provider
            );
        }
        if config.ai.base_url.trim().is_empty() {
            bail!(
                "ai.base_url must be specified when provider is '{}'",
                config.ai.provider
            );
        }
    }

    if config.ai.timeout_secs == 0 {
        bail!("ai.timeout_secs must be > 0");
    }
    if config.ai.context_items == 0 {
        bail!("ai.context_items must be >= 1");
    }
    if !(0.0..=2.0).contains(&config.ai.temperature) {
        bail!("ai.temperature must be in [0.0, 2.0]");
    }

    if config.uploads.max_bytes == 0 {
        bail!("uploads.max_bytes must be > 0");
    }
    if config.uploads.allowed_types.is_empty() {
        bail!("uploads.allowed_types must list at least one MIME type");
    }

    if config.auth.admin_password.is_empty() {
        bail!("auth.admin_password must not be empty");
    }

    Ok(())
}
