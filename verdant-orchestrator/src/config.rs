//! Orchestrator configuration
//!
//! Defines all configurable parameters for the server including the
//! generation backend connection, polling budget and retention settings.

use std::path::PathBuf;
use std::time::Duration;

use crate::service::analysis::DEFAULT_ANALYSIS_MODELS;
use crate::service::generation::{
    DEFAULT_SUBSTITUTE_VIDEO_URL, DEFAULT_VIDEO_MODELS, DEFAULT_VIDEO_URL_BASE,
    GenerationSettings,
};
use crate::service::janitor::DEFAULT_RETENTION;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Gemini API key; generation runs in degraded mode without it
    pub api_key: Option<String>,

    /// Gemini REST base URL
    pub api_base: String,

    /// Directory where generated videos are stored
    pub video_dir: PathBuf,

    /// Time between operation polls
    pub poll_interval: Duration,

    /// Maximum number of operation polls before giving up
    pub max_polls: u32,

    /// How long jobs are kept before the janitor evicts them
    pub retention: Duration,

    /// How often the janitor runs
    pub sweep_interval: Duration,

    /// Video models, tried in order
    pub video_models: Vec<String>,

    /// Vision models used for field analysis, tried in order
    pub analysis_models: Vec<String>,

    /// Clip served whenever no video could be generated
    pub substitute_video_url: String,

    /// Largest accepted upload
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            api_key: None,
            api_base: verdant_client::DEFAULT_BASE_URL.to_string(),
            video_dir: default_video_dir(),
            poll_interval: Duration::from_secs(10),
            max_polls: 42,
            retention: DEFAULT_RETENTION,
            sweep_interval: Duration::from_secs(3600),
            video_models: to_strings(&DEFAULT_VIDEO_MODELS),
            analysis_models: to_strings(&DEFAULT_ANALYSIS_MODELS),
            substitute_video_url: DEFAULT_SUBSTITUTE_VIDEO_URL.to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Every variable is optional:
    /// - VERDANT_BIND_ADDR (default: 0.0.0.0:8000)
    /// - GEMINI_API_KEY (unset: degraded mode)
    /// - GEMINI_API_BASE
    /// - VERDANT_VIDEO_DIR (default: $TEMP/verdant_videos)
    /// - VERDANT_POLL_INTERVAL (seconds, default: 10)
    /// - VERDANT_MAX_POLLS (default: 42)
    /// - VERDANT_RETENTION (seconds, default: 172800)
    /// - VERDANT_SWEEP_INTERVAL (seconds, default: 3600)
    /// - VERDANT_VIDEO_MODELS, VERDANT_ANALYSIS_MODELS (comma separated)
    /// - VERDANT_SUBSTITUTE_VIDEO_URL
    /// - VERDANT_MAX_UPLOAD_BYTES (default: 20 MiB)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let secs = |key: &str, default: Duration| -> anyhow::Result<Duration> {
            match var(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| anyhow::anyhow!("{} must be a number of seconds, got {:?}", key, raw)),
                None => Ok(default),
            }
        };
        let list = |key: &str, default: Vec<String>| -> Vec<String> {
            var(key)
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(default)
        };

        let max_polls = match var("VERDANT_MAX_POLLS") {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| anyhow::anyhow!("VERDANT_MAX_POLLS must be an integer, got {:?}", raw))?,
            None => defaults.max_polls,
        };

        let max_upload_bytes = match var("VERDANT_MAX_UPLOAD_BYTES") {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                anyhow::anyhow!("VERDANT_MAX_UPLOAD_BYTES must be an integer, got {:?}", raw)
            })?,
            None => defaults.max_upload_bytes,
        };

        let config = Self {
            bind_addr: var("VERDANT_BIND_ADDR").unwrap_or(defaults.bind_addr),
            api_key: var("GEMINI_API_KEY"),
            api_base: var("GEMINI_API_BASE").unwrap_or(defaults.api_base),
            video_dir: var("VERDANT_VIDEO_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.video_dir),
            poll_interval: secs("VERDANT_POLL_INTERVAL", defaults.poll_interval)?,
            max_polls,
            retention: secs("VERDANT_RETENTION", defaults.retention)?,
            sweep_interval: secs("VERDANT_SWEEP_INTERVAL", defaults.sweep_interval)?,
            video_models: list("VERDANT_VIDEO_MODELS", defaults.video_models),
            analysis_models: list("VERDANT_ANALYSIS_MODELS", defaults.analysis_models),
            substitute_video_url: var("VERDANT_SUBSTITUTE_VIDEO_URL")
                .unwrap_or(defaults.substitute_video_url),
            max_upload_bytes,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.poll_interval.as_secs() == 0 {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.max_polls == 0 {
            anyhow::bail!("max_polls must be greater than 0");
        }

        if self.sweep_interval.as_secs() == 0 {
            anyhow::bail!("sweep_interval must be greater than 0");
        }

        if self.video_models.is_empty() {
            anyhow::bail!("at least one video model is required");
        }

        if self.analysis_models.is_empty() {
            anyhow::bail!("at least one analysis model is required");
        }

        if !self.substitute_video_url.starts_with("http://")
            && !self.substitute_video_url.starts_with("https://")
        {
            anyhow::bail!("substitute_video_url must start with http:// or https://");
        }

        if self.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be greater than 0");
        }

        Ok(())
    }

    /// Settings for the generation orchestrator
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            candidate_models: self.video_models.clone(),
            poll_interval: self.poll_interval,
            max_polls: self.max_polls,
            substitute_video_url: self.substitute_video_url.clone(),
            video_url_base: DEFAULT_VIDEO_URL_BASE.to_string(),
            ..GenerationSettings::default()
        }
    }
}

fn default_video_dir() -> PathBuf {
    std::env::var_os("TEMP")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("verdant_videos")
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.max_polls, 42);
        assert_eq!(config.retention, Duration::from_secs(172_800));
        assert_eq!(config.video_models[0], "veo-3.1-generate-preview");
        assert!(config.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = load(&[
            ("GEMINI_API_KEY", "secret"),
            ("VERDANT_POLL_INTERVAL", "2"),
            ("VERDANT_MAX_POLLS", "5"),
            ("VERDANT_VIDEO_MODELS", "veo-a, ,veo-b"),
            ("VERDANT_VIDEO_DIR", "/data/videos"),
        ])
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.max_polls, 5);
        assert_eq!(config.video_models, vec!["veo-a", "veo-b"]);
        assert_eq!(config.video_dir, PathBuf::from("/data/videos"));

        let settings = config.generation_settings();
        assert_eq!(settings.max_polls, 5);
        assert_eq!(settings.candidate_models, vec!["veo-a", "veo-b"]);
    }

    #[test]
    fn test_blank_api_key_means_degraded() {
        let config = load(&[("GEMINI_API_KEY", "   ")]).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(load(&[("VERDANT_POLL_INTERVAL", "soon")]).is_err());
        assert!(load(&[("VERDANT_POLL_INTERVAL", "0")]).is_err());
        assert!(load(&[("VERDANT_MAX_POLLS", "0")]).is_err());
        assert!(load(&[("VERDANT_SUBSTITUTE_VIDEO_URL", "ftp://clip")]).is_err());
        assert!(load(&[("VERDANT_VIDEO_MODELS", " , ")]).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.analysis_models.clear();
        assert!(config.validate().is_err());

        config.analysis_models = vec!["gemini-2.5-flash".to_string()];
        config.max_upload_bytes = 0;
        assert!(config.validate().is_err());
    }
}
