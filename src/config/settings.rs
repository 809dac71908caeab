use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::chat::{ChatSyncConfig, SingleFlightPolicy, TransportFailurePolicy};
use crate::player::PlaybackSpeed;
use crate::util::paths::config_path;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub tracer: TracerConfig,
    pub chat: ChatConfig,
    pub playback: PlaybackConfig,
}

/// Remote tracer backend
#[derive(Debug, Clone)]
pub struct TracerConfig {
    pub base_url: String,
    /// Extensions traced by the remote backend
    pub remote_languages: Vec<String>,
    pub timeout: Duration,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            remote_languages: ["cpp", "java", "js", "py"]
                .into_iter()
                .map(String::from)
                .collect(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TransportFailureMode {
    Surface,
    Retry,
}

/// Chat backend and sync loop
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub initial_delay: Duration,
    pub poll_interval: Duration,
    pub on_transport_failure: TransportFailureMode,
    pub retry_max_attempts: u32,
    /// First retry delay, doubled on every further retry
    pub retry_backoff: Duration,
    pub single_flight: SingleFlightPolicy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            initial_delay: Duration::from_millis(200),
            poll_interval: Duration::from_millis(500),
            on_transport_failure: TransportFailureMode::Surface,
            retry_max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
            single_flight: SingleFlightPolicy::Unguarded,
        }
    }
}

impl ChatConfig {
    pub fn sync_config(&self) -> ChatSyncConfig {
        let on_transport_failure = match self.on_transport_failure {
            TransportFailureMode::Surface => TransportFailurePolicy::Surface,
            TransportFailureMode::Retry => TransportFailurePolicy::Retry {
                max_attempts: self.retry_max_attempts,
                initial_backoff: self.retry_backoff,
            },
        };
        ChatSyncConfig {
            initial_delay: self.initial_delay,
            poll_interval: self.poll_interval,
            on_transport_failure,
            single_flight: self.single_flight,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackConfig {
    pub default_speed: PlaybackSpeed,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlTracerConfig {
    pub base_url: Option<String>,
    pub remote_languages: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlChatConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub initial_delay_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub on_transport_failure: Option<TransportFailureMode>,
    pub retry_max_attempts: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub single_flight: Option<SingleFlightPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlPlaybackConfig {
    pub default_speed: Option<f64>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub tracer: Option<TomlTracerConfig>,
    pub chat: Option<TomlChatConfig>,
    pub playback: Option<TomlPlaybackConfig>,
}

impl Config {
    /// Load configuration from file, merging with defaults
    pub fn load() -> Self {
        let config_file = config_path();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        Self::load_from(&config_file)
    }

    /// Load `path` on top of the defaults. A missing or malformed file
    /// leaves the defaults in place.
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "No config file, using defaults");
                return Self::default();
            }
        };

        match Self::from_toml_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
                Self::default()
            }
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let toml_config = toml::from_str::<TomlConfig>(contents)?;
        let mut config = Config::default();
        config.merge(toml_config);
        Ok(config)
    }

    fn merge(&mut self, toml_config: TomlConfig) {
        if let Some(tracer) = toml_config.tracer {
            if let Some(base_url) = tracer.base_url {
                self.tracer.base_url = base_url;
            }
            if let Some(languages) = tracer.remote_languages {
                self.tracer.remote_languages = languages
                    .iter()
                    .map(|l| l.trim().trim_start_matches('.').to_ascii_lowercase())
                    .filter(|l| !l.is_empty())
                    .collect();
            }
            if let Some(secs) = tracer.timeout_secs {
                self.tracer.timeout = Duration::from_secs(at_least("tracer.timeout_secs", secs, 1));
            }
        }

        if let Some(chat) = toml_config.chat {
            if let Some(base_url) = chat.base_url {
                self.chat.base_url = base_url;
            }
            if let Some(secs) = chat.timeout_secs {
                self.chat.timeout = Duration::from_secs(at_least("chat.timeout_secs", secs, 1));
            }
            if let Some(ms) = chat.initial_delay_ms {
                self.chat.initial_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = chat.poll_interval_ms {
                self.chat.poll_interval =
                    Duration::from_millis(at_least("chat.poll_interval_ms", ms, 10));
            }
            if let Some(mode) = chat.on_transport_failure {
                self.chat.on_transport_failure = mode;
            }
            if let Some(attempts) = chat.retry_max_attempts {
                self.chat.retry_max_attempts =
                    at_least("chat.retry_max_attempts", attempts.into(), 1) as u32;
            }
            if let Some(ms) = chat.retry_backoff_ms {
                self.chat.retry_backoff = Duration::from_millis(ms);
            }
            if let Some(policy) = chat.single_flight {
                self.chat.single_flight = policy;
            }
        }

        if let Some(speed) = toml_config.playback.and_then(|p| p.default_speed) {
            let clamped = PlaybackSpeed::new(speed);
            if clamped.value() != speed {
                tracing::warn!(
                    configured = speed,
                    used = clamped.value(),
                    "playback.default_speed out of range, adjusted"
                );
            }
            self.playback.default_speed = clamped;
        }
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &PathBuf) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(path = %parent.display(), error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write default config");
        }
    }
}

fn at_least(key: &str, value: u64, min: u64) -> u64 {
    if value < min {
        tracing::warn!(key, value, min, "Config value below minimum, clamped");
        min
    } else {
        value
    }
}
