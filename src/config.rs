use std::{path::PathBuf, time::Duration};

use crate::error::{PlannerError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Sampling parameters for one kind of model call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelSettings {
    /// Long, creative output for itinerary generation
    pub const ITINERARY: ModelSettings = ModelSettings {
        temperature: 0.7,
        max_tokens: 4000,
    };

    /// Short, deterministic output for expense parsing and budget analysis
    pub const ANALYSIS: ModelSettings = ModelSettings {
        temperature: 0.3,
        max_tokens: 2000,
    };
}

/// Runtime configuration read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub request_timeout: Duration,
    pub voice_temp_dir: PathBuf,
    pub log_level: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            supabase_url: None,
            supabase_service_key: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            voice_temp_dir: default_voice_dir(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

fn default_voice_dir() -> PathBuf {
    std::env::temp_dir().join("ai_travel_planner")
}

impl PlannerConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        let request_timeout = match read("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|err| {
                PlannerError::Config(format!("REQUEST_TIMEOUT_SECS must be an integer: {err}"))
            })?),
            None => defaults.request_timeout,
        };

        Ok(Self {
            api_key: read("DEEPSEEK_API_KEY"),
            base_url: read("DEEPSEEK_BASE_URL").unwrap_or(defaults.base_url),
            model: read("DEEPSEEK_MODEL").unwrap_or(defaults.model),
            supabase_url: read("SUPABASE_URL"),
            supabase_service_key: read("SUPABASE_SERVICE_KEY"),
            request_timeout,
            voice_temp_dir: read("VOICE_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.voice_temp_dir),
            log_level: read("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// Fail with every missing required key named at once.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push("DEEPSEEK_API_KEY");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PlannerError::Config(format!(
                "Missing required configuration: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            PlannerError::Config(
                "DEEPSEEK_API_KEY environment variable must be set before calling the model"
                    .to_string(),
            )
        })
    }

    /// Database URL and service key, or a `Config` error naming what is missing.
    pub fn require_store(&self) -> Result<(&str, &str)> {
        match (
            self.supabase_url.as_deref(),
            self.supabase_service_key.as_deref(),
        ) {
            (Some(url), Some(key)) => Ok((url, key)),
            (url, key) => {
                let mut missing = Vec::new();
                if url.is_none() {
                    missing.push("SUPABASE_URL");
                }
                if key.is_none() {
                    missing.push("SUPABASE_SERVICE_KEY");
                }
                Err(PlannerError::Config(format!(
                    "Missing database configuration: {}",
                    missing.join(", ")
                )))
            }
        }
    }

    /// `tracing` level for `log_level`, falling back to INFO on unknown names.
    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level
            .parse::<tracing::Level>()
            .unwrap_or(tracing::Level::INFO)
    }
}
