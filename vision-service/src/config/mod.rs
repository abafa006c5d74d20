use once_cell::sync::OnceCell;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-2024-08-06";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TEMPERATURE: f32 = 0.8;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;

static CONFIG: OnceCell<VisionConfig> = OnceCell::new();

#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    /// Deployment environment name (`ENV`), e.g. "development" or "production".
    pub environment: String,
    pub openai: ProviderConfig,
    pub gemini: ProviderConfig,
    pub generation: GenerationDefaults,
    /// Reject unknown `model` values instead of falling back to OpenAI.
    pub strict_model_selection: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationDefaults {
    /// Max output tokens for free text generation.
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound on a single provider call.
    pub provider_timeout_secs: u64,
}

impl GenerationDefaults {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

impl VisionConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let environment = env::var("ENV").unwrap_or_else(|_| "development".to_string());
        let is_prod = environment == "production";

        Ok(VisionConfig {
            common: common_config,
            openai: ProviderConfig {
                api_key: get_required_key("OPENAI_API_KEY")?,
                model: get_env("MODEL_NAME", Some(DEFAULT_OPENAI_MODEL), is_prod)?,
                base_url: get_env("OPENAI_BASE_URL", Some(DEFAULT_OPENAI_BASE_URL), is_prod)?,
            },
            gemini: ProviderConfig {
                api_key: get_required_key("GEMINI_API_KEY")?,
                model: get_env("GEMINI_MODEL_NAME", Some(DEFAULT_GEMINI_MODEL), is_prod)?,
                base_url: get_env("GEMINI_BASE_URL", Some(DEFAULT_GEMINI_BASE_URL), is_prod)?,
            },
            generation: GenerationDefaults {
                max_tokens: parse_env("MAX_TOKENS", DEFAULT_MAX_TOKENS, is_prod)?,
                temperature: parse_env("TEMPERATURE", DEFAULT_TEMPERATURE, is_prod)?,
                provider_timeout_secs: parse_env(
                    "PROVIDER_TIMEOUT_SECS",
                    DEFAULT_PROVIDER_TIMEOUT_SECS,
                    is_prod,
                )?,
            },
            strict_model_selection: parse_env("STRICT_MODEL_SELECTION", false, is_prod)?,
            environment,
        })
    }

    /// Validated configuration, loaded from the environment on first use and
    /// shared for the rest of the process.
    pub fn get() -> Result<&'static VisionConfig, AppError> {
        CONFIG.get_or_try_init(|| {
            let config = Self::load().map_err(|e| {
                tracing::error!("Failed to load settings: {}", e);
                e
            })?;
            tracing::info!(
                environment = %config.environment,
                "Loaded settings"
            );
            Ok(config)
        })
    }
}

fn get_required_key(key: &str) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(AppError::ConfigError(anyhow::anyhow!(
            "Missing required environment variable: {}",
            key
        ))),
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr + ToString,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(&default.to_string()), is_prod)?
        .trim()
        .parse()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: {}", key, e)))
}
