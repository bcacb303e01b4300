use std::str::FromStr;

use crate::error::AppError;

const DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3-8B-Instruct-Lite";
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Service configuration loaded explicitly from environment variables.
///
/// Upstream connection settings live in `OpenAiClientConfig`; this only
/// covers how recommendations are requested and how the service is exposed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model ID passed to the chat completions endpoint.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Listen address for the HTTP API (e.g. "0.0.0.0:5000"). `None` serves MCP on stdio.
    pub http_addr: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            http_addr: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `ADVISOR_MODEL`: model ID
    /// - `ADVISOR_TEMPERATURE`: sampling temperature, 0.0 to 2.0
    /// - `ADVISOR_MAX_TOKENS`: completion token limit, greater than zero
    /// - `ADVISOR_HTTP_ADDR`: serve the HTTP API on this address instead of MCP
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let model = non_empty_var("ADVISOR_MODEL").unwrap_or(defaults.model);
        let temperature =
            parse_var::<f32>("ADVISOR_TEMPERATURE")?.unwrap_or(defaults.temperature);
        let max_tokens = parse_var::<u32>("ADVISOR_MAX_TOKENS")?.unwrap_or(defaults.max_tokens);
        let http_addr = non_empty_var("ADVISOR_HTTP_ADDR");

        let config = Self {
            model,
            temperature,
            max_tokens,
            http_addr,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::Config(format!(
                "ADVISOR_TEMPERATURE must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(AppError::Config(
                "ADVISOR_MAX_TOKENS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, AppError> {
    non_empty_var(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| AppError::Config(format!("{name} has an invalid value: {raw}")))
        })
        .transpose()
}
