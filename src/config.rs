//! Process configuration, read once at startup.

use std::str::FromStr;

use thiserror::Error;

use crate::analyzer::prompt::PromptOptions;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1500;
pub const DEFAULT_MAIL_RELAY_URL: &str = "https://api.resend.com/emails";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub relay_url: String,
    pub api_key: String,
    pub sender: String,
    pub recipient: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub body_limit: usize,
    pub gemini: GeminiConfig,
    pub prompt: PromptOptions,
    pub mail: MailConfig,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        Ok(Self {
            bind_addr: env.or("BIND_ADDR", DEFAULT_BIND_ADDR),
            body_limit: env.parsed("BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT)?,
            gemini: GeminiConfig {
                api_key: env.required("GEMINI_API_KEY")?,
                model: env.or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                base_url: env.or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
                max_output_tokens: env.parsed("GEMINI_MAX_OUTPUT_TOKENS", DEFAULT_MAX_OUTPUT_TOKENS)?,
            },
            prompt: PromptOptions {
                include_location: env.flag("ANALYZER_INCLUDE_LOCATION", true)?,
                estimate_address: env.flag("ANALYZER_ESTIMATE_ADDRESS", false)?,
                estimate_position: env.flag("ANALYZER_ESTIMATE_POSITION", false)?,
            },
            mail: MailConfig {
                relay_url: env.or("MAIL_RELAY_URL", DEFAULT_MAIL_RELAY_URL),
                api_key: env.required("MAIL_RELAY_API_KEY")?,
                sender: env.required("EMAIL_USER")?,
                recipient: env.required("EMAIL_RECEIVER")?,
            },
        })
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn parsed<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value
                .parse::<T>()
                .map_err(|_| ConfigError::Invalid { name, value }),
        }
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid { name, value }),
            },
        }
    }
}
