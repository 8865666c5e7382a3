use thiserror::Error;

pub const DEFAULT_MODEL_NAME: &str = "sentence-transformers/distiluse-base-multilingual-cased";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
/// Largest `/embed` body accepted.
pub const MAX_PAYLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Process settings, resolved once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub model_name: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // empty values count as unset
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match get("PORT") {
            Some(value) => parse("PORT", value)?,
            None => DEFAULT_PORT,
        };

        Ok(Config {
            model_name: get("MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL_NAME.to_owned()),
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port,
        })
    }
}

fn parse<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
        key,
        reason: err.to_string(),
        value,
    })
}
