use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::blockchain::digest::{COMPACT_DIGEST_MODULUS, PRIME_DIGEST_MODULUS};
use crate::blockchain::pow::{
    DEFAULT_BUDGET_FACTOR, DEFAULT_PROGRESS_INTERVAL, DEFAULT_TARGET_MODULUS,
};
use crate::blockchain::{MiningLimits, ParamsError, PowParams};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error(transparent)]
    Params(#[from] ParamsError),
}

/// Runtime settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub params: PowParams,
    pub limits: MiningLimits,
    /// Wall-clock budget for a single block mined through the API.
    pub mining_timeout: Option<Duration>,
    pub genesis: bool,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing keys fall back to defaults;
    /// present but unparseable keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse(&lookup, "PORT")?.unwrap_or(8080);

        let digest_modulus = match lookup("DIGEST_MODULUS") {
            None => COMPACT_DIGEST_MODULUS,
            Some(raw) => match raw.trim() {
                "compact" => COMPACT_DIGEST_MODULUS,
                "prime" => PRIME_DIGEST_MODULUS,
                other => other.parse().map_err(|_| ConfigError::Invalid {
                    key: "DIGEST_MODULUS",
                    value: raw.clone(),
                })?,
            },
        };
        let target_modulus = parse(&lookup, "TARGET_MODULUS")?.unwrap_or(DEFAULT_TARGET_MODULUS);
        let params = match parse(&lookup, "SEARCH_OFFSET")? {
            Some(offset) => PowParams::with_offset(digest_modulus, target_modulus, offset)?,
            None => PowParams::new(digest_modulus, target_modulus)?,
        };

        // 0 = search until solved
        let max_attempts = match parse::<u64, _>(&lookup, "MAX_ATTEMPTS")? {
            Some(0) => None,
            Some(n) => Some(n),
            None => Some(target_modulus.saturating_mul(DEFAULT_BUDGET_FACTOR)),
        };
        let progress_interval = match parse::<u64, _>(&lookup, "PROGRESS_INTERVAL")? {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    key: "PROGRESS_INTERVAL",
                    value: "0".to_string(),
                });
            }
            Some(n) => n,
            None => DEFAULT_PROGRESS_INTERVAL,
        };
        let mining_timeout = parse(&lookup, "MINING_TIMEOUT_SECS")?.map(Duration::from_secs);

        Ok(Self {
            host,
            port,
            params,
            limits: MiningLimits {
                max_attempts,
                progress_interval,
            },
            mining_timeout,
            genesis: parse(&lookup, "CHAIN_GENESIS")?.unwrap_or(false),
            seed_demo: parse(&lookup, "SEED_DEMO")?.unwrap_or(true),
        })
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
