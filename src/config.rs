use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Cache key holding the sum of all subscription prices.
    pub price_cache_key: String,
    pub price_cache_ttl_secs: u64,
    /// Upper bound on concurrently running recompute/comment tasks.
    pub task_workers: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            port: parse_var("PORT", 8080)?,
            pricing: PricingConfig {
                price_cache_key: env::var("PRICE_CACHE_KEY")
                    .unwrap_or_else(|_| "price_cache".to_string()),
                price_cache_ttl_secs: parse_var("PRICE_CACHE_TTL_SECS", 60 * 60)?,
                task_workers: parse_var("TASK_WORKERS", 4)?,
            },
        })
    }
}

impl PricingConfig {
    pub fn price_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.price_cache_ttl_secs)
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            price_cache_key: "price_cache".to_string(),
            price_cache_ttl_secs: 60 * 60,
            task_workers: 4,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", name, value)),
        Err(_) => Ok(default),
    }
}
