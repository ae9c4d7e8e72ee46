use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;

use crate::constants::{
    DEFAULT_FONT_PATH, DEFAULT_FORECAST_DAYS, DEFAULT_LISTEN_ADDR, DEFAULT_PLOT_HEIGHT,
    DEFAULT_PLOT_WIDTH, DEFAULT_REQUEST_TIMEOUT_SECONDS, DEFAULT_TIMEZONE, GEFS_FILE_PREFIX,
    GEFS_PLUMES_BASE_URL,
};
use crate::summary::IntensityThresholds;

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: String,
    pub base_url: String,
    pub file_prefix: String,
    pub request_timeout: Duration,
    pub timezone: Tz,
    pub forecast_days: u32,
    pub plot_width: u32,
    pub plot_height: u32,
    pub font_path: PathBuf,
    pub thresholds: IntensityThresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            base_url: normalize_base_url(GEFS_PLUMES_BASE_URL),
            file_prefix: GEFS_FILE_PREFIX.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            timezone: chrono_tz::US::Eastern,
            forecast_days: DEFAULT_FORECAST_DAYS,
            plot_width: DEFAULT_PLOT_WIDTH,
            plot_height: DEFAULT_PLOT_HEIGHT,
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
            thresholds: IntensityThresholds::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = env_string("GEFS_LISTEN_ADDR", DEFAULT_LISTEN_ADDR);
        let base_url = normalize_base_url(&env_string("GEFS_BASE_URL", GEFS_PLUMES_BASE_URL));
        let file_prefix = env_string("GEFS_FILE_PREFIX", GEFS_FILE_PREFIX);
        let request_timeout = Duration::from_secs(env_u64(
            "GEFS_REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?);
        let timezone = parse_timezone(&env_string("GEFS_TIMEZONE", DEFAULT_TIMEZONE))?;
        let forecast_days = env_u32("GEFS_FORECAST_DAYS", DEFAULT_FORECAST_DAYS)?;
        let plot_width = env_u32("GEFS_PLOT_WIDTH", DEFAULT_PLOT_WIDTH)?;
        let plot_height = env_u32("GEFS_PLOT_HEIGHT", DEFAULT_PLOT_HEIGHT)?;
        let font_path = PathBuf::from(env_string("GEFS_FONT_PATH", DEFAULT_FONT_PATH));

        Ok(Self {
            listen_addr,
            base_url,
            file_prefix,
            request_timeout,
            timezone,
            forecast_days,
            plot_width,
            plot_height,
            font_path,
            thresholds: IntensityThresholds::default(),
        })
    }
}

pub fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|error| anyhow!("Unknown GEFS_TIMEZONE {name}: {error}"))
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {}={} as u64", name, value)),
        Err(_) => Ok(default),
    }
}

fn env_u32(name: &str, default: u32) -> Result<u32> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Failed to parse {}={} as u32", name, value)),
        Err(_) => Ok(default),
    }
}
