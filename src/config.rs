use crate::engine::EngineError;
use log::warn;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://scenario.db?mode=rwc";

pub fn database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Whether the poller ranks runs per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FairnessMode {
    /// Rank when the store supports window functions.
    Auto,
    On,
    Off,
}

impl FromStr for FairnessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(FairnessMode::Auto),
            "on" | "true" | "1" => Ok(FairnessMode::On),
            "off" | "false" | "0" => Ok(FairnessMode::Off),
            other => Err(format!("unknown fairness mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    pub fairness_window: u64,
    pub fairness: FairnessMode,
    /// Storage errors stop the loop instead of being logged and retried.
    pub debug: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(4),
            fairness_window: 8,
            fairness: FairnessMode::Auto,
            debug: false,
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            poll_interval: Duration::from_secs(parse_or(
                &get,
                "SCHEDULER_POLL_INTERVAL_SECS",
                d.poll_interval.as_secs(),
            )),
            fairness_window: parse_or(&get, "SCHEDULER_FAIRNESS_WINDOW", d.fairness_window).max(1),
            fairness: parse_or(&get, "SCHEDULER_FAIRNESS", d.fairness),
            debug: get("SCHEDULER_DEBUG")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(d.debug),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub base_url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// `host:port` is taken as a socks5h proxy.
    pub proxy: Option<String>,
    /// Fallback wait between status polls when the engine sends no Retry-After.
    pub poll_interval: Duration,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let base_url = get("SCENARIO_ENGINE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or(EngineError::MissingEnv("SCENARIO_ENGINE_URL"))?;
        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            user: get("SCENARIO_ENGINE_USER").filter(|s| !s.is_empty()),
            password: get("SCENARIO_ENGINE_PASSWORD").filter(|s| !s.is_empty()),
            proxy: get("SCENARIO_ENGINE_PROXY")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            poll_interval: Duration::from_secs(parse_or(&get, "SCENARIO_ENGINE_POLL_SECS", 5)),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    /// Smallest share of a region's land a regime needs before the region
    /// counts as supporting it.
    pub min_share: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { min_share: 0.01 }
    }
}

impl ClassifierConfig {
    pub fn from_env() -> Self {
        Self {
            min_share: parse_or(
                &|k: &str| std::env::var(k).ok(),
                "CLASSIFIER_MIN_SHARE",
                Self::default().min_share,
            ),
        }
    }
}

fn parse_or<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match get(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!("Ignoring invalid {}='{}'", key, raw);
                default
            }
        },
    }
}
