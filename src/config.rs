use crate::sources::ProviderKind;
use crate::types::Interval;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Risk appetite passed through to the decision step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(RiskTolerance::Low),
            "medium" => Some(RiskTolerance::Medium),
            "high" => Some(RiskTolerance::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTolerance::Low => write!(f, "low"),
            RiskTolerance::Medium => write!(f, "medium"),
            RiskTolerance::High => write!(f, "high"),
        }
    }
}

/// Parameters of every analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Symbol analyzed when none is given.
    pub default_symbol: String,
    pub interval: Interval,
    /// Candles fetched per analysis.
    pub candle_limit: usize,
    pub leverage: f64,
    /// Position size in quote currency.
    pub position_size: f64,
    pub risk_tolerance: RiskTolerance,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            default_symbol: "BTCUSDT".to_string(),
            interval: Interval::OneHour,
            candle_limit: 100,
            leverage: 10.0,
            position_size: 1000.0,
            risk_tolerance: RiskTolerance::Medium,
        }
    }
}

/// API keys and base URL overrides for the market data providers.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// Candle providers in fallback order.
    pub price_providers: Vec<ProviderKind>,
    /// Fundamentals providers in fallback order.
    pub fundamentals_providers: Vec<ProviderKind>,
    /// Per-call timeout for every provider request.
    pub timeout_ms: u64,
    /// Binance API key (optional, public endpoints work without).
    pub binance_api_key: Option<String>,
    /// CoinMarketCap API key; the provider is skipped without it.
    pub cmc_api_key: Option<String>,
    /// CoinGecko API key (optional, demo tier).
    pub coingecko_api_key: Option<String>,
    pub binance_base_url: Option<String>,
    pub coinbase_base_url: Option<String>,
    pub coingecko_base_url: Option<String>,
    pub cmc_base_url: Option<String>,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// OpenAI-compatible chat model used by the decision step.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// No key disables the decision step.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.1,
            max_tokens: 1000,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    pub analysis: AnalysisSettings,
    /// How long a completed analysis is served from cache.
    pub cache_ttl_secs: u64,
    /// Period of the expired-entry sweep.
    pub cache_sweep_interval_secs: u64,
    /// Period of the watchlist re-analysis.
    pub scheduler_interval_secs: u64,
    /// Symbols re-analyzed by the scheduler.
    pub watchlist: Vec<String>,
    pub providers: ProviderConfig,
    pub model: ModelConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let defaults = AnalysisSettings::default();
        let interval = match get("DEFAULT_INTERVAL") {
            Some(raw) => Interval::parse(&raw).unwrap_or_else(|| {
                warn!("Unknown DEFAULT_INTERVAL {:?}, using {}", raw, defaults.interval);
                defaults.interval
            }),
            None => defaults.interval,
        };
        let risk_tolerance = match get("RISK_TOLERANCE") {
            Some(raw) => RiskTolerance::parse(&raw).unwrap_or_else(|| {
                warn!("Unknown RISK_TOLERANCE {:?}, using {}", raw, defaults.risk_tolerance);
                defaults.risk_tolerance
            }),
            None => defaults.risk_tolerance,
        };

        let model_defaults = ModelConfig::default();

        Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(&get, "PORT", 3000),
            analysis: AnalysisSettings {
                default_symbol: get("DEFAULT_SYMBOL").unwrap_or(defaults.default_symbol),
                interval,
                candle_limit: parsed(&get, "CANDLE_LIMIT", defaults.candle_limit).max(1),
                leverage: parsed(&get, "LEVERAGE", defaults.leverage),
                position_size: parsed(&get, "POSITION_SIZE", defaults.position_size),
                risk_tolerance,
            },
            cache_ttl_secs: parsed(&get, "CACHE_TTL_SECS", 300),
            cache_sweep_interval_secs: parsed(&get, "CACHE_SWEEP_INTERVAL_SECS", 3600).max(1),
            scheduler_interval_secs: parsed(&get, "SCHEDULER_INTERVAL_SECS", 900).max(1),
            watchlist: get("WATCHLIST")
                .map(|s| split_list(&s))
                .unwrap_or_else(|| {
                    ["BTCUSDT", "ETHUSDT", "ADAUSDT", "DOTUSDT"]
                        .iter()
                        .map(|s| s.to_string())
                        .collect()
                }),
            providers: ProviderConfig {
                price_providers: provider_list(
                    get("PRICE_PROVIDERS"),
                    &[ProviderKind::Binance, ProviderKind::Coinbase, ProviderKind::CoinGecko],
                ),
                fundamentals_providers: provider_list(
                    get("FUNDAMENTALS_PROVIDERS"),
                    &[ProviderKind::CoinMarketCap, ProviderKind::CoinGecko],
                ),
                timeout_ms: parsed(&get, "PROVIDER_TIMEOUT_MS", 10_000),
                binance_api_key: get("BINANCE_API_KEY"),
                cmc_api_key: get("COINMARKETCAP_API_KEY"),
                coingecko_api_key: get("COINGECKO_API_KEY"),
                binance_base_url: get("BINANCE_BASE_URL"),
                coinbase_base_url: get("COINBASE_BASE_URL"),
                coingecko_base_url: get("COINGECKO_BASE_URL"),
                cmc_base_url: get("COINMARKETCAP_BASE_URL"),
            },
            model: ModelConfig {
                api_key: get("OPENAI_API_KEY"),
                base_url: get("OPENAI_BASE_URL").unwrap_or(model_defaults.base_url),
                model: get("AI_MODEL").unwrap_or(model_defaults.model),
                temperature: parsed(&get, "AI_TEMPERATURE", model_defaults.temperature),
                max_tokens: parsed(&get, "MAX_TOKENS", model_defaults.max_tokens),
            },
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parsed<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a comma-separated provider list, skipping unknown names.
fn provider_list(raw: Option<String>, default: &[ProviderKind]) -> Vec<ProviderKind> {
    let Some(raw) = raw else {
        return default.to_vec();
    };

    let mut providers = Vec::new();
    for name in split_list(&raw) {
        match ProviderKind::parse(&name) {
            Some(kind) if !providers.contains(&kind) => providers.push(kind),
            Some(_) => {}
            None => warn!("Ignoring unknown provider {:?}", name),
        }
    }
    providers
}
