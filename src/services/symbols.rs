//! Symbol canonicalization shared by the fetchers and the analysis cache.
//!
//! The canonical form of an instrument is its lowercase base asset (`btc`).
//! Every accepted spelling (`BTCUSDT`, `BTC-USD`, `BTC/USDT`, `bitcoin`, `XBT`)
//! resolves to the same [`SymbolInfo`], which also carries the spelling each
//! provider expects.

use crate::error::AnalysisError;
use crate::sources::ProviderKind;
use std::collections::HashMap;

/// Quote currencies stripped from pair spellings, longest first.
const QUOTE_SUFFIXES: &[&str] = &["usdt", "usdc", "busd", "usd"];

/// Known instruments: (canonical, CoinGecko ID, extra aliases).
const KNOWN_SYMBOLS: &[(&str, &str, &[&str])] = &[
    ("btc", "bitcoin", &["xbt"]),
    ("eth", "ethereum", &[]),
    ("bnb", "binancecoin", &[]),
    ("sol", "solana", &[]),
    ("xrp", "ripple", &[]),
    ("doge", "dogecoin", &["xdg"]),
    ("ada", "cardano", &[]),
    ("avax", "avalanche-2", &[]),
    ("dot", "polkadot", &[]),
    ("link", "chainlink", &[]),
    ("matic", "matic-network", &[]),
    ("shib", "shiba-inu", &[]),
    ("ltc", "litecoin", &[]),
    ("trx", "tron", &[]),
    ("atom", "cosmos", &[]),
    ("uni", "uniswap", &[]),
    ("xlm", "stellar", &[]),
    ("bch", "bitcoin-cash", &[]),
    ("near", "near", &[]),
    ("apt", "aptos", &[]),
];

/// Provider spellings of one canonical instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub canonical: String,
    pub binance: String,
    pub coinbase: String,
    pub coingecko: Option<String>,
    pub coinmarketcap: String,
}

impl SymbolInfo {
    /// Spellings derived by exchange convention from a base asset.
    pub fn by_convention(base: &str) -> Self {
        let upper = base.to_uppercase();
        Self {
            canonical: base.to_lowercase(),
            binance: format!("{}USDT", upper),
            coinbase: format!("{}-USD", upper),
            coingecko: None,
            coinmarketcap: upper,
        }
    }

    /// The spelling a given provider expects, if it has one.
    pub fn spelling(&self, provider: ProviderKind) -> Option<&str> {
        match provider {
            ProviderKind::Binance => Some(&self.binance),
            ProviderKind::Coinbase => Some(&self.coinbase),
            ProviderKind::CoinGecko => self.coingecko.as_deref(),
            ProviderKind::CoinMarketCap => Some(&self.coinmarketcap),
        }
    }
}

/// Bidirectional lookup between input spellings, canonical symbols and
/// provider spellings.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: HashMap<String, SymbolInfo>,
    aliases: HashMap<String, String>,
}

impl SymbolTable {
    /// Empty table; only convention-derived symbols resolve.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Register an instrument and all of its spellings.
    pub fn insert(&mut self, info: SymbolInfo, extra_aliases: &[&str]) {
        let canonical = info.canonical.clone();
        let mut spellings = vec![
            info.canonical.clone(),
            info.binance.clone(),
            info.coinbase.clone(),
            info.coinmarketcap.clone(),
        ];
        spellings.extend(info.coingecko.clone());
        spellings.extend(extra_aliases.iter().map(|a| a.to_string()));

        for spelling in spellings {
            self.aliases.insert(compact(&spelling), canonical.clone());
        }
        self.entries.insert(canonical, info);
    }

    /// Resolve any accepted spelling to its canonical instrument.
    pub fn resolve(&self, input: &str) -> Result<SymbolInfo, AnalysisError> {
        let key = compact(input);
        if key.is_empty() {
            return Err(AnalysisError::UnknownSymbol(input.to_string()));
        }

        if let Some(info) = self.lookup(&key) {
            return Ok(info.clone());
        }

        let base = strip_quote(&key).unwrap_or(key.as_str());
        if let Some(info) = self.lookup(base) {
            return Ok(info.clone());
        }

        if is_ticker(base) {
            return Ok(SymbolInfo::by_convention(base));
        }

        Err(AnalysisError::UnknownSymbol(input.to_string()))
    }

    /// Canonical cache key for an input spelling.
    pub fn canonical(&self, input: &str) -> Result<String, AnalysisError> {
        self.resolve(input).map(|info| info.canonical)
    }

    /// Map a provider-specific spelling back to its canonical symbol.
    pub fn from_provider(&self, provider: ProviderKind, spelling: &str) -> Option<String> {
        self.entries
            .values()
            .find(|info| {
                info.spelling(provider)
                    .is_some_and(|s| s.eq_ignore_ascii_case(spelling))
            })
            .map(|info| info.canonical.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, key: &str) -> Option<&SymbolInfo> {
        self.aliases
            .get(key)
            .and_then(|canonical| self.entries.get(canonical))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (canonical, coingecko_id, aliases) in KNOWN_SYMBOLS {
            let mut info = SymbolInfo::by_convention(canonical);
            info.coingecko = Some(coingecko_id.to_string());
            table.insert(info, aliases);
        }
        table
    }
}

/// Lowercase and drop pair separators.
fn compact(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '/' | '_' | ' '))
        .collect::<String>()
        .to_lowercase()
}

fn strip_quote(key: &str) -> Option<&str> {
    QUOTE_SUFFIXES
        .iter()
        .find_map(|suffix| key.strip_suffix(suffix).filter(|base| !base.is_empty()))
}

fn is_ticker(s: &str) -> bool {
    (2..=10).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric())
}
