pub mod analyzer;
pub mod cache;
pub mod decision;
pub mod fetcher;
pub mod fundamentals;
pub mod indicators;
pub mod normalizer;
pub mod scheduler;
pub mod symbols;

pub use analyzer::{Analysis, Analyzer, MarketSnapshot};
pub use cache::{AnalysisCache, Cache, CacheEntry, Clock, ManualClock, SystemClock};
pub use decision::{
    build_prompt, parse_decision, ChatModelDecisionMaker, DataPackage, DecisionMaker,
    DisabledDecisionMaker,
};
pub use fetcher::SeriesFetcher;
pub use fundamentals::FundamentalsFetcher;
pub use normalizer::normalize;
pub use scheduler::{run_watchlist, spawn_cache_sweep, spawn_scheduler};
pub use symbols::{SymbolInfo, SymbolTable};
