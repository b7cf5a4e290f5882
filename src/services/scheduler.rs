//! Background timers: watchlist re-analysis and cache sweep.

use super::analyzer::Analyzer;
use super::cache::AnalysisCache;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Re-analyze every watchlist symbol every `period`.
///
/// The first run happens immediately. A failure for one symbol is logged and
/// never stops the others or the loop.
pub fn spawn_scheduler(
    analyzer: Arc<Analyzer>,
    watchlist: Vec<String>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Scheduler started: {} symbols every {:?}",
            watchlist.len(),
            period
        );
        loop {
            run_watchlist(&analyzer, &watchlist).await;
            tokio::time::sleep(period).await;
        }
    })
}

/// One scheduler pass. Returns how many symbols were analyzed successfully.
pub async fn run_watchlist(analyzer: &Analyzer, watchlist: &[String]) -> usize {
    let outcomes = join_all(watchlist.iter().map(|symbol| async move {
        (symbol, analyzer.analyze(symbol).await)
    }))
    .await;

    let mut succeeded = 0;
    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(analysis) => {
                succeeded += 1;
                debug!(
                    "Scheduled analysis for {}: {} (cached: {})",
                    symbol, analysis.result.decision.action, analysis.cached
                );
            }
            Err(e) => error!("Scheduled analysis for {} failed: {}", symbol, e),
        }
    }

    info!(
        "Scheduler pass complete: {}/{} symbols analyzed",
        succeeded,
        watchlist.len()
    );
    succeeded
}

/// Evict expired cache entries every `period`.
pub fn spawn_cache_sweep(cache: Arc<AnalysisCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(period).await;
            let evicted = cache.sweep();
            if evicted > 0 {
                info!("Cache sweep evicted {} expired analyses", evicted);
            } else {
                debug!("Cache sweep: nothing expired ({} entries)", cache.len());
            }
        }
    })
}
