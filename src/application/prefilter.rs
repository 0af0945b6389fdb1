//! Market-cap pre-filter.
//!
//! Thins the universe before the expensive fetch/score phases by dropping
//! tickers whose market cap is known to sit below the floor. Metadata is
//! best-effort, so a ticker with no reported cap is kept rather than
//! silently excluded. Lookups go through the metadata cache, so repeated
//! filter passes within the TTL cost no provider calls.

use std::sync::Arc;

use crate::cache::MetaCache;
use crate::ports::BarsProvider;
use crate::runner::BoundedRunner;

#[derive(Debug, Clone)]
pub struct MarketCapPrefilter {
    min_market_cap: f64,
}

impl MarketCapPrefilter {
    pub fn new(min_market_cap: f64) -> Self {
        Self { min_market_cap }
    }

    /// Return the tickers that pass the floor, preserving input order.
    pub async fn apply<P: BarsProvider + 'static>(
        &self,
        provider: Arc<P>,
        meta_cache: Arc<MetaCache>,
        runner: &BoundedRunner,
        tickers: Vec<String>,
    ) -> Vec<String> {
        let total = tickers.len();
        let floor = self.min_market_cap;

        let mut passed = runner
            .run(
                tickers.clone(),
                move |ticker| {
                    let provider = provider.clone();
                    let meta_cache = meta_cache.clone();
                    async move {
                        match meta_cache.get_or_fetch(&*provider, &ticker).await {
                            Ok(meta) => match meta.market_cap {
                                Some(cap) if cap < floor => None,
                                _ => Some(ticker),
                            },
                            // Unknown cap keeps the ticker in play
                            Err(_) => Some(ticker),
                        }
                    }
                },
                None,
            )
            .await;

        tracing::info!(
            "Market-cap pre-filter kept {}/{} tickers",
            passed.len(),
            total
        );

        // Runner output is completion-ordered; restore input order.
        passed.sort_by_key(|t| tickers.iter().position(|x| x == t));
        passed
    }
}
