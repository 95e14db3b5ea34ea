//! Multi-page search: one synchronous first page, then a concurrent fan-out
//! over the remaining pages, merged back in start-index order.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::data_models::{AggregateResult, SearchRequest, SearchResult, round2};
use crate::fetcher::PageSource;

pub struct Aggregator<S> {
    source: Arc<S>,
    page_size: u32,
    max_concurrency: usize,
}

impl<S: PageSource> Aggregator<S> {
    pub fn new(source: S, page_size: u32) -> Self {
        Self {
            source: Arc::new(source),
            page_size: page_size.max(1),
            max_concurrency: usize::MAX,
        }
    }

    /// Upper bound on simultaneous page fetches. The effective bound is the
    /// smaller of this and the request's max pages.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn aggregate(&self, request: &SearchRequest) -> AggregateResult {
        let first = self.source.fetch(request, 1).await;

        let total_results = first.total_results;
        let mut search_time = first.search_time;
        let remaining = remaining_pages(request.max_pages, total_results, self.page_size);

        let mut pages: BTreeMap<u32, Vec<SearchResult>> = BTreeMap::new();
        pages.insert(1, first.results);

        match first.next_start {
            Some(next_start) if remaining > 0 => {
                let starts = page_starts(next_start, remaining, self.page_size);
                tracing::debug!(query = %request.query, ?starts, "fanning out page fetches");
                for (start, page_time, results) in self.fetch_concurrently(request, starts).await {
                    search_time += page_time;
                    pages.insert(start, results);
                }
            }
            _ => {}
        }

        let results: Vec<SearchResult> = pages.into_values().flatten().collect();
        tracing::info!(
            query = %request.query,
            count = results.len(),
            total_results,
            "aggregated search results"
        );

        AggregateResult {
            results,
            total_results,
            search_time: round2(search_time),
        }
    }

    /// Fetches every start index on its own task. A task that dies is logged
    /// and its page is left out; siblings keep running.
    async fn fetch_concurrently(
        &self,
        request: &SearchRequest,
        starts: Vec<u32>,
    ) -> Vec<(u32, f64, Vec<SearchResult>)> {
        let permits = self.max_concurrency.min(request.max_pages.max(1) as usize);
        let semaphore = Arc::new(Semaphore::new(permits));
        let request = Arc::new(request.clone());
        let mut tasks = JoinSet::new();

        for start in starts {
            let source = self.source.clone();
            let request = request.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let page = source.fetch(&request, start).await;
                (start, page.search_time, page.results)
            });
        }

        let mut fetched = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(page) => fetched.push(page),
                Err(e) => tracing::error!(error = %e, "result page task failed"),
            }
        }
        fetched
    }
}

/// Pages still worth fetching after the first one: never more than the
/// caller's budget, never past what the API says exists.
pub fn remaining_pages(max_pages: u32, total_results: u64, page_size: u32) -> u32 {
    let budget = u64::from(max_pages.saturating_sub(1));
    let available = total_results
        .saturating_sub(1)
        .div_ceil(u64::from(page_size.max(1)));
    // budget fits in u32, so the minimum does too
    budget.min(available) as u32
}

pub fn page_starts(next_start: u32, remaining: u32, page_size: u32) -> Vec<u32> {
    (0..remaining)
        .map(|i| next_start.saturating_add(i.saturating_mul(page_size)))
        .collect()
}
