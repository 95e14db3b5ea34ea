use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use scour::aggregator::Aggregator;
use scour::data_models::{ResultPage, SearchRequest, SearchResult, SortMode};
use scour::fetcher::PageSource;

mod test_helpers {
    use super::*;

    pub const PAGE_SIZE: u32 = 10;

    pub fn request(max_pages: u32) -> SearchRequest {
        SearchRequest {
            api_key: "key".into(),
            engine_id: "cx".into(),
            query: "rust async".into(),
            sort: SortMode::Relevance,
            max_pages,
        }
    }

    pub fn result(start: u32, i: u32) -> SearchResult {
        SearchResult {
            title: format!("result {start}-{i}"),
            link: format!("https://example.com/{start}/{i}"),
            display_link: "example.com".into(),
            snippet: String::new(),
            breadcrumb_trail: format!("example.com > {start}"),
        }
    }

    pub fn page(start: u32, count: u32, total: u64, search_time: f64) -> ResultPage {
        ResultPage {
            start,
            results: (0..count).map(|i| result(start, i)).collect(),
            next_start: Some(start + PAGE_SIZE),
            total_results: total,
            search_time,
        }
    }

    /// Scripted pages per start index. Later pages are delayed so that they
    /// complete in reverse order; `panic_on` starts blow up inside the task.
    pub struct ScriptedSource {
        pub pages: HashMap<u32, ResultPage>,
        pub delays_ms: HashMap<u32, u64>,
        pub panic_on: Vec<u32>,
        pub calls: Mutex<Vec<u32>>,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl ScriptedSource {
        pub fn new(pages: Vec<ResultPage>) -> Self {
            Self {
                pages: pages.into_iter().map(|p| (p.start, p)).collect(),
                delays_ms: HashMap::new(),
                panic_on: Vec::new(),
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        pub fn with_delays(mut self, delays: &[(u32, u64)]) -> Self {
            self.delays_ms = delays.iter().copied().collect();
            self
        }

        pub fn panicking_on(mut self, starts: &[u32]) -> Self {
            self.panic_on = starts.to_vec();
            self
        }

        pub fn calls(&self) -> Vec<u32> {
            let mut calls = self.calls.lock().unwrap().clone();
            calls.sort_unstable();
            calls
        }
    }

    impl PageSource for ScriptedSource {
        async fn fetch(&self, _request: &SearchRequest, start: u32) -> ResultPage {
            self.calls.lock().unwrap().push(start);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(ms) = self.delays_ms.get(&start) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.panic_on.contains(&start) {
                panic!("scripted failure for start {start}");
            }
            self.pages
                .get(&start)
                .cloned()
                .unwrap_or_else(|| ResultPage::empty(start))
        }
    }

    pub fn expected(pages: &[(u32, u32)]) -> Vec<SearchResult> {
        pages
            .iter()
            .flat_map(|(start, count)| (0..*count).map(move |i| result(*start, i)))
            .collect()
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_single_page_budget_returns_first_page_only() {
    let source = ScriptedSource::new(vec![page(1, 10, 500, 0.31), page(11, 10, 500, 0.2)]);
    let aggregator = Aggregator::new(source, PAGE_SIZE);

    let aggregate = aggregator.aggregate(&request(1)).await;

    assert_eq!(aggregate.results, expected(&[(1, 10)]));
    assert_eq!(aggregate.total_results, 500);
    assert_eq!(aggregate.search_time, 0.31);
    assert_eq!(aggregator.source().calls(), vec![1]);
}

#[tokio::test]
async fn test_merges_in_start_order_despite_arrival_order() {
    let source = ScriptedSource::new(vec![
        page(1, 10, 1000, 0.1),
        page(11, 10, 1000, 0.1),
        page(21, 10, 1000, 0.1),
        page(31, 10, 1000, 0.1),
    ])
    // 11 finishes last, 31 first
    .with_delays(&[(11, 60), (21, 30), (31, 0)]);
    let aggregator = Aggregator::new(source, PAGE_SIZE);

    let aggregate = aggregator.aggregate(&request(4)).await;

    assert_eq!(aggregate.results, expected(&[(1, 10), (11, 10), (21, 10), (31, 10)]));
    assert_eq!(aggregate.total_results, 1000);
    assert_eq!(aggregate.search_time, 0.4);
    assert_eq!(aggregator.source().calls(), vec![1, 11, 21, 31]);
}

#[tokio::test]
async fn test_fan_out_limited_by_reported_total() {
    let source = ScriptedSource::new(vec![page(1, 10, 15, 0.1), page(11, 5, 15, 0.1)]);
    let aggregator = Aggregator::new(source, PAGE_SIZE);

    let aggregate = aggregator.aggregate(&request(10)).await;

    // ceil((15 - 1) / 10) = 2 more pages; the second one comes back empty
    assert_eq!(aggregate.results, expected(&[(1, 10), (11, 5)]));
    assert_eq!(aggregator.source().calls(), vec![1, 11, 21]);
}

#[tokio::test]
async fn test_zero_total_fetches_nothing_more() {
    let mut first = page(1, 0, 0, 0.05);
    first.next_start = None;
    let aggregator = Aggregator::new(ScriptedSource::new(vec![first]), PAGE_SIZE);

    let aggregate = aggregator.aggregate(&request(10)).await;

    assert!(aggregate.results.is_empty());
    assert_eq!(aggregate.total_results, 0);
    assert_eq!(aggregate.search_time, 0.05);
    assert_eq!(aggregator.source().calls(), vec![1]);
}

#[tokio::test]
async fn test_missing_next_start_skips_fan_out() {
    let mut first = page(1, 10, 1000, 0.2);
    first.next_start = None;
    let aggregator = Aggregator::new(ScriptedSource::new(vec![first]), PAGE_SIZE);

    let aggregate = aggregator.aggregate(&request(5)).await;

    assert_eq!(aggregate.results, expected(&[(1, 10)]));
    assert_eq!(aggregator.source().calls(), vec![1]);
}

#[tokio::test]
async fn test_failed_first_page_yields_empty_aggregate() {
    // the default page: nothing, no next start, zero total
    let aggregator = Aggregator::new(ScriptedSource::new(vec![]), PAGE_SIZE);

    let aggregate = aggregator.aggregate(&request(10)).await;

    assert!(aggregate.results.is_empty());
    assert_eq!(aggregate.total_results, 0);
    assert_eq!(aggregate.search_time, 0.0);
}

#[tokio::test]
async fn test_panicking_page_is_dropped_and_siblings_survive() {
    let source = ScriptedSource::new(vec![
        page(1, 10, 1000, 0.1),
        page(11, 10, 1000, 0.1),
        page(21, 10, 1000, 0.1),
        page(31, 10, 1000, 0.1),
    ])
    .panicking_on(&[21]);
    let aggregator = Aggregator::new(source, PAGE_SIZE);

    let aggregate = aggregator.aggregate(&request(4)).await;

    assert_eq!(aggregate.results, expected(&[(1, 10), (11, 10), (31, 10)]));
    assert_eq!(aggregate.search_time, 0.3);
}

#[tokio::test]
async fn test_default_page_counts_as_empty() {
    // start 21 is not scripted and comes back as the empty default page
    let source = ScriptedSource::new(vec![
        page(1, 10, 1000, 0.1),
        page(11, 10, 1000, 0.1),
        page(31, 10, 1000, 0.1),
    ]);
    let aggregator = Aggregator::new(source, PAGE_SIZE);

    let aggregate = aggregator.aggregate(&request(4)).await;

    assert_eq!(aggregate.results, expected(&[(1, 10), (11, 10), (31, 10)]));
    assert_eq!(aggregate.search_time, 0.3);
}

#[tokio::test]
async fn test_search_time_summed_and_rounded() {
    let source = ScriptedSource::new(vec![
        page(1, 1, 1000, 0.333),
        page(11, 1, 1000, 0.333),
        page(21, 1, 1000, 0.333),
    ]);
    let aggregator = Aggregator::new(source, PAGE_SIZE);

    let aggregate = aggregator.aggregate(&request(3)).await;

    assert_eq!(aggregate.search_time, 1.0);
}

#[tokio::test]
async fn test_concurrency_cap_is_honoured() {
    let pages: Vec<ResultPage> = (0..8).map(|i| page(1 + i * PAGE_SIZE, 1, 1000, 0.0)).collect();
    let delays: Vec<(u32, u64)> = (1..8).map(|i| (1 + i * PAGE_SIZE, 20)).collect();
    let source = ScriptedSource::new(pages).with_delays(&delays);
    let aggregator = Aggregator::new(source, PAGE_SIZE).with_max_concurrency(2);

    let aggregate = aggregator.aggregate(&request(8)).await;

    assert_eq!(aggregate.results.len(), 8);
    assert!(aggregator.source().max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_total_comes_from_first_page() {
    let source = ScriptedSource::new(vec![page(1, 10, 42, 0.1), page(11, 10, 9999, 0.1)]);
    let aggregator = Aggregator::new(source, PAGE_SIZE);

    let aggregate = aggregator.aggregate(&request(2)).await;

    assert_eq!(aggregate.total_results, 42);
}
