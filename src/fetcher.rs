//! Single-page client for the Custom Search JSON API.

use std::future::Future;
use std::time::Duration;

use crate::breadcrumb;
use crate::config::Config;
use crate::data_models::{ApiItem, ApiResponse, ResultPage, SearchRequest, SearchResult};
use crate::error::FetchError;

/// Anything that can produce one page of results for a start index.
///
/// Implementations must not fail: a page that cannot be fetched is reported
/// as [`ResultPage::empty`].
pub trait PageSource: Send + Sync + 'static {
    fn fetch(
        &self,
        request: &SearchRequest,
        start: u32,
    ) -> impl Future<Output = ResultPage> + Send;
}

pub struct PageFetcher {
    client: reqwest::Client,
    api_url: String,
}

impl PageFetcher {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> PageFetcher {
        PageFetcher {
            client,
            api_url: api_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<PageFetcher, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(PageFetcher::new(client, config.api_url.clone()))
    }

    async fn try_fetch(&self, request: &SearchRequest, start: u32) -> Result<ResultPage, FetchError> {
        let start_param = start.to_string();
        let body = self
            .client
            .get(&self.api_url)
            .query(&[
                ("key", request.api_key.as_str()),
                ("cx", request.engine_id.as_str()),
                ("q", request.query.as_str()),
                ("start", start_param.as_str()),
                ("sort", request.sort.as_param()),
            ])
            .send()
            .await?
            .bytes()
            .await?;

        let response: ApiResponse = serde_json::from_slice(&body)?;
        if let Some(error) = response.error {
            return Err(FetchError::Api {
                code: error.code,
                message: error.message,
            });
        }

        Ok(ResultPage {
            start,
            results: response.items.iter().map(to_search_result).collect(),
            next_start: response.next_start(),
            total_results: response.total_results(),
            search_time: response.search_time(),
        })
    }
}

impl PageSource for PageFetcher {
    async fn fetch(&self, request: &SearchRequest, start: u32) -> ResultPage {
        match self.try_fetch(request, start).await {
            Ok(page) => {
                tracing::debug!(
                    start,
                    count = page.results.len(),
                    total = page.total_results,
                    "fetched result page"
                );
                page
            }
            Err(FetchError::Api { code, message }) => {
                tracing::error!(start, code, %message, "search API reported an error");
                ResultPage::empty(start)
            }
            Err(e) => {
                tracing::error!(start, error = %e, "failed to fetch result page");
                ResultPage::empty(start)
            }
        }
    }
}

/// Maps one API item to a result. The HTML variants of title and snippet keep
/// the API's highlighting; plain text is the fallback.
pub fn to_search_result(item: &ApiItem) -> SearchResult {
    SearchResult {
        title: item
            .html_title
            .clone()
            .or_else(|| item.title.clone())
            .unwrap_or_default(),
        link: item.link.clone(),
        display_link: item.display_link.clone(),
        snippet: item
            .html_snippet
            .clone()
            .or_else(|| item.snippet.clone())
            .unwrap_or_default(),
        breadcrumb_trail: breadcrumb::build(item),
    }
}
