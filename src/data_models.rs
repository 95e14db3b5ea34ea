use serde::{Deserialize, Serialize};

/// Result ordering requested from the remote API.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    #[serde(alias = "")]
    Relevance,
    Date,
}

impl SortMode {
    /// Value of the `sort` query parameter. Relevance is the API default and
    /// is requested with an empty string.
    pub fn as_param(&self) -> &'static str {
        match self {
            SortMode::Relevance => "",
            SortMode::Date => "date",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub api_key: String,
    pub engine_id: String,
    pub query: String,
    pub sort: SortMode,
    pub max_pages: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub display_link: String,
    pub snippet: String,
    pub breadcrumb_trail: String,
}

/// One page as returned by a single remote call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPage {
    pub start: u32,
    pub results: Vec<SearchResult>,
    pub next_start: Option<u32>,
    pub total_results: u64,
    /// Seconds reported by the API, rounded to two decimals.
    pub search_time: f64,
}

impl ResultPage {
    /// The page used when a fetch fails: nothing found, nothing to follow.
    pub fn empty(start: u32) -> ResultPage {
        ResultPage {
            start,
            ..Default::default()
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct AggregateResult {
    pub results: Vec<SearchResult>,
    pub total_results: u64,
    pub search_time: f64,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Custom Search JSON API wire format
// =============================================================================

/// Top level of a Custom Search response. Every field is optional: missing
/// data turns into defaults instead of a decode failure.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    #[serde(default)]
    pub items: Vec<ApiItem>,
    pub queries: Option<ApiQueries>,
    pub search_information: Option<ApiSearchInformation>,
    pub error: Option<ApiErrorBody>,
}

impl ApiResponse {
    pub fn next_start(&self) -> Option<u32> {
        self.queries
            .as_ref()?
            .next_page
            .first()?
            .start_index
            .filter(|start| *start > 0)
    }

    pub fn total_results(&self) -> u64 {
        self.search_information
            .as_ref()
            .and_then(|info| info.total_results.as_ref())
            .and_then(|total| match total {
                serde_json::Value::String(text) => text.trim().parse().ok(),
                serde_json::Value::Number(number) => number.as_u64(),
                _ => None,
            })
            .unwrap_or(0)
    }

    pub fn search_time(&self) -> f64 {
        self.search_information
            .as_ref()
            .and_then(|info| match info.search_time.as_ref()? {
                serde_json::Value::Number(number) => number.as_f64(),
                serde_json::Value::String(text) => text.trim().parse().ok(),
                _ => None,
            })
            .map(round2)
            .unwrap_or(0.0)
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiItem {
    pub title: Option<String>,
    pub html_title: Option<String>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub display_link: String,
    pub snippet: Option<String>,
    pub html_snippet: Option<String>,
    pub pagemap: Option<Pagemap>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct Pagemap {
    #[serde(default)]
    pub listitem: Vec<ListItem>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct ListItem {
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiQueries {
    #[serde(default)]
    pub next_page: Vec<ApiPageInfo>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiPageInfo {
    pub start_index: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiSearchInformation {
    /// Usually a numeric string, sometimes a bare number. Kept raw so that a
    /// surprising type costs only this field.
    pub total_results: Option<serde_json::Value>,
    pub search_time: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}
