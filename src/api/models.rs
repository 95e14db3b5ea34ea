use serde::{Deserialize, Serialize};

use crate::data_models::{SearchResult, SortMode};
use crate::settings::StoreKind;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Name of the stored API key to use.
    pub api_key: String,
    /// Name of the stored search engine id to use.
    pub engine: String,
    pub query: String,
    #[serde(default, alias = "sort")]
    pub sort_by: SortMode,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

fn default_max_pages() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total_results: u64,
    pub search_time: f64,
}

#[derive(Debug, Serialize)]
pub struct SettingsUpdateResponse {
    pub success: bool,
    /// False when the changeset was empty and the file was left alone.
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct StoreListing {
    pub store: StoreKind,
    pub names: Vec<String>,
}
