use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        bind_addr: get_env_or_default("SCOUR_BIND_ADDR", "127.0.0.1:8080"),
        data_dir: PathBuf::from(get_env_or_default("SCOUR_DATA_DIR", "data")),
        api_url: get_env_or_default(
            "SCOUR_API_URL",
            "https://www.googleapis.com/customsearch/v1",
        ),
        page_size: get_parsed_or_default("SCOUR_PAGE_SIZE", 10),
        max_pages: get_parsed_or_default("SCOUR_MAX_PAGES", 10),
        request_timeout_secs: get_parsed_or_default("SCOUR_REQUEST_TIMEOUT_SECS", 10),
    }
});

/// File names of the three stores inside the data directory.
pub mod files {
    pub const API_KEYS: &str = "api_keys.env";
    pub const SEARCH_ENGINES: &str = "search_engines.env";
    pub const PROXIED_DOMAINS: &str = "proxied_domains.txt";
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub api_url: String,
    /// Results per remote page. The Custom Search API caps this at 10.
    pub page_size: u32,
    /// Ceiling for the max-pages value a caller may request.
    pub max_pages: u32,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn api_keys_path(&self) -> PathBuf {
        self.data_dir.join(files::API_KEYS)
    }

    pub fn search_engines_path(&self) -> PathBuf {
        self.data_dir.join(files::SEARCH_ENGINES)
    }

    pub fn proxied_domains_path(&self) -> PathBuf {
        self.data_dir.join(files::PROXIED_DOMAINS)
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_parsed_or_default<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment variable");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_paths_live_in_data_dir() {
        let config = Config {
            bind_addr: "127.0.0.1:0".into(),
            data_dir: PathBuf::from("/srv/scour"),
            api_url: "http://localhost".into(),
            page_size: 10,
            max_pages: 10,
            request_timeout_secs: 5,
        };
        assert_eq!(config.api_keys_path(), PathBuf::from("/srv/scour/api_keys.env"));
        assert_eq!(
            config.search_engines_path(),
            PathBuf::from("/srv/scour/search_engines.env")
        );
        assert_eq!(
            config.proxied_domains_path(),
            PathBuf::from("/srv/scour/proxied_domains.txt")
        );
    }

    #[test]
    fn unset_variable_falls_back_to_default() {
        let value: u32 = get_parsed_or_default("SCOUR_TEST_SURELY_UNSET_VARIABLE", 7);
        assert_eq!(value, 7);
    }
}
