pub mod aggregator;
pub mod api;
pub mod breadcrumb;
pub mod changeset;
pub mod config;
pub mod config_store;
pub mod data_models;
pub mod error;
pub mod fetcher;
pub mod settings;
pub mod watcher;
