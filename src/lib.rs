pub mod analyzer;
pub mod cli_args;
pub mod config;
pub mod credentials;
pub mod crop;
pub mod export;
pub mod fake_api;
pub mod fetcher;
pub mod http_client;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod retry;
pub mod riot_api;
pub mod stats;
pub mod store;
