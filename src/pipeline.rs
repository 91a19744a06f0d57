use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::analyzer::Analyzer;
use crate::config::Config;
use crate::credentials::load_api_token;
use crate::export::{ExportReport, export_dataset_xlsx};
use crate::fake_api::FakeMatchApi;
use crate::fetcher::{FetchOptions, FetchSummary, MatchFetcher};
use crate::model::AnalysisDataset;
use crate::report::write_report;
use crate::riot_api::{MatchApi, RiotApiClient};
use crate::store;

const FAKE_MATCHES_ENV: &str = "FBK_FAKE_MATCHES";
const FAKE_MATCHES_DEFAULT: usize = 200;
const FAKE_FIRST_BLOOD_RATE: f64 = 0.17;
const FAKE_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Download,
    Analyze,
    Readme,
    Export,
    All,
}

impl Stage {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "download" | "fetch" => Some(Stage::Download),
            "analyze" | "analyse" => Some(Stage::Analyze),
            "readme" | "report" => Some(Stage::Readme),
            "export" | "xlsx" => Some(Stage::Export),
            "all" => Some(Stage::All),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub summaries: Vec<FetchSummary>,
    /// Summoners whose download stopped early, with the reason.
    pub failures: Vec<(String, String)>,
}

pub fn load_env() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

pub fn fetch_options(config: &Config) -> FetchOptions {
    FetchOptions {
        region: config.region.clone(),
        queues: config.queues.clone(),
        crop: config.crop_matches,
        retry: config.retry_policy(),
    }
}

/// The live client, or the offline fake when `fake` is set.
pub fn build_api(config: &Config, fake: bool) -> Result<Box<dyn MatchApi>> {
    if fake {
        let summoner = config
            .summoners
            .first()
            .map(|s| s.name.clone())
            .ok_or_else(|| anyhow!("no summoner configured"))?;
        let n_matches = std::env::var(FAKE_MATCHES_ENV)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(FAKE_MATCHES_DEFAULT);
        log::info!("Using fake API with {n_matches} synthetic matches for '{summoner}'");
        let mut api = FakeMatchApi::new(&summoner, n_matches, FAKE_FIRST_BLOOD_RATE, FAKE_SEED);
        if let Some(queue) = config.queues.first() {
            api = api.with_queue(*queue);
        }
        return Ok(Box::new(api));
    }
    let token = load_api_token(&config.token_path)?;
    Ok(Box::new(RiotApiClient::new(token)?))
}

/// Downloads every configured summoner. A summoner whose account cannot be
/// resolved, or whose download gives up, is recorded as a failure and the
/// run moves on to the next one.
pub fn download_all(config: &Config, api: &dyn MatchApi) -> DownloadReport {
    let fetcher = MatchFetcher::new(api, fetch_options(config));
    if config.crop_matches {
        log::info!("Returning cropped match data");
    } else {
        log::info!("Returning full data for all matches");
    }
    log::info!("Region '{}', queues {:?}", config.region, config.queues);

    let mut report = DownloadReport::default();
    for summoner in &config.summoners {
        log::info!("Retrieving data from summoner '{}'", summoner.name);
        if !summoner.aliases.is_empty() {
            log::info!("Alternative summoner names: {:?}", summoner.aliases);
        }
        let account_id = match fetcher.resolve_account(summoner) {
            Ok(id) => id,
            Err(err) => {
                log::warn!("Cannot retrieve ID of summoner '{}': {err}", summoner.name);
                report.failures.push((summoner.name.clone(), err.to_string()));
                continue;
            }
        };
        let path = config.matches_file_path(summoner);
        match fetcher.fetch_account(summoner, &account_id, &path) {
            Ok(summary) => report.summaries.push(summary),
            Err(err) => {
                log::error!("Download of '{}' stopped: {err}", summoner.name);
                report.failures.push((summoner.name.clone(), err.to_string()));
            }
        }
    }
    report
}

pub fn analyzer_for(config: &Config) -> Analyzer {
    Analyzer::new(
        config.analysis_settings(),
        config.plot_dir_abs(),
        config.plot_dir.clone(),
    )
    .with_summoners(&config.summoners)
}

/// Analyzes all match files and writes the aggregate data document.
pub fn analyze(config: &Config) -> Result<AnalysisDataset> {
    let dataset = analyzer_for(config)
        .analyze_dir(&config.data_dir)
        .with_context(|| format!("analysis of {} failed", config.data_dir.display()))?;
    let data_file = config.data_file_path();
    store::save_dataset(&data_file, &dataset)?;
    log::info!("Wrote {}", data_file.display());
    Ok(dataset)
}

pub fn load_dataset(config: &Config) -> Result<AnalysisDataset> {
    let data_file = config.data_file_path();
    store::load_dataset(&data_file)
        .with_context(|| format!("run the analysis first; cannot load {}", data_file.display()))
}

pub fn readme(config: &Config, dataset: &AnalysisDataset) -> Result<()> {
    write_report(&config.readme_path, &config.readme_header, dataset)
}

pub fn export(dataset: &AnalysisDataset, path: &Path) -> Result<ExportReport> {
    export_dataset_xlsx(dataset, path)
}
