use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::analyzer::AnalysisSettings;
use crate::model::Summoner;
use crate::retry::RetryPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config.yml";
pub const DEFAULT_SUMMONER: &str = "F1rst Blood K1ng";
pub const DEFAULT_REGION: &str = "euw1";
pub const DEFAULT_QUEUE: u32 = 450;
pub const DEFAULT_DATA_FILE: &str = "first_blood_data.yml";
pub const DEFAULT_TOKEN_PATH: &str = "~/.riot_api_token";

#[derive(Debug, Clone)]
pub struct Config {
    pub summoners: Vec<Summoner>,
    pub region: String,
    pub queues: Vec<u32>,
    pub data_dir: PathBuf,
    /// As written in the config; recorded in the dataset and embedded in the README.
    pub plot_dir: PathBuf,
    pub readme_path: PathBuf,
    pub readme_header: PathBuf,
    pub data_file: String,
    pub alpha: f64,
    pub p_binom: f64,
    pub crop_matches: bool,
    pub retry: RetrySettings,
    pub token_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1000,
            max_delay_ms: 16_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NameEntry {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SummonerField {
    Name(String),
    List(Vec<NameEntry>),
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    summoner: Option<SummonerField>,
    summoners: Option<SummonerField>,
    region: Option<String>,
    queues: Option<Vec<u32>>,
    data_dir: Option<String>,
    out_dir: Option<String>,
    plot_dir: Option<String>,
    readme_path: Option<String>,
    readme_header: Option<String>,
    data_file: Option<String>,
    alpha: Option<f64>,
    p_binom: Option<f64>,
    crop_matches: Option<bool>,
    retry: Option<RetrySettings>,
    token_path: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading config {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let parsed: RawConfig = if raw.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(raw).context("invalid config yaml")?
        };
        Self::resolve(parsed)
    }

    fn resolve(raw: RawConfig) -> Result<Self> {
        let mut summoners = Vec::new();
        // A flat list under `summoner` is one player with aliases.
        match raw.summoner {
            Some(SummonerField::Name(name)) => summoners.push(Summoner::new(name)),
            Some(SummonerField::List(entries)) => {
                let names = flatten_names(entries);
                if let Some((first, rest)) = names.split_first() {
                    summoners.push(Summoner::with_aliases(first.clone(), rest.to_vec()));
                }
            }
            None => {}
        }
        match raw.summoners {
            Some(SummonerField::Name(name)) => summoners.push(Summoner::new(name)),
            Some(SummonerField::List(entries)) => {
                for entry in entries {
                    match entry {
                        NameEntry::One(name) => summoners.push(Summoner::new(name)),
                        NameEntry::Many(names) => {
                            if let Some((first, rest)) = names.split_first() {
                                summoners
                                    .push(Summoner::with_aliases(first.clone(), rest.to_vec()));
                            }
                        }
                    }
                }
            }
            None => {}
        }
        summoners.retain(|s| !s.name.trim().is_empty());
        if summoners.is_empty() {
            summoners.push(Summoner::new(DEFAULT_SUMMONER));
        }

        let queues = raw.queues.unwrap_or_else(|| vec![DEFAULT_QUEUE]);

        let alpha = raw.alpha.unwrap_or(0.05);
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(anyhow!("alpha must be in (0, 1), got {alpha}"));
        }
        let p_binom = raw.p_binom.unwrap_or(0.1);
        if !(0.0..=1.0).contains(&p_binom) {
            return Err(anyhow!("p_binom must be in [0, 1], got {p_binom}"));
        }

        let retry = raw.retry.unwrap_or_default();
        if retry.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be at least 1"));
        }

        let data_dir = raw
            .data_dir
            .or(raw.out_dir)
            .unwrap_or_else(|| "~".to_string());

        Ok(Self {
            summoners,
            region: raw
                .region
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            queues,
            data_dir: expand_tilde(&data_dir),
            plot_dir: expand_tilde(raw.plot_dir.as_deref().unwrap_or("img")),
            readme_path: expand_tilde(raw.readme_path.as_deref().unwrap_or("README.md")),
            readme_header: expand_tilde(
                raw.readme_header.as_deref().unwrap_or("readme_header.md"),
            ),
            data_file: raw
                .data_file
                .unwrap_or_else(|| DEFAULT_DATA_FILE.to_string()),
            alpha,
            p_binom,
            crop_matches: raw.crop_matches.unwrap_or(true),
            retry,
            token_path: expand_tilde(raw.token_path.as_deref().unwrap_or(DEFAULT_TOKEN_PATH)),
        })
    }

    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            alpha: self.alpha,
            p_binom: self.p_binom,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn data_file_path(&self) -> PathBuf {
        self.data_dir.join(&self.data_file)
    }

    pub fn matches_file_path(&self, summoner: &Summoner) -> PathBuf {
        self.data_dir.join(summoner.matches_file_name())
    }

    /// Where plots are written. Relative plot dirs are resolved against the
    /// README's directory so the embedded links work.
    pub fn plot_dir_abs(&self) -> PathBuf {
        if self.plot_dir.is_absolute() {
            return self.plot_dir.clone();
        }
        match self.readme_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(&self.plot_dir),
            _ => self.plot_dir.clone(),
        }
    }
}

fn flatten_names(entries: Vec<NameEntry>) -> Vec<String> {
    let mut out = Vec::new();
    for entry in entries {
        match entry {
            NameEntry::One(name) => out.push(name),
            NameEntry::Many(names) => out.extend(names),
        }
    }
    out
}

pub fn expand_tilde(raw: &str) -> PathBuf {
    let home = std::env::var("HOME").ok().filter(|h| !h.trim().is_empty());
    match (raw, home) {
        ("~", Some(home)) => PathBuf::from(home),
        (path, Some(home)) if path.starts_with("~/") => PathBuf::from(home).join(&path[2..]),
        (path, _) => PathBuf::from(path),
    }
}
