use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const MATCHES_PREFIX: &str = "matches_";
pub const MATCHES_EXT: &str = "yml";

/// A player as configured: the name used for the account lookup plus any
/// older names the player may appear under inside historical matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summoner {
    pub name: String,
    pub aliases: Vec<String>,
}

impl Summoner {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(name: impl Into<String>, aliases: Vec<String>) -> Self {
        Self {
            name: name.into(),
            aliases,
        }
    }

    /// Primary name first, then aliases.
    pub fn all_names(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.aliases.len() + 1);
        out.push(self.name.clone());
        for alias in &self.aliases {
            if !out.contains(alias) {
                out.push(alias.clone());
            }
        }
        out
    }

    pub fn file_stem(&self) -> String {
        file_stem(&self.name)
    }

    pub fn matches_file_name(&self) -> String {
        format!("{MATCHES_PREFIX}{}.{MATCHES_EXT}", self.file_stem())
    }
}

pub fn file_stem(name: &str) -> String {
    name.replace(' ', "_")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReference {
    pub game_id: u64,
    #[serde(default)]
    pub queue: Option<u32>,
    #[serde(default)]
    pub champion: Option<u32>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub platform_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub alpha: f64,
    pub p_binom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummonerStats {
    pub n_matches: u64,
    pub n_first_bloods: u64,
    pub first_blood_ratio: f64,
    pub p_value: f64,
    pub distribution_plot: String,
}

impl SummonerStats {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// The aggregate document written by the analyzer and read by the report
/// and export stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDataset {
    pub metadata: AnalysisMetadata,
    #[serde(default)]
    pub summoners: BTreeMap<String, SummonerStats>,
}

impl AnalysisDataset {
    pub fn new(metadata: AnalysisMetadata) -> Self {
        Self {
            metadata,
            summoners: BTreeMap::new(),
        }
    }
}
