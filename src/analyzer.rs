use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value;
use thiserror::Error;

use crate::crop::{crop_match, is_full_match};
use crate::model::{AnalysisDataset, AnalysisMetadata, Summoner, SummonerStats, file_stem};
use crate::plot::{PlotError, PmfPlot};
use crate::stats::BinomialTest;
use crate::store::{self, PersistedMatches, StoreError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisSettings {
    pub alpha: f64,
    pub p_binom: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            p_binom: 0.1,
        }
    }
}

impl AnalysisSettings {
    pub fn metadata(&self) -> AnalysisMetadata {
        AnalysisMetadata {
            alpha: self.alpha,
            p_binom: self.p_binom,
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no matches recorded for summoner '{summoner}'")]
    NoMatches { summoner: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Plot(#[from] PlotError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FirstBloodCounts {
    pub matches: u64,
    pub first_bloods: u64,
    /// Full match records the summoner could not be found in.
    pub unmatched: u64,
}

impl FirstBloodCounts {
    pub fn ratio(&self) -> Option<f64> {
        (self.matches > 0).then(|| self.first_bloods as f64 / self.matches as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummonerAnalysis {
    pub summoner: String,
    pub counts: FirstBloodCounts,
    pub ratio: f64,
    pub test: BinomialTest,
}

impl SummonerAnalysis {
    pub fn to_stats(&self, distribution_plot: String) -> SummonerStats {
        SummonerStats {
            n_matches: self.counts.matches,
            n_first_bloods: self.counts.first_bloods,
            first_blood_ratio: self.ratio,
            p_value: self.test.p_value,
            distribution_plot,
        }
    }
}

pub fn is_first_blood(record: &Value) -> bool {
    record
        .get("stats")
        .and_then(|s| s.get("firstBloodKill"))
        .and_then(|x| x.as_bool())
        .unwrap_or(false)
}

/// Counts matches and first bloods. Full match records are cropped to the
/// summoner known by `names` first; records without them are left out.
pub fn count_first_bloods(records: &[Value], names: &[String]) -> FirstBloodCounts {
    let mut counts = FirstBloodCounts::default();
    for record in records {
        let first_blood = if is_full_match(record) {
            match crop_match(record, names) {
                Ok(cropped) => is_first_blood(&cropped),
                Err(err) => {
                    log::warn!("Ignoring match: {err}");
                    counts.unmatched += 1;
                    continue;
                }
            }
        } else {
            is_first_blood(record)
        };
        counts.matches += 1;
        if first_blood {
            counts.first_bloods += 1;
        }
    }
    counts
}

pub fn analyze_counts(
    summoner: &str,
    counts: FirstBloodCounts,
    settings: &AnalysisSettings,
) -> Result<SummonerAnalysis, AnalysisError> {
    let Some(ratio) = counts.ratio() else {
        return Err(AnalysisError::NoMatches {
            summoner: summoner.to_string(),
        });
    };
    Ok(SummonerAnalysis {
        summoner: summoner.to_string(),
        counts,
        ratio,
        test: BinomialTest::greater(counts.first_bloods, counts.matches, settings.p_binom),
    })
}

pub struct Analyzer {
    settings: AnalysisSettings,
    plot_dir_abs: PathBuf,
    plot_dir_rel: PathBuf,
    names: HashMap<String, Vec<String>>,
}

impl Analyzer {
    /// `plot_dir_abs` is where plot files go; `plot_dir_rel` is how the
    /// report refers to that directory.
    pub fn new(settings: AnalysisSettings, plot_dir_abs: PathBuf, plot_dir_rel: PathBuf) -> Self {
        Self {
            settings,
            plot_dir_abs,
            plot_dir_rel,
            names: HashMap::new(),
        }
    }

    /// Registers configured aliases, used when stored matches were not cropped.
    pub fn with_summoners(mut self, summoners: &[Summoner]) -> Self {
        for summoner in summoners {
            self.names
                .insert(summoner.name.clone(), summoner.all_names());
        }
        self
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn analyze_persisted(
        &self,
        persisted: &PersistedMatches,
    ) -> Result<SummonerAnalysis, AnalysisError> {
        let names = self
            .names
            .get(&persisted.summoner)
            .cloned()
            .unwrap_or_else(|| vec![persisted.summoner.clone()]);
        let counts = count_first_bloods(&persisted.matches, &names);
        analyze_counts(&persisted.summoner, counts, &self.settings)
    }

    /// Analyzes one match file and writes its distribution plot.
    pub fn analyze_file(&self, path: &Path) -> Result<(String, SummonerStats), AnalysisError> {
        let persisted = store::load_matches(path)?;
        self.analyze_loaded(path, &persisted)
    }

    fn analyze_loaded(
        &self,
        path: &Path,
        persisted: &PersistedMatches,
    ) -> Result<(String, SummonerStats), AnalysisError> {
        let analysis = self.analyze_persisted(persisted)?;

        let plot = PmfPlot::from_analysis(&analysis, self.settings.p_binom);
        let file_name = plot.file_name();
        let written = plot.write(&self.plot_dir_abs.join(&file_name))?;
        let plot_rel = self.plot_dir_rel.join(&file_name);

        // One line per file; files are analyzed concurrently.
        log::info!(
            "{}: '{}' {} matches, {} first bloods ({:.2}%), plot {}",
            path.display(),
            analysis.summoner,
            analysis.counts.matches,
            analysis.counts.first_bloods,
            100.0 * analysis.ratio,
            written.display()
        );

        let stats = analysis.to_stats(plot_rel.to_string_lossy().replace('\\', "/"));
        Ok((analysis.summoner, stats))
    }

    /// Analyzes every match file in `data_dir`. Summoners without any match
    /// are logged and left out of the dataset. A summoner already read from an
    /// earlier file is skipped with a warning. Files are loaded in order and
    /// analyzed in parallel.
    pub fn analyze_dir(&self, data_dir: &Path) -> Result<AnalysisDataset, AnalysisError> {
        let mut seen = HashSet::new();
        let mut loaded = Vec::new();
        for path in store::list_match_files(data_dir)? {
            let persisted = store::load_matches(&path)?;
            // Names equal up to the file stem would share one plot.
            if !seen.insert(file_stem(&persisted.summoner)) {
                log::warn!(
                    "Skipping {}: summoner '{}' was already read from another file",
                    path.display(),
                    persisted.summoner
                );
                continue;
            }
            loaded.push((path, persisted));
        }

        let results: Vec<(PathBuf, Result<(String, SummonerStats), AnalysisError>)> = loaded
            .par_iter()
            .map(|(path, persisted)| (path.clone(), self.analyze_loaded(path, persisted)))
            .collect();

        let mut dataset = AnalysisDataset::new(self.settings.metadata());
        for (path, result) in results {
            match result {
                Ok((summoner, stats)) => {
                    dataset.summoners.insert(summoner, stats);
                }
                Err(AnalysisError::NoMatches { summoner }) => {
                    log::warn!("Skipping '{summoner}': no matches in {}", path.display());
                }
                Err(err) => return Err(err),
            }
        }
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cropped(first_blood: bool) -> Value {
        json!({"participantId": 3, "stats": {"firstBloodKill": first_blood, "kills": 4}})
    }

    #[test]
    fn counts_matches_and_first_bloods() {
        let records = vec![cropped(true), cropped(false), cropped(false), cropped(true)];
        let counts = count_first_bloods(&records, &["Foo".to_string()]);
        assert_eq!(counts.matches, 4);
        assert_eq!(counts.first_bloods, 2);
        assert_eq!(counts.ratio(), Some(0.5));
    }

    #[test]
    fn missing_flag_counts_as_no_first_blood() {
        let records = vec![json!({"stats": {}}), json!({"participantId": 1})];
        let counts = count_first_bloods(&records, &[]);
        assert_eq!(counts.matches, 2);
        assert_eq!(counts.first_bloods, 0);
    }

    #[test]
    fn full_matches_are_cropped_with_aliases() {
        let full = json!({
            "participantIdentities": [
                {"participantId": 1, "player": {"summonerName": "Someone"}},
                {"participantId": 2, "player": {"summonerName": "Old Foo"}},
            ],
            "participants": [
                {"participantId": 1, "stats": {"firstBloodKill": false}},
                {"participantId": 2, "stats": {"firstBloodKill": true}},
            ],
        });
        let stranger = json!({
            "participantIdentities": [
                {"participantId": 1, "player": {"summonerName": "Someone"}},
            ],
            "participants": [
                {"participantId": 1, "stats": {"firstBloodKill": true}},
            ],
        });
        let names = vec!["Foo".to_string(), "Old Foo".to_string()];
        let counts = count_first_bloods(&[full, stranger], &names);
        assert_eq!(counts.matches, 1);
        assert_eq!(counts.first_bloods, 1);
        assert_eq!(counts.unmatched, 1);
    }

    #[test]
    fn zero_matches_is_an_explicit_error() {
        let err = analyze_counts("Foo", FirstBloodCounts::default(), &AnalysisSettings::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NoMatches { ref summoner } if summoner == "Foo"));
    }

    #[test]
    fn analysis_uses_configured_null_probability() {
        let counts = FirstBloodCounts {
            matches: 50,
            first_bloods: 10,
            unmatched: 0,
        };
        let loose = analyze_counts("Foo", counts, &AnalysisSettings::default()).unwrap();
        let strict = analyze_counts(
            "Foo",
            counts,
            &AnalysisSettings {
                alpha: 0.05,
                p_binom: 0.2,
            },
        )
        .unwrap();
        assert!((loose.ratio - 0.2).abs() < 1e-12);
        assert!(loose.test.p_value < strict.test.p_value);
    }

    fn write_match_file(dir: &Path, file: &str, summoner: &str, flags: &[bool]) {
        let persisted = PersistedMatches {
            summoner: summoner.to_string(),
            matches: flags.iter().map(|fb| cropped(*fb)).collect(),
        };
        store::write_matches(&dir.join(file), &persisted).unwrap();
    }

    fn analyzer_in(dir: &Path) -> Analyzer {
        Analyzer::new(
            AnalysisSettings::default(),
            dir.join("img"),
            PathBuf::from("img"),
        )
    }

    #[test]
    fn analyzes_every_summoner_in_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        write_match_file(&data, "matches_Zed_Main.yml", "Zed Main", &[true, true, false]);
        write_match_file(&data, "matches_Annie.yml", "Annie", &[false; 10]);
        write_match_file(&data, "matches_Empty.yml", "Empty", &[]);
        write_match_file(&data, "matches_Mid.yml", "Mid", &[true, false]);

        let dataset = analyzer_in(dir.path()).analyze_dir(&data).unwrap();
        let names: Vec<&str> = dataset.summoners.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Annie", "Mid", "Zed Main"]);
        assert_eq!(dataset.summoners["Zed Main"].n_first_bloods, 2);
        assert_eq!(dataset.summoners["Annie"].n_matches, 10);
        assert_eq!(dataset.summoners["Mid"].distribution_plot, "img/Mid.svg");
        for plot in ["Annie.svg", "Mid.svg", "Zed_Main.svg"] {
            assert!(dir.path().join("img").join(plot).is_file(), "{plot}");
        }
        assert!(!dir.path().join("img").join("Empty.svg").exists());
    }

    #[test]
    fn second_file_for_same_summoner_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        write_match_file(&data, "matches_Foo.yml", "Foo", &[true, false]);
        write_match_file(&data, "matches_Foo_copy.yml", "Foo", &[false; 7]);

        let dataset = analyzer_in(dir.path()).analyze_dir(&data).unwrap();
        assert_eq!(dataset.summoners.len(), 1);
        assert_eq!(dataset.summoners["Foo"].n_matches, 2);
    }

    #[test]
    fn missing_data_dir_gives_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = analyzer_in(dir.path())
            .analyze_dir(&dir.path().join("never_created"))
            .unwrap();
        assert!(dataset.summoners.is_empty());
    }
}

