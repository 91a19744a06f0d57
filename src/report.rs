use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::model::{AnalysisDataset, SummonerStats};

pub const KING_VERDICT: &str = "**STILL THE FIRST BLOOD KING!!!**";
pub const NOT_KING_VERDICT: &str = "**Not first blood king anymore :-(**";

const DEFAULT_HEADER: &str = "# First Blood King\n\n\
Is the summoner below really scoring first blood more often than everybody \
else? Every match is a trial; a one-sided binomial test checks the observed \
first blood count against the baseline rate.\n\n";

pub fn read_header(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(header) => header,
        Err(err) => {
            log::warn!(
                "Cannot read README header {} ({err}), using built-in header",
                path.display()
            );
            DEFAULT_HEADER.to_string()
        }
    }
}

pub fn verdict(stats: &SummonerStats, alpha: f64) -> &'static str {
    if stats.is_significant(alpha) {
        KING_VERDICT
    } else {
        NOT_KING_VERDICT
    }
}

pub fn render_section(
    summoner: &str,
    stats: &SummonerStats,
    alpha: f64,
    p_binom: f64,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    out += &format!("![First blood king]({})\n\n", stats.distribution_plot);
    out += verdict(stats, alpha);
    out += "\n\n";
    out += &format!(
        "{summoner} has {} out of {} games. Assuming a binomial distribution \
         with ``p = {p_binom}`` as null hypothesis, the corresponding p value is {:e}.\n\n",
        stats.n_first_bloods, stats.n_matches, stats.p_value
    );
    out += &format!("Last updated: {}\n\n", now.format("%Y-%m-%d %H:%M:%S"));
    out
}

pub fn render_report(header: &str, dataset: &AnalysisDataset, now: DateTime<Utc>) -> String {
    let mut out = header.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for (summoner, stats) in &dataset.summoners {
        out += &render_section(
            summoner,
            stats,
            dataset.metadata.alpha,
            dataset.metadata.p_binom,
            now,
        );
    }
    out
}

/// Renders the README and replaces whatever is at `readme_path`.
pub fn write_report(
    readme_path: &Path,
    header_path: &Path,
    dataset: &AnalysisDataset,
) -> Result<()> {
    let header = read_header(header_path);
    let body = render_report(&header, dataset, Utc::now());
    if let Some(parent) = readme_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed creating {}", parent.display()))?;
        }
    }
    fs::write(readme_path, body)
        .with_context(|| format!("failed writing {}", readme_path.display()))?;
    log::info!("Wrote {}", readme_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::model::AnalysisMetadata;

    fn stats(p_value: f64) -> SummonerStats {
        SummonerStats {
            n_matches: 50,
            n_first_bloods: 10,
            first_blood_ratio: 0.2,
            p_value,
            distribution_plot: "img/Foo.svg".to_string(),
        }
    }

    #[test]
    fn verdict_follows_alpha() {
        assert_eq!(verdict(&stats(0.01), 0.05), KING_VERDICT);
        assert_eq!(verdict(&stats(0.05), 0.05), NOT_KING_VERDICT);
        assert_eq!(verdict(&stats(0.3), 0.05), NOT_KING_VERDICT);
    }

    #[test]
    fn report_has_header_plot_counts_and_timestamp() {
        let mut dataset = AnalysisDataset::new(AnalysisMetadata {
            alpha: 0.05,
            p_binom: 0.1,
        });
        dataset.summoners.insert("Foo".to_string(), stats(0.0245));
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();

        let readme = render_report("# Header", &dataset, now);
        assert!(readme.starts_with("# Header\n![First blood king](img/Foo.svg)\n\n"));
        assert!(readme.contains(KING_VERDICT));
        assert!(readme.contains("Foo has 10 out of 50 games."));
        assert!(readme.contains("``p = 0.1``"));
        assert!(readme.contains("p value is 2.45e-2."));
        assert!(readme.contains("Last updated: 2024-03-01 12:30:05"));
    }
}
