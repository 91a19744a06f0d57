use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Chart, ChartType, Workbook, Worksheet};

use crate::model::AnalysisDataset;
use crate::stats::binomial_pmf_all;

const SUMMARY_SHEET: &str = "Summary";
const MAX_SHEET_NAME: usize = 31;

pub struct ExportReport {
    pub summoners: usize,
    pub pmf_rows: usize,
}

enum Cell {
    Text(String),
    Number(f64),
}

/// Writes the analysis dataset to an xlsx workbook: a summary sheet and one
/// sheet per summoner holding the null distribution and a chart of it.
pub fn export_dataset_xlsx(dataset: &AnalysisDataset, path: &Path) -> Result<ExportReport> {
    let alpha = dataset.metadata.alpha;
    let p_binom = dataset.metadata.p_binom;

    let mut summary_rows = vec![
        [
            "Summoner",
            "Matches",
            "First Bloods",
            "Ratio",
            "p value",
            "Significant",
            "Plot",
        ]
        .iter()
        .map(|h| Cell::Text(h.to_string()))
        .collect::<Vec<_>>(),
    ];
    for (summoner, stats) in &dataset.summoners {
        summary_rows.push(vec![
            Cell::Text(summoner.clone()),
            Cell::Number(stats.n_matches as f64),
            Cell::Number(stats.n_first_bloods as f64),
            Cell::Number(stats.first_blood_ratio),
            Cell::Number(stats.p_value),
            Cell::Text(if stats.is_significant(alpha) {
                "yes".to_string()
            } else {
                "no".to_string()
            }),
            Cell::Text(stats.distribution_plot.clone()),
        ]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SUMMARY_SHEET)?;
        write_cells(sheet, &summary_rows)?;
        let meta_row = summary_rows.len() as u32 + 1;
        sheet.write_string(meta_row, 0, "alpha")?;
        sheet.write_number(meta_row, 1, alpha)?;
        sheet.write_string(meta_row + 1, 0, "p_binom")?;
        sheet.write_number(meta_row + 1, 1, p_binom)?;
    }

    let mut used = HashSet::from([SUMMARY_SHEET.to_lowercase()]);
    let mut pmf_rows = 0usize;
    for (summoner, stats) in &dataset.summoners {
        let name = unique_sheet_name(summoner, &mut used);
        let pmf = binomial_pmf_all(stats.n_matches, p_binom);

        let mut rows = vec![vec![
            Cell::Text("k".to_string()),
            Cell::Text("P(X = k)".to_string()),
            Cell::Text("Observed".to_string()),
        ]];
        for (k, p) in pmf.iter().enumerate() {
            let observed = if k as u64 == stats.n_first_bloods {
                Cell::Text("<-".to_string())
            } else {
                Cell::Text(String::new())
            };
            rows.push(vec![Cell::Number(k as f64), Cell::Number(*p), observed]);
        }
        pmf_rows += pmf.len();

        let sheet = workbook.add_worksheet();
        sheet.set_name(&name)?;
        write_cells(sheet, &rows)?;

        let last_row = pmf.len() as u32;
        let series_name = format!("H0: B({}, {p_binom})", stats.n_matches);
        let title = format!("{summoner}: {} first blood kills", stats.n_first_bloods);
        let mut chart = Chart::new(ChartType::Line);
        chart
            .add_series()
            .set_name(series_name.as_str())
            .set_categories((name.as_str(), 1, 0, last_row, 0))
            .set_values((name.as_str(), 1, 1, last_row, 1));
        chart.title().set_name(title.as_str());
        chart.x_axis().set_name("Number of first bloods");
        chart.y_axis().set_name("Probability");
        sheet
            .insert_chart(1, 4, &chart)
            .with_context(|| format!("insert chart for {summoner}"))?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    log::info!("Wrote {}", path.display());

    Ok(ExportReport {
        summoners: dataset.summoners.len(),
        pmf_rows,
    })
}

fn write_cells(worksheet: &mut Worksheet, rows: &[Vec<Cell>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            let written = match cell {
                Cell::Text(value) => worksheet.write_string(r, c, value),
                Cell::Number(value) => worksheet.write_number(r, c, *value),
            };
            written.with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

/// Excel sheet names: at most 31 chars, none of `[]:*?/\`, unique
/// case-insensitively.
fn unique_sheet_name(raw: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim();
    let base: String = if cleaned.is_empty() {
        "Summoner".to_string()
    } else {
        cleaned.chars().take(MAX_SHEET_NAME).collect()
    };

    let mut candidate = base.clone();
    let mut n = 2;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
        candidate = base.chars().take(keep).collect::<String>() + &suffix;
        n += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnalysisMetadata, SummonerStats};

    #[test]
    fn sheet_names_are_sanitized_and_unique() {
        let mut used = HashSet::from([SUMMARY_SHEET.to_lowercase()]);
        assert_eq!(unique_sheet_name("a/b:c", &mut used), "a_b_c");
        assert_eq!(unique_sheet_name("summary", &mut used), "summary (2)");
        let long = "x".repeat(40);
        let first = unique_sheet_name(&long, &mut used);
        let second = unique_sheet_name(&long, &mut used);
        assert_eq!(first.chars().count(), 31);
        assert_eq!(second.chars().count(), 31);
        assert!(second.ends_with(" (2)"));
    }

    #[test]
    fn writes_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("first_blood.xlsx");
        let mut dataset = AnalysisDataset::new(AnalysisMetadata {
            alpha: 0.05,
            p_binom: 0.1,
        });
        dataset.summoners.insert(
            "Foo".to_string(),
            SummonerStats {
                n_matches: 3,
                n_first_bloods: 1,
                first_blood_ratio: 1.0 / 3.0,
                p_value: 0.271,
                distribution_plot: "img/Foo.svg".to_string(),
            },
        );
        let report = export_dataset_xlsx(&dataset, &path).unwrap();
        assert_eq!(report.summoners, 1);
        assert_eq!(report.pmf_rows, 4);
        assert!(path.is_file());
    }
}
