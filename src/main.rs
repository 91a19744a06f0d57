use std::path::PathBuf;

use anyhow::{Result, anyhow};

use first_blood_king::cli_args;
use first_blood_king::config::Config;
use first_blood_king::logging;
use first_blood_king::pipeline::{self, DownloadReport, Stage};

const DEFAULT_XLSX: &str = "first_blood.xlsx";

fn main() -> Result<()> {
    pipeline::load_env();
    logging::init();

    let args = cli_args::args();
    if cli_args::has_flag(&args, "--help") || cli_args::has_flag(&args, "-h") {
        print_usage();
        return Ok(());
    }
    let stage = match cli_args::command(&args) {
        Some(raw) => Stage::parse(&raw).ok_or_else(|| anyhow!("unknown command '{raw}'"))?,
        None => Stage::All,
    };
    let config = Config::load(&cli_args::config_path(&args))?;
    let fake = cli_args::has_flag(&args, "--fake");

    match stage {
        Stage::Download => {
            let report = download(&config, fake)?;
            fail_on_download_errors(&report)?;
        }
        Stage::Analyze => {
            let dataset = pipeline::analyze(&config)?;
            print_dataset_summary(&dataset);
        }
        Stage::Readme => {
            let dataset = pipeline::load_dataset(&config)?;
            pipeline::readme(&config, &dataset)?;
            println!("README: {}", config.readme_path.display());
        }
        Stage::Export => {
            let dataset = pipeline::load_dataset(&config)?;
            let path = cli_args::value_arg(&args, "--xlsx")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_XLSX));
            let report = pipeline::export(&dataset, &path)?;
            println!(
                "Workbook: {} ({} summoners, {} pmf rows)",
                path.display(),
                report.summoners,
                report.pmf_rows
            );
        }
        Stage::All => {
            let report = download(&config, fake)?;
            let dataset = pipeline::analyze(&config)?;
            print_dataset_summary(&dataset);
            pipeline::readme(&config, &dataset)?;
            println!("README: {}", config.readme_path.display());
            fail_on_download_errors(&report)?;
        }
    }
    Ok(())
}

fn download(config: &Config, fake: bool) -> Result<DownloadReport> {
    let api = pipeline::build_api(config, fake)?;
    let report = pipeline::download_all(config, api.as_ref());
    for summary in &report.summaries {
        println!(
            "{}: saved {} matches, skipped {} -> {}",
            summary.summoner,
            summary.saved,
            summary.skipped,
            summary.path.display()
        );
    }
    Ok(report)
}

fn fail_on_download_errors(report: &DownloadReport) -> Result<()> {
    if report.failures.is_empty() {
        return Ok(());
    }
    for (summoner, err) in &report.failures {
        println!("{summoner}: download failed: {err}");
    }
    Err(anyhow!(
        "{} of {} summoner download(s) failed",
        report.failures.len(),
        report.failures.len() + report.summaries.len()
    ))
}

fn print_dataset_summary(dataset: &first_blood_king::model::AnalysisDataset) {
    println!(
        "alpha = {}, p_binom = {}",
        dataset.metadata.alpha, dataset.metadata.p_binom
    );
    for (summoner, stats) in &dataset.summoners {
        println!(
            "{summoner}: {}/{} first bloods ({:.2}%), p = {:e}{}",
            stats.n_first_bloods,
            stats.n_matches,
            100.0 * stats.first_blood_ratio,
            stats.p_value,
            if stats.is_significant(dataset.metadata.alpha) {
                " *"
            } else {
                ""
            }
        );
    }
}

fn print_usage() {
    println!("usage: first_blood_king [download|analyze|readme|export|all] [options]");
    println!();
    println!("  --config <path>   configuration file (default config.yml, or FBK_CONFIG)");
    println!("  --fake            use synthetic matches instead of the Riot API");
    println!("  --xlsx <path>     workbook path for `export` (default {DEFAULT_XLSX})");
    println!();
    println!("Log filter via FBK_LOG, e.g. warn or first_blood_king=debug (default info).");
}
