use anyhow::{Result, anyhow};

use first_blood_king::cli_args;
use first_blood_king::config::Config;
use first_blood_king::logging;
use first_blood_king::pipeline;

fn main() -> Result<()> {
    pipeline::load_env();
    logging::init();

    let args = cli_args::args();
    let config = Config::load(&cli_args::config_path(&args))?;
    let api = pipeline::build_api(&config, cli_args::has_flag(&args, "--fake"))?;
    let report = pipeline::download_all(&config, api.as_ref());

    println!("Download complete");
    for summary in &report.summaries {
        println!(
            "{} (account {}): saved={} skipped={} file={}",
            summary.summoner,
            summary.account_id,
            summary.saved,
            summary.skipped,
            summary.path.display()
        );
    }
    if !report.failures.is_empty() {
        println!("  errors: {}", report.failures.len());
        for (summoner, err) in &report.failures {
            println!("   - {summoner}: {err}");
        }
        return Err(anyhow!("download incomplete"));
    }
    Ok(())
}
