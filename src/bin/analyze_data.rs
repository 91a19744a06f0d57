use anyhow::Result;

use first_blood_king::cli_args;
use first_blood_king::config::Config;
use first_blood_king::logging;
use first_blood_king::pipeline;

fn main() -> Result<()> {
    pipeline::load_env();
    logging::init();

    let args = cli_args::args();
    let config = Config::load(&cli_args::config_path(&args))?;
    let dataset = pipeline::analyze(&config)?;

    println!("Analysis complete");
    println!("Data: {}", config.data_file_path().display());
    for (summoner, stats) in &dataset.summoners {
        println!(
            "{summoner}: matches={} first_bloods={} ratio={:.4} p={:e} plot={}",
            stats.n_matches,
            stats.n_first_bloods,
            stats.first_blood_ratio,
            stats.p_value,
            stats.distribution_plot
        );
    }
    Ok(())
}
