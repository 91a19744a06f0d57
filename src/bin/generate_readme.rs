use anyhow::Result;

use first_blood_king::cli_args;
use first_blood_king::config::Config;
use first_blood_king::logging;
use first_blood_king::pipeline;

// Rebuilds the README from the saved aggregate data; `--analyze` refreshes
// that data from the match files first.
fn main() -> Result<()> {
    pipeline::load_env();
    logging::init();

    let args = cli_args::args();
    let config = Config::load(&cli_args::config_path(&args))?;
    let dataset = if cli_args::has_flag(&args, "--analyze") {
        pipeline::analyze(&config)?
    } else {
        pipeline::load_dataset(&config)?
    };
    pipeline::readme(&config, &dataset)?;

    println!("README: {}", config.readme_path.display());
    println!("Summoners: {}", dataset.summoners.len());
    Ok(())
}
