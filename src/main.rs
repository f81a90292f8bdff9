use std::env;
use std::io::{self, Write};
use std::time::Instant;

use anyhow::Result;
use env_logger::Builder;
use log::{error, info, warn, LevelFilter};

use rnaseq_pipelines::cli::parse;
use rnaseq_pipelines::config::defs::RunConfig;
use rnaseq_pipelines::pipelines::rnaseq;
use rnaseq_pipelines::utils::command::SystemRunner;
use rnaseq_pipelines::utils::logging::RunLog;
use rnaseq_pipelines::utils::system::run_timestamp;


#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse()?;

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    println!("\n-------------\n RNA-seq pipelines\n-------------\n");

    let dir = env::current_dir()?;
    info!("The current directory is {:?}", dir);

    let run_config = match RunConfig::from_args(&args, &dir, &run_timestamp()) {
        Ok(config) => config,
        Err(e) => {
            error!("Pipeline failed: {} at {} milliseconds.", e, run_start.elapsed().as_millis());
            std::process::exit(1);
        }
    };

    let run_log = RunLog::to_file(&run_config.log_path)?;
    run_log.info(format!("Run log at {}", run_config.log_path.display()));

    match rnaseq::run(&run_config, &SystemRunner, &run_log, io::stdin().lock()).await {
        Ok(summary) => {
            let failed = summary.failed_stages();
            if failed > 0 {
                warn!("{} stage(s) failed; see {} for details.", failed, run_config.log_path.display());
            }
        }
        Err(e) => {
            run_log.error(format!("Pipeline failed: {} at {} milliseconds.", e, run_start.elapsed().as_millis()));
            std::process::exit(1);
        }
    }

    println!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
    Ok(())
}
