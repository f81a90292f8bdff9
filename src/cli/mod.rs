pub mod args;
pub mod config_file;

use anyhow::{anyhow, Result};
use clap::Parser;
use log::info;

pub use args::{Arguments, FailurePolicy};
use config_file::{locate_config, read_config_flags, ConfigFormat};

/// Parses the command line, swapping in the flags of a JSON/YAML parameter
/// file when one is given. `--yes` and `--verbose` from the command line survive
/// the swap.
pub fn parse() -> Result<Arguments> {
    let args = Arguments::parse();
    resolve_parameter_file(args)
}

pub fn resolve_parameter_file(args: Arguments) -> Result<Arguments> {
    let (file, format) = match (&args.json, &args.yaml) {
        (Some(_), Some(_)) => {
            return Err(anyhow!("Both YAML and JSON detected. Please pass only one parameter file."));
        }
        (Some(json), None) => (json.clone(), ConfigFormat::Json),
        (None, Some(yaml)) => (yaml.clone(), ConfigFormat::Yaml),
        (None, None) => return Ok(args),
    };

    let path = locate_config(&file, &args.input_dir)?;
    info!("{:?} parameter file found at {}. Proceeding with it for arguments.", format, path.display());

    let flags = read_config_flags(&path, format)?;
    let mut parsed = Arguments::try_parse_from(
        std::iter::once(env!("CARGO_PKG_NAME").to_string()).chain(flags),
    )
        .map_err(|e| anyhow!("Invalid arguments in {}: {}", path.display(), e))?;

    parsed.yes |= args.yes;
    parsed.verbose |= args.verbose;
    Ok(parsed)
}
