use std::error::Error;

use tracing_subscriber::EnvFilter;

const CRATES: [&str; 5] = ["gsw_orch", "gsw_pipe", "gsw_work", "gsw_grid", "gsw_cli"];

/// Installs the stderr subscriber. `RUST_LOG` wins over the defaults.
pub fn init(verbose: bool) -> Result<(), Box<dyn Error>> {
    let level = if verbose { "debug" } else { "info" };
    let default_filter = CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| e as Box<dyn Error>)?;
    Ok(())
}
