//! Runner configuration loading.

use anyhow::{Context, Result};
use ember_core::RunnerConfig;
use std::path::{Path, PathBuf};

/// Environment variable naming the JSON config file
pub const CONFIG_ENV: &str = "EMBER_CONFIG";
/// Environment variable overriding the noise probability
pub const NOISE_ENV: &str = "EMBER_NOISE";

/// Resolve the config path: explicit argument first, then `EMBER_CONFIG`
pub fn config_path(arg: Option<PathBuf>) -> Option<PathBuf> {
    arg.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

/// Load the runner config, falling back to defaults when no file is given
pub fn load_config(path: Option<&Path>) -> Result<RunnerConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            parse_config(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => RunnerConfig::default(),
    };

    if let Ok(raw) = std::env::var(NOISE_ENV) {
        config.simulation.noise_probability = parse_noise(&raw)?;
    }

    config.simulation.validate()?;
    Ok(config)
}

pub fn parse_config(text: &str) -> Result<RunnerConfig> {
    Ok(serde_json::from_str(text)?)
}

/// Parse a noise probability, rejecting values outside `[0, 1]`
pub fn parse_noise(raw: &str) -> Result<f64> {
    let p: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{} is not a number: {:?}", NOISE_ENV, raw))?;
    ember_core::validate_noise_probability(p)?;
    Ok(p)
}
