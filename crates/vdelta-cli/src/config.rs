use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use vdelta::DiffOptions;

use crate::cli::OptionArgs;

/// Contents of a `--config` file.
///
/// ```toml
/// [diff]
/// order_insensitive = true
/// ignore_keys = ["updated_at"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub diff: DiffOptions,
}

pub fn load_config(path: &Path) -> anyhow::Result<CliConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

/// Options from the config file, if any, with command-line flags on top.
pub fn resolve_options(flags: &OptionArgs) -> anyhow::Result<DiffOptions> {
    let mut options = match &flags.config {
        Some(path) => load_config(path)?.diff,
        None => DiffOptions::default(),
    };
    if flags.order_insensitive {
        options.order_insensitive = true;
    }
    if flags.no_cycles_fix {
        options.cycles_fix = false;
    }
    for key in &flags.ignore_keys {
        if !options.ignores(key) {
            options.ignore_keys.push(key.clone());
        }
    }
    Ok(options)
}
