//! Show or save the effective configuration.

use std::path::PathBuf;

use formcoach_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, path: Option<PathBuf>, save: bool) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        let path = path.unwrap_or_else(config_file_path);
        config
            .save_to(&path)
            .map_err(|e| anyhow::anyhow!("Failed to save config: {e}"))?;
        eprintln!("Config saved to: {}", path.display());
    }

    Ok(())
}
