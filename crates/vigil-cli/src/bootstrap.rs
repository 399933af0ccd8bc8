use anyhow::Context;
use vigil_config::VigilConfig;

use crate::cli::GlobalFlags;

/// Load `.env`, then the layered config or the file given with `--config`.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<VigilConfig> {
    dotenvy::dotenv().ok();

    match &flags.config {
        Some(path) => VigilConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => VigilConfig::load().context("failed to load vigil config"),
    }
}
