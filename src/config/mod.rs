mod types;

pub use types::*;

use crate::{Error, Result};
use std::{env, io::ErrorKind};
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

pub async fn load() -> Result<Config> {
    let explicit_path = env::var("CONFIG_PATH").ok();
    let required = explicit_path.is_some();
    let config_path = explicit_path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let mut config = load_from(&config_path, required).await?;
    apply_env_overrides(&mut config, |key| env::var(key).ok())?;

    Ok(config)
}

/// Reads a YAML config file. A missing file yields the defaults unless
/// `required` is set.
pub async fn load_from(path: &str, required: bool) -> Result<Config> {
    debug!("Loading configuration from: {}", path);

    match tokio::fs::read_to_string(path).await {
        Ok(config_str) => Ok(serde_yaml::from_str(&config_str)?),
        Err(e) if e.kind() == ErrorKind::NotFound && !required => {
            info!("No {} found, using built-in defaults", path);
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Applies `PORT`, `HOST` and `MODEL_PATH` on top of the file configuration.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("Invalid PORT value: '{}'", port)))?;
    }

    if let Some(host) = lookup("HOST") {
        config.server.host = host;
    }

    if let Some(model_path) = lookup("MODEL_PATH") {
        config.model.path = model_path;
    }

    Ok(())
}
