use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::VigilConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["vigil.toml", "vigil.yaml", "vigil.yml", "vigil.json"];

/// Load config from the given path (any supported format), then validate it.
pub fn load_config(path: &Path) -> anyhow::Result<VigilConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    let cfg = parse_config(&raw, path)?;
    cfg.schedule.validate()?;
    Ok(cfg)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./vigil.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/vigil/vigil.{toml,yaml,yml,json}` (user-global)
///
/// Returns `VigilConfig::default()` if no config file is found or the one
/// found fails to load.
pub fn discover_and_load() -> VigilConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    VigilConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .chain(
            config_dir()
                .into_iter()
                .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name))),
        )
        .find(|p| p.exists())
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "vigil")
}

/// Returns the user-global config directory (`~/.config/vigil/`).
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().to_path_buf())
}

/// Resolve the data directory: explicit override, then config, then the
/// platform default, then `./.vigil`.
pub fn data_dir(cfg: &VigilConfig, override_dir: Option<&Path>) -> PathBuf {
    override_dir
        .map(Path::to_path_buf)
        .or_else(|| cfg.storage.data_dir.clone())
        .or_else(|| project_dirs().map(|d| d.data_dir().to_path_buf()))
        .unwrap_or_else(|| PathBuf::from(".vigil"))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<VigilConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
