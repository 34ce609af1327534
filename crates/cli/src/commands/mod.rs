pub mod init;
pub mod inspect;
pub mod run;

pub use init::init_command;
pub use inspect::inspect_command;
pub use run::run_command;

use anyhow::{Context, Result};
use injectscope_core::Config;
use std::{env, path::Path, path::PathBuf};
use tracing::debug;

/// Load `--config` if given, otherwise search upwards from the current directory.
/// Returns the config and the directory that names the project.
pub(crate) fn load_config(explicit: Option<&str>) -> Result<(Config, PathBuf)> {
    match explicit {
        Some(path) => {
            let path = Path::new(path);
            let config = Config::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
                .with_env_overrides(env::var(injectscope_core::config::RUNTIME_ENV).ok());
            let root = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
                Some(parent) => parent.to_path_buf(),
                None => env::current_dir().context("Failed to get current directory")?,
            };
            Ok((config, root))
        }
        None => {
            let cwd = env::current_dir().context("Failed to get current directory")?;
            let config = Config::load(&cwd).context("Failed to load configuration")?;
            let root = Config::find_config_file(&cwd)
                .and_then(|p| p.parent().map(Path::to_path_buf))
                .unwrap_or(cwd);
            debug!("Project root: {}", root.display());
            Ok((config, root))
        }
    }
}

pub(crate) fn project_name(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "default".to_string())
}
