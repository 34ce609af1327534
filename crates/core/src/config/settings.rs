use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE_NAMES: [&str; 2] = [".injectscope.json", "injectscope.json"];

/// Environment variable that replaces the configured runtime command
pub const RUNTIME_ENV: &str = "INJECTSCOPE_RUNTIME";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub classpath: ClasspathConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
    #[serde(default)]
    pub snippets: SnippetsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "RuntimeConfig::default_command")]
    pub command: String,
    #[serde(default)]
    pub flags: Vec<String>,
}

impl RuntimeConfig {
    fn default_command() -> String {
        "java".to_string()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command: Self::default_command(),
            flags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClasspathConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippets: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on how long a cancellation can go unnoticed
    #[serde(default = "SchedulerConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long a snippet may keep running after it wrote its result
    #[serde(default = "SchedulerConfig::default_exit_grace_ms")]
    pub exit_grace_ms: u64,
    /// Run without a user-visible progress surface
    #[serde(default = "SchedulerConfig::default_background")]
    pub background: bool,
}

impl SchedulerConfig {
    fn default_poll_interval_ms() -> u64 {
        100
    }

    fn default_exit_grace_ms() -> u64 {
        2_000
    }

    fn default_background() -> bool {
        true
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn exit_grace(&self) -> Duration {
        Duration::from_millis(self.exit_grace_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: Self::default_poll_interval_ms(),
            exit_grace_ms: Self::default_exit_grace_ms(),
            background: Self::default_background(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulesConfig {
    #[serde(default = "ModulesConfig::default_activate_by_default")]
    pub activate_by_default: bool,
    #[serde(default)]
    pub run_automatically: bool,
    #[serde(default)]
    pub contexts: Vec<ContextConfig>,
}

impl ModulesConfig {
    fn default_activate_by_default() -> bool {
        true
    }
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            activate_by_default: Self::default_activate_by_default(),
            run_automatically: false,
            contexts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub name: String,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default = "ContextConfig::default_active")]
    pub active: bool,
}

impl ContextConfig {
    fn default_active() -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetsConfig {
    /// Snippet that assembles an injector from a context's modules and reports its bindings
    #[serde(default = "SnippetsConfig::default_context_class")]
    pub context_class: String,
    /// Snippet that validates a single module
    #[serde(default = "SnippetsConfig::default_module_class")]
    pub module_class: String,
}

impl SnippetsConfig {
    fn default_context_class() -> String {
        "injectscope.snippets.ModuleContextSnippet".to_string()
    }

    fn default_module_class() -> String {
        "injectscope.snippets.ModuleSnippet".to_string()
    }
}

impl Default for SnippetsConfig {
    fn default() -> Self {
        Self {
            context_class: Self::default_context_class(),
            module_class: Self::default_module_class(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Load the nearest config file above `start_path`, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(start_path: &Path) -> Result<Self> {
        let config = match Self::find_config_file(start_path) {
            Some(path) => {
                debug!("Loading config from {:?}", path);
                Self::load_from_file(&path)?
            }
            None => {
                debug!("No config file found above {:?}, using defaults", start_path);
                Self::default()
            }
        };
        Ok(config.with_env_overrides(std::env::var(RUNTIME_ENV).ok()))
    }

    pub fn with_env_overrides(mut self, runtime: Option<String>) -> Self {
        if let Some(command) = runtime.filter(|c| !c.trim().is_empty()) {
            self.runtime.command = command;
        }
        self
    }

    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path;

        loop {
            for name in CONFIG_FILE_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    return Some(config_path);
                }
            }

            current = current.parent()?;
        }
    }
}
