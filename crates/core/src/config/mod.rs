//! Configuration management for injectscope

mod settings;

// Re-export main types
pub use settings::{
    ClasspathConfig, Config, ContextConfig, ModulesConfig, RuntimeConfig, SchedulerConfig,
    SnippetsConfig, CONFIG_FILE_NAMES, RUNTIME_ENV,
};
