use serde::{Deserialize, Serialize};

use crate::{
    config::ContextConfig,
    snippets::{SnippetOutput, SnippetResult},
};

/// A module as last reported by discovery or a module snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRepresentation {
    pub name: String,
    pub valid: bool,
    pub has_default_constructor: bool,
}

impl ModuleRepresentation {
    /// A module known only by name; assumed valid until a snippet says otherwise
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            valid: true,
            has_default_constructor: false,
        }
    }

    pub fn from_result(result: &SnippetResult) -> Option<Self> {
        match &result.output {
            SnippetOutput::Module {
                name,
                valid,
                has_default_constructor,
            } => Some(Self {
                name: name.clone(),
                valid: *valid,
                has_default_constructor: *has_default_constructor,
            }),
            SnippetOutput::Context { .. } => None,
        }
    }
}

/// One way of assembling an injector: a named list of module names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleContext {
    pub name: String,
    pub modules: Vec<String>,
    pub active: bool,
    /// Set when the context was derived from a single module and should go away with it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl ModuleContext {
    pub fn new(name: impl Into<String>, modules: Vec<String>) -> Self {
        Self {
            name: name.into(),
            modules,
            active: false,
            origin: None,
        }
    }

    /// The context implied by a lone module
    pub fn for_module(module: &str) -> Self {
        Self {
            name: module.to_string(),
            modules: vec![module.to_string()],
            active: false,
            origin: Some(module.to_string()),
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn references(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m == module)
    }
}

impl From<&ContextConfig> for ModuleContext {
    fn from(config: &ContextConfig) -> Self {
        ModuleContext::new(config.name.clone(), config.modules.clone()).with_active(config.active)
    }
}
