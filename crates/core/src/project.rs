//! Project handles and the classpath provider consumed by the launcher

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Opaque identity of a user project
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only access to the pieces needed to launch a snippet for a project.
///
/// Every lookup may fail; a failure is reported to the job that needed it
/// and never aborts sibling steps.
pub trait Project: Send + Sync {
    fn id(&self) -> ProjectId;

    /// The runtime launcher, e.g. `java`
    fn runtime_command(&self) -> Result<String>;

    fn runtime_flags(&self) -> Result<Vec<String>>;

    fn project_classpath(&self) -> Result<String>;

    fn snippets_classpath(&self) -> Result<String>;

    /// Classpath of the injection library itself, when it is not already
    /// part of the project classpath
    fn library_classpath(&self) -> Result<Option<String>>;

    fn classpath_delimiter(&self) -> String {
        default_delimiter().to_string()
    }

    /// Directory snippets are launched from; `None` inherits the caller's
    fn working_dir(&self) -> Option<PathBuf> {
        None
    }
}

pub fn default_delimiter() -> &'static str {
    if cfg!(windows) { ";" } else { ":" }
}

/// A project whose classpath segments are fixed up front, usually from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClasspathProject {
    pub id: ProjectId,
    pub runtime_command: String,
    pub runtime_flags: Vec<String>,
    pub snippets_classpath: Option<String>,
    pub library_classpath: Option<String>,
    pub project_classpath: Option<String>,
    pub delimiter: Option<String>,
    pub working_dir: Option<PathBuf>,
}

impl ClasspathProject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(id),
            runtime_command: "java".to_string(),
            runtime_flags: Vec::new(),
            snippets_classpath: None,
            library_classpath: None,
            project_classpath: None,
            delimiter: None,
            working_dir: None,
        }
    }

    pub fn from_config(id: impl Into<String>, config: &Config) -> Self {
        Self {
            id: ProjectId::new(id),
            runtime_command: config.runtime.command.clone(),
            runtime_flags: config.runtime.flags.clone(),
            snippets_classpath: config.classpath.snippets.clone(),
            library_classpath: config.classpath.library.clone(),
            project_classpath: config.classpath.project.clone(),
            delimiter: config.classpath.delimiter.clone(),
            working_dir: None,
        }
    }

    pub fn with_runtime(mut self, command: impl Into<String>, flags: Vec<String>) -> Self {
        self.runtime_command = command.into();
        self.runtime_flags = flags;
        self
    }

    pub fn with_snippets_classpath(mut self, classpath: impl Into<String>) -> Self {
        self.snippets_classpath = Some(classpath.into());
        self
    }

    pub fn with_library_classpath(mut self, classpath: impl Into<String>) -> Self {
        self.library_classpath = Some(classpath.into());
        self
    }

    pub fn with_project_classpath(mut self, classpath: impl Into<String>) -> Self {
        self.project_classpath = Some(classpath.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl Project for ClasspathProject {
    fn id(&self) -> ProjectId {
        self.id.clone()
    }

    fn runtime_command(&self) -> Result<String> {
        if self.runtime_command.trim().is_empty() {
            return Err(Error::Classpath(format!(
                "no runtime command configured for project {}",
                self.id
            )));
        }
        Ok(self.runtime_command.clone())
    }

    fn runtime_flags(&self) -> Result<Vec<String>> {
        Ok(self.runtime_flags.clone())
    }

    fn project_classpath(&self) -> Result<String> {
        self.project_classpath.clone().ok_or_else(|| {
            Error::Classpath(format!("project classpath unknown for {}", self.id))
        })
    }

    fn snippets_classpath(&self) -> Result<String> {
        self.snippets_classpath.clone().ok_or_else(|| {
            Error::Classpath(format!("snippets classpath unknown for {}", self.id))
        })
    }

    fn library_classpath(&self) -> Result<Option<String>> {
        Ok(self.library_classpath.clone())
    }

    fn classpath_delimiter(&self) -> String {
        self.delimiter
            .clone()
            .unwrap_or_else(|| default_delimiter().to_string())
    }

    fn working_dir(&self) -> Option<PathBuf> {
        self.working_dir.clone()
    }
}
