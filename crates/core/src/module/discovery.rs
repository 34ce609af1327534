use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};

use crate::{
    error::{Error, Result},
    project::ProjectId,
};

/// Finds the module classes in a project's sources.
///
/// Called from the registry's refresh worker, never from the host thread.
pub trait ModuleDiscovery: Send + Sync {
    fn find_modules(&self, project: &ProjectId) -> Result<BTreeSet<String>>;

    /// Re-scan sources that changed since the last call
    fn find_changes(&self) {}

    fn project_changed(&self, _project: Option<&ProjectId>) {}
}

/// Discovery backed by fixed, per-project module lists.
/// A project nobody registered a list for is a discovery error.
#[derive(Debug, Default)]
pub struct StaticDiscovery {
    modules: Mutex<HashMap<ProjectId, BTreeSet<String>>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_modules<I, S>(&self, project: &ProjectId, modules: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules.lock().insert(
            project.clone(),
            modules.into_iter().map(Into::into).collect(),
        );
    }
}

impl ModuleDiscovery for StaticDiscovery {
    fn find_modules(&self, project: &ProjectId) -> Result<BTreeSet<String>> {
        self.modules
            .lock()
            .get(project)
            .cloned()
            .ok_or_else(|| Error::Discovery(format!("no module list registered for {project}")))
    }
}
