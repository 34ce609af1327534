use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use tracing::{debug, info};

use super::{
    discovery::ModuleDiscovery,
    types::{ModuleContext, ModuleRepresentation},
};
use crate::{
    config::ModulesConfig,
    error::{Error, Result},
    messenger::Messenger,
    progress::{
        ProgressReporter, ProgressStep, ProgressTracker, RunStatus, StepSignal, TracingReporter,
    },
    project::ProjectId,
};

static NEXT_REGISTRY: AtomicUsize = AtomicUsize::new(1);

/// Tracks the modules and module contexts of every project the host has opened.
///
/// Unqualified operations act on the current project, which the host sets on
/// project switch. Mutating without a current project fails with
/// [`Error::NoProject`] and changes nothing; unqualified reads return nothing.
pub struct ModuleRegistry {
    name: String,
    state: Arc<Mutex<RegistryState>>,
    discovery: Arc<dyn ModuleDiscovery>,
    messenger: Arc<dyn Messenger>,
    tracker: ProgressTracker,
}

struct RegistryState {
    current: Option<ProjectId>,
    projects: HashMap<ProjectId, ProjectModules>,
    run_automatically: bool,
    activate_by_default: bool,
}

#[derive(Default)]
struct ProjectModules {
    modules: BTreeMap<String, ModuleRepresentation>,
    contexts: BTreeMap<String, ModuleContext>,
}

impl ProjectModules {
    fn remove_module(&mut self, name: &str) -> bool {
        let removed = self.modules.remove(name).is_some();
        self.contexts
            .retain(|_, ctx| ctx.origin.as_deref() != Some(name));
        removed
    }

    /// Replace the module set with `names`, keeping what is already known about survivors
    fn apply_discovered(&mut self, names: &BTreeSet<String>) {
        self.modules.retain(|name, _| names.contains(name));
        for name in names {
            self.modules
                .entry(name.clone())
                .or_insert_with(|| ModuleRepresentation::named(name.as_str()));
        }
        let modules = &self.modules;
        self.contexts.retain(|_, ctx| {
            ctx.origin
                .as_ref()
                .is_none_or(|origin| modules.contains_key(origin))
        });
    }
}

impl ModuleRegistry {
    pub fn new(discovery: Arc<dyn ModuleDiscovery>, messenger: Arc<dyn Messenger>) -> Self {
        Self::with_reporter(discovery, messenger, Arc::new(TracingReporter))
    }

    pub fn with_reporter(
        discovery: Arc<dyn ModuleDiscovery>,
        messenger: Arc<dyn Messenger>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        let id = NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed);
        Self {
            name: format!("ModuleRegistry#{id}"),
            state: Arc::new(Mutex::new(RegistryState {
                current: None,
                projects: HashMap::new(),
                run_automatically: false,
                activate_by_default: true,
            })),
            tracker: ProgressTracker::new(reporter, Arc::clone(&messenger)),
            discovery,
            messenger,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply configured flags and register configured contexts in the current project
    pub fn configure(&self, config: &ModulesConfig) -> Result<()> {
        {
            let mut state = self.state.lock();
            if !config.contexts.is_empty() && state.current.is_none() {
                return Err(self.no_project());
            }
            state.activate_by_default = config.activate_by_default;
            state.run_automatically = config.run_automatically;
        }
        for context in &config.contexts {
            let context = ModuleContext::from(context);
            let active = context.active;
            self.add_module_context(context, active)?;
        }
        Ok(())
    }

    fn no_project(&self) -> Error {
        Error::NoProject {
            registry: self.name.clone(),
        }
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut ProjectModules, bool) -> T) -> Result<T> {
        let mut state = self.state.lock();
        let project = state.current.clone().ok_or_else(|| self.no_project())?;
        let activate = state.activate_by_default;
        Ok(f(state.projects.entry(project).or_default(), activate))
    }

    fn read<T: Default>(&self, project: Option<&ProjectId>, f: impl FnOnce(&ProjectModules) -> T) -> T {
        let state = self.state.lock();
        project
            .or(state.current.as_ref())
            .and_then(|project| state.projects.get(project))
            .map(f)
            .unwrap_or_default()
    }

    // ---- project selection

    /// Switch the current project; `None` means no project is open
    pub fn set_current_project(&self, project: Option<ProjectId>) {
        {
            let mut state = self.state.lock();
            if state.current == project {
                return;
            }
            info!(
                "{}: current project is now {}",
                self.name,
                project.as_ref().map_or("<none>", ProjectId::as_str)
            );
            state.current = project.clone();
        }
        self.discovery.project_changed(project.as_ref());
    }

    pub fn current_project(&self) -> Option<ProjectId> {
        self.state.lock().current.clone()
    }

    // ---- modules

    pub fn add_module(&self, name: &str, create_context: bool) -> Result<()> {
        self.add_module_representation(ModuleRepresentation::named(name), create_context)
    }

    /// Add or update a module. With `create_context`, a context named after
    /// the module is created too, active if modules activate by default.
    pub fn add_module_representation(
        &self,
        module: ModuleRepresentation,
        create_context: bool,
    ) -> Result<()> {
        self.mutate(|project, activate| {
            if create_context && !project.contexts.contains_key(&module.name) {
                let context = ModuleContext::for_module(&module.name).with_active(activate);
                project.contexts.insert(context.name.clone(), context);
            }
            project.modules.insert(module.name.clone(), module);
        })
    }

    /// Remove a module and any context that was created for it.
    /// Removing an unknown module is a no-op.
    pub fn remove_module(&self, name: &str) -> Result<()> {
        self.mutate(|project, _| {
            if project.remove_module(name) {
                debug!("{}: removed module {}", self.name, name);
            }
        })
    }

    pub fn remove_module_representation(&self, module: &ModuleRepresentation) -> Result<()> {
        self.remove_module(&module.name)
    }

    /// Record a module found by discovery; never creates a context
    pub fn init_module_name(&self, name: &str) -> Result<()> {
        self.mutate(|project, _| {
            project
                .modules
                .entry(name.to_string())
                .or_insert_with(|| ModuleRepresentation::named(name));
        })
    }

    pub fn clear_modules(&self) -> Result<()> {
        self.mutate(|project, _| {
            project.modules.clear();
            project.contexts.retain(|_, ctx| ctx.origin.is_none());
        })
    }

    pub fn clear_modules_for(&self, project: &ProjectId) {
        if let Some(modules) = self.state.lock().projects.get_mut(project) {
            modules.modules.clear();
            modules.contexts.retain(|_, ctx| ctx.origin.is_none());
        }
    }

    pub fn modules(&self) -> Vec<ModuleRepresentation> {
        self.read(None, |p| p.modules.values().cloned().collect())
    }

    pub fn modules_for(&self, project: &ProjectId) -> Vec<ModuleRepresentation> {
        self.read(Some(project), |p| p.modules.values().cloned().collect())
    }

    /// Contexts of the current project that reference `module`
    pub fn module_changed(&self, module: &str) -> Vec<String> {
        self.read(None, |p| {
            p.contexts
                .values()
                .filter(|ctx| ctx.references(module))
                .map(|ctx| ctx.name.clone())
                .collect()
        })
    }

    // ---- contexts

    /// Add or replace a context by name
    pub fn add_module_context(&self, context: ModuleContext, active: bool) -> Result<()> {
        self.mutate(|project, _| {
            let context = context.with_active(active);
            project.contexts.insert(context.name.clone(), context);
        })
    }

    pub fn remove_module_context(&self, name: &str) -> Result<bool> {
        self.mutate(|project, _| project.contexts.remove(name).is_some())
    }

    pub fn clear_module_contexts(&self) -> Result<()> {
        self.mutate(|project, _| project.contexts.clear())
    }

    pub fn clear_module_contexts_for(&self, project: &ProjectId) {
        if let Some(modules) = self.state.lock().projects.get_mut(project) {
            modules.contexts.clear();
        }
    }

    /// Returns false if the current project has no such context
    pub fn activate_module_context(&self, name: &str) -> Result<bool> {
        self.set_context_active(name, true)
    }

    pub fn deactivate_module_context(&self, name: &str) -> Result<bool> {
        self.set_context_active(name, false)
    }

    fn set_context_active(&self, name: &str, active: bool) -> Result<bool> {
        self.mutate(|project, _| match project.contexts.get_mut(name) {
            Some(context) => {
                context.active = active;
                true
            }
            None => false,
        })
    }

    pub fn module_contexts(&self) -> Vec<ModuleContext> {
        self.read(None, |p| p.contexts.values().cloned().collect())
    }

    pub fn module_contexts_for(&self, project: &ProjectId) -> Vec<ModuleContext> {
        self.read(Some(project), |p| p.contexts.values().cloned().collect())
    }

    pub fn active_module_contexts(&self) -> Vec<ModuleContext> {
        self.read(None, active_contexts)
    }

    pub fn active_module_contexts_for(&self, project: &ProjectId) -> Vec<ModuleContext> {
        self.read(Some(project), active_contexts)
    }

    // ---- flags

    pub fn set_run_automatically(&self, run: bool) {
        self.state.lock().run_automatically = run;
    }

    pub fn runs_automatically(&self) -> bool {
        self.state.lock().run_automatically
    }

    pub fn activate_modules_by_default(&self) -> bool {
        self.state.lock().activate_by_default
    }

    pub fn set_activate_modules_by_default(&self, activate: bool) {
        self.state.lock().activate_by_default = activate;
    }

    // ---- discovery

    pub fn find_changes(&self) {
        self.discovery.find_changes();
    }

    /// Refresh `project`'s modules from discovery.
    ///
    /// With `wait_for`, blocks until the refresh finishes and returns false if
    /// it was cancelled or failed. Without it, returns once the refresh is
    /// scheduled; a refresh requested while another runs joins that run.
    pub fn update_modules(&self, project: &ProjectId, wait_for: bool) -> bool {
        let step = Arc::new(DiscoveryStep {
            project: project.clone(),
            discovery: Arc::clone(&self.discovery),
            state: Arc::clone(&self.state),
            messenger: Arc::clone(&self.messenger),
            found: Mutex::new(None),
            done: AtomicBool::new(false),
            applied: AtomicBool::new(false),
        });

        if self.tracker.is_running() {
            if !wait_for && self.tracker.join_running(step.clone()) {
                debug!("{}: {} queued behind running refresh", self.name, project);
                return true;
            }
            self.tracker.wait_for();
        }

        self.tracker.step(step.clone());

        let label = format!("Updating modules for {project}");
        if let Err(e) = self.tracker.go(&label, !wait_for, |_| {}) {
            self.messenger.log_exception(&label, &e);
            return false;
        }

        if !wait_for {
            return true;
        }
        self.tracker.wait_for() == RunStatus::Completed && step.applied.load(Ordering::SeqCst)
    }

    /// Cancel a running refresh; module state stays as it was
    pub fn cancel_update(&self) {
        self.tracker.cancel();
    }

    pub fn is_updating(&self) -> bool {
        self.tracker.is_running()
    }
}

fn active_contexts(project: &ProjectModules) -> Vec<ModuleContext> {
    project
        .contexts
        .values()
        .filter(|ctx| ctx.active)
        .cloned()
        .collect()
}

/// Runs discovery off-thread; results land in the registry only on completion
struct DiscoveryStep {
    project: ProjectId,
    discovery: Arc<dyn ModuleDiscovery>,
    state: Arc<Mutex<RegistryState>>,
    messenger: Arc<dyn Messenger>,
    found: Mutex<Option<Result<BTreeSet<String>>>>,
    done: AtomicBool,
    applied: AtomicBool,
}

impl DiscoveryStep {
    fn deliver(&self, found: Result<BTreeSet<String>>, signal: &StepSignal) {
        *self.found.lock() = Some(found);
        self.done.store(true, Ordering::SeqCst);
        signal.notify();
    }
}

impl ProgressStep for DiscoveryStep {
    fn label(&self) -> String {
        format!("Finding modules in {}", self.project)
    }

    fn start(self: Arc<Self>, signal: StepSignal) {
        let step = Arc::clone(&self);
        let worker_signal = signal.clone();
        let spawned = thread::Builder::new()
            .name("injectscope-discovery".to_string())
            .spawn(move || {
                let found = step.discovery.find_modules(&step.project);
                step.deliver(found, &worker_signal);
            });

        if let Err(e) = spawned {
            self.deliver(Err(Error::Io(e)), &signal);
        }
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    fn complete(&self) {
        match self.found.lock().take() {
            Some(Ok(names)) => {
                debug!("Found {} modules in {}", names.len(), self.project);
                self.state
                    .lock()
                    .projects
                    .entry(self.project.clone())
                    .or_default()
                    .apply_discovered(&names);
                self.applied.store(true, Ordering::SeqCst);
            }
            Some(Err(e)) => {
                self.messenger
                    .log_exception(&format!("Module discovery failed for {}", self.project), &e);
            }
            None => {}
        }
    }

    fn cancel(&self) {
        self.found.lock().take();
        self.done.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::NullMessenger;
    use crate::module::StaticDiscovery;
    use crate::progress::NullReporter;

    fn registry_with(discovery: Arc<StaticDiscovery>) -> ModuleRegistry {
        ModuleRegistry::with_reporter(discovery, Arc::new(NullMessenger), Arc::new(NullReporter))
    }

    fn registry() -> ModuleRegistry {
        registry_with(Arc::new(StaticDiscovery::new()))
    }

    fn names(modules: Vec<ModuleRepresentation>) -> Vec<String> {
        modules.into_iter().map(|m| m.name).collect()
    }

    fn demo() -> ProjectId {
        ProjectId::new("demo")
    }

    #[test]
    fn test_mutators_without_project_fail_and_change_nothing() {
        let registry = registry();
        let context = ModuleContext::new("ctx", vec!["a.A".into()]);

        let outcomes = [
            registry.add_module("a.A", true).map(|_| ()),
            registry.remove_module("a.A"),
            registry.init_module_name("a.A"),
            registry.clear_modules(),
            registry.add_module_context(context, true),
            registry.remove_module_context("ctx").map(|_| ()),
            registry.clear_module_contexts(),
            registry.activate_module_context("ctx").map(|_| ()),
            registry.deactivate_module_context("ctx").map(|_| ()),
        ];
        for outcome in outcomes {
            match outcome {
                Err(Error::NoProject { registry: name }) => assert_eq!(name, registry.name()),
                other => panic!("expected NoProject, got {other:?}"),
            }
        }

        assert!(registry.modules().is_empty());
        assert!(registry.module_contexts().is_empty());
        assert!(registry.modules_for(&demo()).is_empty());
    }

    #[test]
    fn test_modules_reflect_net_additions_for_any_order() {
        let pool = ["a.A", "b.B", "c.C", "d.D"];
        let mut seed: u64 = 0x2545_f491;

        for _ in 0..200 {
            let registry = registry();
            registry.set_current_project(Some(demo()));
            let mut expected = BTreeSet::new();

            for _ in 0..12 {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let name = pool[(seed >> 33) as usize % pool.len()];
                if (seed >> 20) & 1 == 0 {
                    registry.add_module(name, false).unwrap();
                    expected.insert(name.to_string());
                } else {
                    registry.remove_module(name).unwrap();
                    expected.remove(name);
                }
            }

            let actual: BTreeSet<String> = names(registry.modules()).into_iter().collect();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_derived_context_follows_its_module() {
        let registry = registry();
        registry.set_current_project(Some(demo()));

        registry.add_module("a.A", true).unwrap();
        let contexts = registry.module_contexts();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].name, "a.A");
        assert!(contexts[0].active);
        assert_eq!(registry.module_changed("a.A"), vec!["a.A"]);

        registry.remove_module("a.A").unwrap();
        assert!(registry.module_contexts().is_empty());
    }

    #[test]
    fn test_derived_context_respects_activation_default() {
        let registry = registry();
        registry.set_current_project(Some(demo()));
        registry.set_activate_modules_by_default(false);

        registry.add_module("a.A", true).unwrap();
        assert!(registry.active_module_contexts().is_empty());
        assert_eq!(registry.module_contexts().len(), 1);
    }

    #[test]
    fn test_activation_never_creates_contexts() {
        let registry = registry();
        registry.set_current_project(Some(demo()));

        assert!(!registry.activate_module_context("missing").unwrap());
        assert!(registry.module_contexts().is_empty());

        registry
            .add_module_context(ModuleContext::new("ctx", vec!["a.A".into()]), false)
            .unwrap();
        assert!(registry.active_module_contexts().is_empty());
        assert!(registry.activate_module_context("ctx").unwrap());
        assert_eq!(registry.active_module_contexts().len(), 1);
        assert!(registry.deactivate_module_context("ctx").unwrap());
        assert!(registry.active_module_contexts().is_empty());
        assert_eq!(registry.module_contexts().len(), 1);
    }

    #[test]
    fn test_qualified_reads_ignore_current_project() {
        let registry = registry();
        let other = ProjectId::new("other");

        registry.set_current_project(Some(demo()));
        registry.add_module("a.A", false).unwrap();
        registry
            .add_module_context(ModuleContext::new("ctx", vec!["a.A".into()]), true)
            .unwrap();

        registry.set_current_project(Some(other.clone()));
        assert!(registry.modules().is_empty());
        assert_eq!(names(registry.modules_for(&demo())), vec!["a.A"]);
        assert_eq!(registry.active_module_contexts_for(&demo()).len(), 1);
        assert!(registry.active_module_contexts_for(&other).is_empty());

        registry.set_current_project(None);
        assert!(registry.modules().is_empty());
        assert_eq!(registry.module_contexts_for(&demo()).len(), 1);
    }

    #[test]
    fn test_clear_keeps_explicit_contexts() {
        let registry = registry();
        registry.set_current_project(Some(demo()));
        registry.add_module("a.A", true).unwrap();
        registry
            .add_module_context(ModuleContext::new("explicit", vec!["a.A".into()]), true)
            .unwrap();

        registry.clear_modules().unwrap();
        assert!(registry.modules().is_empty());
        let contexts = registry.module_contexts();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].name, "explicit");

        registry.clear_module_contexts().unwrap();
        assert!(registry.module_contexts().is_empty());
    }

    #[test]
    fn test_update_modules_waits_for_discovery() {
        let discovery = Arc::new(StaticDiscovery::new());
        discovery.set_modules(&demo(), ["a.A", "b.B"]);
        let registry = registry_with(Arc::clone(&discovery));
        registry.set_current_project(Some(demo()));
        registry.add_module("stale.Module", true).unwrap();
        registry.add_module("a.A", false).unwrap();

        assert!(registry.update_modules(&demo(), true));
        assert_eq!(names(registry.modules()), vec!["a.A", "b.B"]);
        // the derived context of a vanished module goes with it
        assert!(registry.module_contexts().is_empty());
    }

    #[test]
    fn test_update_modules_in_background() {
        let discovery = Arc::new(StaticDiscovery::new());
        discovery.set_modules(&demo(), ["a.A"]);
        let registry = registry_with(discovery);

        assert!(registry.update_modules(&demo(), false));
        registry.tracker.wait_for();
        assert_eq!(names(registry.modules_for(&demo())), vec!["a.A"]);
    }

    #[test]
    fn test_update_of_unregistered_project_fails() {
        let registry = registry();
        registry.set_current_project(Some(demo()));
        registry.add_module("kept.Module", false).unwrap();

        assert!(!registry.update_modules(&demo(), true));
        assert_eq!(names(registry.modules()), vec!["kept.Module"]);
    }

    #[test]
    fn test_cancelled_update_leaves_state_intact() {
        struct Cancelled;
        impl ProgressReporter for Cancelled {
            fn is_cancelled(&self) -> bool {
                true
            }
        }

        let discovery = Arc::new(StaticDiscovery::new());
        discovery.set_modules(&demo(), ["a.A"]);
        let registry =
            ModuleRegistry::with_reporter(discovery, Arc::new(NullMessenger), Arc::new(Cancelled));
        registry.set_current_project(Some(demo()));
        registry.add_module("kept.Module", false).unwrap();

        assert!(!registry.update_modules(&demo(), true));
        assert_eq!(names(registry.modules()), vec!["kept.Module"]);
    }

    #[test]
    fn test_configure_registers_contexts() {
        let registry = registry();
        let config: ModulesConfig = serde_json::from_str(
            r#"{"activate_by_default": false, "run_automatically": true,
                "contexts": [{"name": "prod", "modules": ["a.A"]},
                             {"name": "test", "modules": ["a.A", "t.T"], "active": false}]}"#,
        )
        .unwrap();

        assert!(matches!(
            registry.configure(&config),
            Err(Error::NoProject { .. })
        ));

        registry.set_current_project(Some(demo()));
        registry.configure(&config).unwrap();
        assert!(registry.runs_automatically());
        assert!(!registry.activate_modules_by_default());
        let active: Vec<_> = registry
            .active_module_contexts()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(active, vec!["prod"]);
    }
}
