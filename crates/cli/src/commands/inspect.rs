use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use injectscope_core::{
    ClasspathProject, ContextInspector, JobRunner, ModuleRegistry, ProjectId, TracingMessenger,
    module::StaticDiscovery, progress::TracingReporter,
};

use super::{load_config, project_name};
use crate::display::print_results;

pub fn inspect_command(config_path: Option<&str>, validate_modules: bool) -> Result<()> {
    let (config, root) = load_config(config_path)?;
    let name = project_name(&root);
    let messenger = Arc::new(TracingMessenger);

    // Configured contexts are the only source of modules here
    let discovery = Arc::new(StaticDiscovery::new());
    let project_id = ProjectId::new(name.as_str());
    discovery.set_modules(
        &project_id,
        config
            .modules
            .contexts
            .iter()
            .flat_map(|ctx| ctx.modules.iter().cloned()),
    );

    let registry = ModuleRegistry::new(discovery, messenger.clone());
    registry.set_current_project(Some(project_id.clone()));
    registry
        .configure(&config.modules)
        .context("Failed to register configured contexts")?;
    if !registry.update_modules(&project_id, true) {
        info!("Module refresh did not complete");
    }

    let runner = JobRunner::with_reporter(
        Arc::new(ClasspathProject::from_config(name.as_str(), &config).with_working_dir(&root)),
        messenger,
        Arc::new(TracingReporter),
        &config.scheduler,
    );
    let inspector = ContextInspector::from_config(&config.snippets);

    if validate_modules {
        let queued = inspector.queue_modules(&registry, &runner);
        runner.run(&format!("Validating modules in {name}"), config.scheduler.background);
        runner.wait_for();
        inspector
            .record_module_results(&registry, &queued)
            .context("Failed to record module results")?;
        print_results(&inspector.collect_modules("Modules", &queued));
    }

    let queued = inspector.queue_active_contexts(&registry, &runner);
    if queued.is_empty() {
        println!("No active module contexts");
        return Ok(());
    }

    let title = format!("Bindings in {name}");
    runner.run(&title, config.scheduler.background);
    runner.wait_for();

    let results = inspector.collect(&title, &queued);
    if results.is_empty() {
        println!("No results");
    } else {
        print_results(&results);
    }
    Ok(())
}
