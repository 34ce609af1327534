use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::{debug, info};

use injectscope_core::{
    ClasspathProject, JobRunner, LaunchSpecBuilder, Project, RunStatus, SnippetJob,
    TracingMessenger, progress::TracingReporter, results::ResultsBuilder, runner::JobOutcome,
};

use super::{load_config, project_name};
use crate::display::{print_command_breakdown, print_results};

pub fn run_command(
    class: &str,
    args: Vec<String>,
    dry_run: bool,
    label: Option<&str>,
    config_path: Option<&str>,
) -> Result<()> {
    let (config, root) = load_config(config_path)?;
    let project =
        ClasspathProject::from_config(project_name(&root), &config).with_working_dir(&root);
    debug!("Running snippet {} for project {}", class, project.id);

    if dry_run {
        let spec = LaunchSpecBuilder::for_project(&project)
            .snippet(class, args)
            .build()
            .context("Failed to build snippet command")?;
        println!("{}", spec.to_shell_command());
        print_command_breakdown(&spec, &project.classpath_delimiter());
        return Ok(());
    }

    let label = label.unwrap_or(class).to_string();
    let runner = JobRunner::with_reporter(
        Arc::new(project),
        Arc::new(TracingMessenger),
        Arc::new(TracingReporter),
        &config.scheduler,
    );
    let job = Arc::new(SnippetJob::new(label.clone(), class, args));
    runner.queue(job.clone());

    info!("Running: {}", label);
    runner.run(&label, config.scheduler.background);
    if runner.wait_for() == RunStatus::Cancelled {
        bail!("'{}' was cancelled", label);
    }

    match job.outcome() {
        JobOutcome::Output {
            result,
            diagnostics,
        } => {
            if !diagnostics.trim().is_empty() {
                eprintln!("{}", diagnostics.trim_end());
            }
            let mut builder = ResultsBuilder::new(label.as_str());
            builder.add_snippet_result(result.name(), &result);
            print_results(&builder.build());
            Ok(())
        }
        JobOutcome::Failed(message) => bail!("'{}' failed: {}", label, message),
        JobOutcome::Pending => bail!("'{}' produced no outcome", label),
    }
}
