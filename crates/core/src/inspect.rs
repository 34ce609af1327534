//! Plans snippet runs from the registry and collects their findings

use std::sync::Arc;

use tracing::debug;

use crate::{
    config::SnippetsConfig,
    error::Result,
    module::{ModuleContext, ModuleRegistry, ModuleRepresentation},
    results::{Results, ResultsBuilder},
    runner::{JobId, JobOutcome, JobRunner, SnippetJob},
};

/// A context whose snippet has been queued
#[derive(Debug, Clone)]
pub struct QueuedContext {
    pub context: ModuleContext,
    pub job_id: JobId,
    pub job: Arc<SnippetJob>,
}

/// A module whose validation snippet has been queued
#[derive(Debug, Clone)]
pub struct QueuedModule {
    pub module: String,
    pub job_id: JobId,
    pub job: Arc<SnippetJob>,
}

/// Queues the snippets that inspect a project's active contexts and modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInspector {
    context_class: String,
    module_class: String,
}

impl ContextInspector {
    pub fn new(context_class: impl Into<String>, module_class: impl Into<String>) -> Self {
        Self {
            context_class: context_class.into(),
            module_class: module_class.into(),
        }
    }

    pub fn from_config(config: &SnippetsConfig) -> Self {
        Self::new(config.context_class.clone(), config.module_class.clone())
    }

    /// Queue one context snippet per active context of the runner's project.
    /// The snippet receives the context's module names as arguments.
    pub fn queue_active_contexts(
        &self,
        registry: &ModuleRegistry,
        runner: &JobRunner,
    ) -> Vec<QueuedContext> {
        let project = runner.project().id();
        registry
            .active_module_contexts_for(&project)
            .into_iter()
            .map(|context| {
                let job = Arc::new(SnippetJob::new(
                    context.name.clone(),
                    self.context_class.clone(),
                    context.modules.clone(),
                ));
                let job_id = runner.queue(job.clone());
                debug!("Queued {} for context '{}'", job_id, context.name);
                QueuedContext {
                    context,
                    job_id,
                    job,
                }
            })
            .collect()
    }

    /// Queue one module snippet per known module of the runner's project
    pub fn queue_modules(&self, registry: &ModuleRegistry, runner: &JobRunner) -> Vec<QueuedModule> {
        let project = runner.project().id();
        registry
            .modules_for(&project)
            .into_iter()
            .map(|module| {
                let job = Arc::new(SnippetJob::new(
                    module.name.clone(),
                    self.module_class.clone(),
                    vec![module.name.clone()],
                ));
                let job_id = runner.queue(job.clone());
                QueuedModule {
                    module: module.name,
                    job_id,
                    job,
                }
            })
            .collect()
    }

    /// Build the result tree for a finished run, one child per context
    pub fn collect(&self, title: &str, queued: &[QueuedContext]) -> Results {
        let mut builder = ResultsBuilder::new(title);
        for entry in queued {
            add_outcome(&mut builder, &entry.context.name, entry.job.outcome());
        }
        builder.build()
    }

    /// Store what module snippets reported back into the registry's current project
    pub fn record_module_results(
        &self,
        registry: &ModuleRegistry,
        queued: &[QueuedModule],
    ) -> Result<usize> {
        let mut recorded = 0;
        for entry in queued {
            if let Some(module) = entry
                .job
                .result()
                .as_ref()
                .and_then(ModuleRepresentation::from_result)
            {
                registry.add_module_representation(module, false)?;
                recorded += 1;
            }
        }
        Ok(recorded)
    }

    pub fn collect_modules(&self, title: &str, queued: &[QueuedModule]) -> Results {
        let mut builder = ResultsBuilder::new(title);
        for entry in queued {
            add_outcome(&mut builder, &entry.module, entry.job.outcome());
        }
        builder.build()
    }
}

fn add_outcome(builder: &mut ResultsBuilder, heading: &str, outcome: JobOutcome) {
    match outcome {
        JobOutcome::Output { result, .. } => {
            builder.add_snippet_result(heading, &result);
        }
        JobOutcome::Failed(message) => {
            builder.add_failure(heading, &message);
        }
        JobOutcome::Pending => {
            builder.add_failure(heading, "no result");
        }
    }
}
