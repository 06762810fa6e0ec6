//! Concurrent validation runs

use crate::config::EngineConfig;
use crate::context::ValidationContext;
use crate::evaluator::OrgUnitEvaluator;
use crate::provider::{DataSource, NoOpProgress, ProgressSink};
use crate::rule_index::RuleIndexSet;
use crate::EngineResult;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Instrument, error, info, info_span, warn};
use valrule_expr::{ExpressionEngine, ExpressionService};
use valrule_model::{OrgUnitId, ValidationResult};

/// An org unit whose data could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub org_unit: OrgUnitId,
    pub message: String,
}

/// Outcome of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Violations in their natural order
    pub results: Vec<ValidationResult>,
    pub failed_units: Vec<UnitFailure>,
    /// The result cap was hit and evaluation stopped there
    ///
    /// Set whenever `max_results` results were collected, including a run
    /// whose violations number exactly `max_results`.
    pub truncated: bool,
    /// The progress sink cancelled the run before every org unit started
    pub cancelled: bool,
}

impl ValidationSummary {
    pub fn is_clean(&self) -> bool {
        self.results.is_empty() && self.failed_units.is_empty()
    }
}

/// Schedules one [`OrgUnitEvaluator`] per org unit
pub struct ValidationRunner {
    service: Arc<dyn ExpressionService>,
    source: Arc<dyn DataSource>,
    progress: Arc<dyn ProgressSink>,
    config: EngineConfig,
}

impl ValidationRunner {
    /// Runner with the default expression engine, configuration and no
    /// progress reporting
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            service: Arc::new(ExpressionEngine::new()),
            source,
            progress: Arc::new(NoOpProgress),
            config: EngineConfig::default(),
        }
    }

    pub fn with_service(mut self, service: Arc<dyn ExpressionService>) -> Self {
        self.service = service;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn service(&self) -> &dyn ExpressionService {
        self.service.as_ref()
    }

    pub fn source(&self) -> &dyn DataSource {
        self.source.as_ref()
    }

    /// Evaluate the context's request
    ///
    /// A bad expression fails the whole run. A failed data fetch is recorded
    /// in [`ValidationSummary::failed_units`] and the other org units carry on.
    pub async fn run(&self, context: &ValidationContext) -> EngineResult<ValidationSummary> {
        let org_units = context.resolve_org_units();
        let index = RuleIndexSet::build(context, self.service.as_ref(), &self.config)
            .inspect_err(|err| error!(error = %err, "rule indexing failed"))?;
        info!(
            org_units = org_units.len(),
            rules = index.rule_count(),
            periods = index.period_count(),
            concurrency = self.config.effective_concurrency(),
            "validation started"
        );

        let cancelled = AtomicBool::new(false);
        let mut failed_units = Vec::new();
        if !index.is_empty() {
            let index = &index;
            let cancelled = &cancelled;
            let mut outcomes = futures::stream::iter(&org_units)
                .map(|org_unit| async move {
                    if self.progress.is_cancelled() {
                        cancelled.store(true, Ordering::Relaxed);
                        return None;
                    }
                    if context.is_cap_reached() {
                        return None;
                    }
                    let evaluator = OrgUnitEvaluator::new(
                        context,
                        index,
                        self.service.as_ref(),
                        self.source.as_ref(),
                    );
                    let outcome = evaluator
                        .evaluate(org_unit)
                        .instrument(info_span!("org_unit", id = %org_unit.id))
                        .await;
                    self.progress.tick(&org_unit.id);
                    Some((org_unit, outcome))
                })
                .buffer_unordered(self.config.effective_concurrency());

            while let Some(finished) = outcomes.next().await {
                let Some((org_unit, outcome)) = finished else {
                    continue;
                };
                match outcome {
                    Ok(_) => {}
                    Err(err) if err.is_isolated() => {
                        warn!(org_unit = %org_unit.id, error = %err, "org unit skipped");
                        failed_units.push(UnitFailure {
                            org_unit: org_unit.id.clone(),
                            message: err.to_string(),
                        });
                    }
                    Err(err) => {
                        error!(org_unit = %org_unit.id, error = %err, "validation aborted");
                        return Err(err);
                    }
                }
            }
        }

        let mut results = context.take_results();
        results.sort();
        failed_units.sort_by(|a, b| a.org_unit.cmp(&b.org_unit));
        let summary = ValidationSummary {
            results,
            failed_units,
            truncated: context.is_cap_reached(),
            cancelled: cancelled.load(Ordering::Relaxed),
        };
        info!(
            results = summary.results.len(),
            failed_units = summary.failed_units.len(),
            truncated = summary.truncated,
            cancelled = summary.cancelled,
            "validation finished"
        );
        Ok(summary)
    }
}
