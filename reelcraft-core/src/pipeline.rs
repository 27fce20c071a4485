//! # Loop Pipeline
//!
//! Runs a fixed list of stages in declaration order, repeated up to
//! `max_iterations` times. Stages are awaited one at a time against the same
//! context; a failing stage is recorded and the run moves on.

use crate::context::PipelineContext;
use crate::provider::Backend;
use crate::stage::{Stage, StageOutcome};

pub const DEFAULT_MAX_ITERATIONS: usize = 3;

#[derive(Debug, Clone)]
pub struct LoopPipeline {
    pub name: String,
    pub description: String,
    pub max_iterations: usize,
    pub stages: Vec<Stage>,
}

/// One stage run within one iteration
#[derive(Debug)]
pub struct StageRecord {
    /// 1-based
    pub iteration: usize,
    pub stage: String,
    pub outcome: StageOutcome,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub iterations: usize,
    pub records: Vec<StageRecord>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &StageRecord> {
        self.records.iter().filter(|r| !r.outcome.is_success())
    }

    /// Records of the last iteration that ran
    pub fn last_iteration(&self) -> impl Iterator<Item = &StageRecord> {
        let last = self.iterations;
        self.records.iter().filter(move |r| r.iteration == last)
    }
}

impl LoopPipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            stages: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_stage(mut self, stage: impl Into<Stage>) -> Self {
        self.stages.push(stage.into());
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub async fn run<B: Backend>(&self, backend: &B, ctx: &mut PipelineContext) -> RunReport {
        let mut report = RunReport::default();
        tracing::info!(
            pipeline = %self.name,
            stages = self.stages.len(),
            max_iterations = self.max_iterations,
            "pipeline started"
        );

        for iteration in 1..=self.max_iterations {
            tracing::info!(pipeline = %self.name, iteration, "iteration started");

            for stage in &self.stages {
                let outcome = stage.run(backend, ctx).await;
                if !outcome.is_success() {
                    tracing::warn!(pipeline = %self.name, iteration, stage = %stage.name(), "stage did not succeed");
                }
                report.records.push(StageRecord {
                    iteration,
                    stage: stage.name().to_string(),
                    outcome,
                });
            }
            report.iterations = iteration;
        }

        tracing::info!(
            pipeline = %self.name,
            iterations = report.iterations,
            failures = report.failures().count(),
            "pipeline finished"
        );
        report
    }
}
