//! Stage contract and per-run context
//!
//! A `PipelineContext` belongs to exactly one run. Files and chunks are fixed
//! when it is created; each stage output is committed once, after the phase
//! that produced it has joined. A second commit for the same agent is an
//! `InvalidStateTransition`, and reading an output that was never committed
//! is a `MissingDependency`.

use crate::agent::{AgentClient, AgentKind};
use crate::config::PipelineConfig;
use crate::error::{OrchestratorError, Result};
use crate::merge::StageResults;
use crate::pool::BoundedPool;
use crate::progress::ProgressReporter;
use crate::stages::{
    BehaviorResult, ExecutionResult, RiskResult, SemanticResult, StructureResult, SynthesisResult,
};
use crate::types::{Chunk, FileUnit};
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

/// Typed result of one stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Structure(StructureResult),
    Behavior(BehaviorResult),
    Semantic(SemanticResult),
    Risk(RiskResult),
    Execution(ExecutionResult),
    Synthesis(SynthesisResult),
}

impl StageOutput {
    pub fn agent(&self) -> AgentKind {
        match self {
            StageOutput::Structure(_) => AgentKind::Structure,
            StageOutput::Behavior(_) => AgentKind::Behavior,
            StageOutput::Semantic(_) => AgentKind::Semantic,
            StageOutput::Risk(_) => AgentKind::Risk,
            StageOutput::Execution(_) => AgentKind::Execution,
            StageOutput::Synthesis(_) => AgentKind::Synthesizer,
        }
    }
}

/// Per-run accumulator. Files and chunks are fixed at creation; each stage
/// output is committed exactly once.
#[derive(Debug)]
pub struct PipelineContext {
    run_id: Uuid,
    files: Vec<FileUnit>,
    chunks: Vec<Chunk>,
    outputs: HashMap<AgentKind, StageOutput>,
}

fn not_committed(agent: AgentKind) -> OrchestratorError {
    OrchestratorError::MissingDependency(format!("{} output has not been committed", agent))
}

impl PipelineContext {
    pub fn new(run_id: Uuid, files: Vec<FileUnit>, chunks: Vec<Chunk>) -> Self {
        Self {
            run_id,
            files,
            chunks,
            outputs: HashMap::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn files(&self) -> &[FileUnit] {
        &self.files
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn is_committed(&self, agent: AgentKind) -> bool {
        self.outputs.contains_key(&agent)
    }

    pub fn committed(&self) -> Vec<AgentKind> {
        let mut agents: Vec<AgentKind> = self.outputs.keys().copied().collect();
        agents.sort();
        agents
    }

    pub fn commit(&mut self, output: StageOutput) -> Result<()> {
        let agent = output.agent();
        if self.outputs.contains_key(&agent) {
            return Err(OrchestratorError::InvalidStateTransition {
                from: format!("{} committed", agent),
                to: format!("{} committed again", agent),
            });
        }
        self.outputs.insert(agent, output);
        Ok(())
    }

    pub fn structure(&self) -> Result<&StructureResult> {
        match self.outputs.get(&AgentKind::Structure) {
            Some(StageOutput::Structure(result)) => Ok(result),
            _ => Err(not_committed(AgentKind::Structure)),
        }
    }

    pub fn behavior(&self) -> Result<&BehaviorResult> {
        match self.outputs.get(&AgentKind::Behavior) {
            Some(StageOutput::Behavior(result)) => Ok(result),
            _ => Err(not_committed(AgentKind::Behavior)),
        }
    }

    pub fn semantic(&self) -> Result<&SemanticResult> {
        match self.outputs.get(&AgentKind::Semantic) {
            Some(StageOutput::Semantic(result)) => Ok(result),
            _ => Err(not_committed(AgentKind::Semantic)),
        }
    }

    pub fn risk(&self) -> Result<&RiskResult> {
        match self.outputs.get(&AgentKind::Risk) {
            Some(StageOutput::Risk(result)) => Ok(result),
            _ => Err(not_committed(AgentKind::Risk)),
        }
    }

    pub fn execution(&self) -> Result<&ExecutionResult> {
        match self.outputs.get(&AgentKind::Execution) {
            Some(StageOutput::Execution(result)) => Ok(result),
            _ => Err(not_committed(AgentKind::Execution)),
        }
    }

    pub fn synthesis(&self) -> Result<&SynthesisResult> {
        match self.outputs.get(&AgentKind::Synthesizer) {
            Some(StageOutput::Synthesis(result)) => Ok(result),
            _ => Err(not_committed(AgentKind::Synthesizer)),
        }
    }

    /// Move every stage output out for merging. Fails if any is missing.
    pub fn into_results(mut self) -> Result<StageResults> {
        macro_rules! take {
            ($agent:expr, $variant:ident) => {
                match self.outputs.remove(&$agent) {
                    Some(StageOutput::$variant(result)) => result,
                    _ => return Err(not_committed($agent)),
                }
            };
        }

        Ok(StageResults {
            structure: take!(AgentKind::Structure, Structure),
            behavior: take!(AgentKind::Behavior, Behavior),
            semantic: take!(AgentKind::Semantic, Semantic),
            risk: take!(AgentKind::Risk, Risk),
            execution: take!(AgentKind::Execution, Execution),
            synthesis: take!(AgentKind::Synthesizer, Synthesis),
        })
    }
}

/// Everything a handler may use while executing
pub struct StageEnv<'a> {
    pub run_id: Uuid,
    pub context: &'a PipelineContext,
    pub client: &'a AgentClient,
    pub config: &'a PipelineConfig,
    pub pool: &'a BoundedPool,
    pub progress: ProgressReporter<'a>,
}

/// Stage handler trait (one per agent)
#[async_trait]
pub trait StageHandler: Send + Sync {
    fn agent(&self) -> AgentKind;

    /// Agents whose output must be committed before this one starts
    fn dependencies(&self) -> Vec<AgentKind> {
        vec![]
    }

    async fn execute(&self, env: &StageEnv<'_>) -> Result<StageOutput>;
}

/// Longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> PipelineContext {
        let file = FileUnit::new("a.ts", "const a = 1;", "ts");
        let chunk = Chunk::full_file(&file);
        PipelineContext::new(Uuid::new_v4(), vec![file], vec![chunk])
    }

    #[test]
    fn test_getter_before_commit_is_missing_dependency() {
        let ctx = context();
        let err = ctx.structure().unwrap_err();
        assert!(matches!(err, OrchestratorError::MissingDependency(_)));
        assert!(!ctx.is_committed(AgentKind::Structure));
    }

    #[test]
    fn test_commit_once() {
        let mut ctx = context();
        ctx.commit(StageOutput::Structure(StructureResult::default()))
            .unwrap();
        assert!(ctx.structure().is_ok());
        assert_eq!(ctx.committed(), vec![AgentKind::Structure]);

        let err = ctx
            .commit(StageOutput::Structure(StructureResult::default()))
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_into_results_requires_all_outputs() {
        let mut ctx = context();
        ctx.commit(StageOutput::Structure(StructureResult::default()))
            .unwrap();
        ctx.commit(StageOutput::Risk(RiskResult::default())).unwrap();
        assert!(ctx.into_results().is_err());

        let mut ctx = context();
        for output in [
            StageOutput::Structure(StructureResult::default()),
            StageOutput::Behavior(BehaviorResult::default()),
            StageOutput::Semantic(SemanticResult::default()),
            StageOutput::Risk(RiskResult::default()),
            StageOutput::Execution(ExecutionResult::default()),
            StageOutput::Synthesis(SynthesisResult::default()),
        ] {
            ctx.commit(output).unwrap();
        }
        assert!(ctx.into_results().is_ok());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 0), "");
    }
}
