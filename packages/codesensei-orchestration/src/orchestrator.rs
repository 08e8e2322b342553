//! Run driver
//!
//! Chunks the input, walks the DAG phase by phase (agents of one phase run
//! concurrently, the first failure aborts the run) and merges the committed
//! outputs into a `CanonicalAnalysis`.

use crate::agent::{AgentBackend, AgentClient, AgentKind};
use crate::chunker::Chunker;
use crate::config::PipelineConfig;
use crate::dag::PipelineDAG;
use crate::error::{OrchestratorError, Result};
use crate::impact::ImpactAnalyzer;
use crate::job::{PipelineStage, RunStateMachine};
use crate::merge::{merge, CanonicalAnalysis, ReferenceIndex};
use crate::pipeline::{PipelineContext, StageEnv, StageHandler, StageOutput};
use crate::pool::BoundedPool;
use crate::progress::{NoopSink, ProgressReporter, ProgressSink};
use crate::stages;
use crate::types::FileUnit;
use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// Stage orchestrator
///
/// Owns configuration, the agent client and the registered stage handlers.
/// Every call to [`run`](Self::run) gets its own `PipelineContext`, so one
/// orchestrator can serve concurrent runs.
pub struct AnalysisOrchestrator {
    config: PipelineConfig,
    client: AgentClient,
    chunker: Chunker,
    pool: BoundedPool,
    handlers: HashMap<AgentKind, Arc<dyn StageHandler>>,
}

impl AnalysisOrchestrator {
    /// Create an orchestrator with the six default stage handlers
    pub fn new(config: PipelineConfig, backend: Arc<dyn AgentBackend>) -> Result<Self> {
        config.validate()?;

        let mut orchestrator = Self {
            client: AgentClient::new(backend, config.agents.clone()),
            chunker: Chunker::new(config.chunker.clone()),
            pool: BoundedPool::new(config.pool.concurrency)?,
            handlers: HashMap::new(),
            config,
        };
        for handler in stages::default_handlers() {
            orchestrator.register_handler(handler);
        }
        Ok(orchestrator)
    }

    /// Register a stage handler, replacing any handler for the same agent
    pub fn register_handler(&mut self, handler: Arc<dyn StageHandler>) {
        self.handlers.insert(handler.agent(), handler);
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    pub fn impact_analyzer(&self) -> ImpactAnalyzer {
        ImpactAnalyzer::new(self.client.clone(), self.config.context.clone())
    }

    fn build_dag(&self) -> Result<PipelineDAG> {
        let handlers: Vec<Arc<dyn StageHandler>> = self.handlers.values().cloned().collect();
        PipelineDAG::from_handlers(&handlers)
    }

    /// Printable phase plan of the registered handlers
    pub fn execution_plan(&self) -> Result<String> {
        Ok(self.build_dag()?.execution_plan())
    }

    /// Run without progress reporting
    pub async fn analyze(&self, files: Vec<FileUnit>) -> Result<CanonicalAnalysis> {
        self.run(files, &NoopSink).await
    }

    /// Execute one analysis run (main entry point)
    ///
    /// Returns the merged analysis, or a `PipelineAbort` naming the stage that
    /// failed. No partial result is ever returned.
    pub async fn run(&self, files: Vec<FileUnit>, sink: &dyn ProgressSink) -> Result<CanonicalAnalysis> {
        let run_id = Uuid::new_v4();
        let progress = ProgressReporter::new(sink);
        let mut machine = RunStateMachine::new(run_id);

        info!("[{}] Starting analysis of {} files", run_id, files.len());
        let _ = progress.stage(PipelineStage::Init);

        match self.run_stages(&mut machine, files, progress).await {
            Ok(analysis) => {
                info!(
                    "[{}] Analysis {} - {} graph nodes, {} risks, {} steps",
                    run_id,
                    machine.state().summary(),
                    analysis.dependency_graph.nodes.len(),
                    analysis.risks.len(),
                    analysis.execution_flow.len()
                );
                Ok(analysis)
            }
            Err(e) => {
                let abort = OrchestratorError::abort(machine.stage(), e);
                if let Err(transition) = machine.fail(&abort) {
                    error!("[{}] Could not record failure: {}", run_id, transition);
                }
                error!("[{}] Analysis {}", run_id, machine.state().summary());
                let _ = progress.stage(PipelineStage::Error);
                Err(abort)
            }
        }
    }

    async fn run_stages(
        &self,
        machine: &mut RunStateMachine,
        files: Vec<FileUnit>,
        progress: ProgressReporter<'_>,
    ) -> Result<CanonicalAnalysis> {
        let run_id = machine.run_id();
        let dag = self.build_dag()?;
        info!(
            "[{}] Execution plan ({} agents):\n{}",
            run_id,
            dag.len(),
            dag.execution_plan()
        );

        self.advance(machine, PipelineStage::Chunking, progress)?;
        validate_files(&files)?;
        let chunks = self.chunker.chunk(&files);
        info!(
            "[{}] Chunker: created {} chunks from {} files",
            run_id,
            chunks.len(),
            files.len()
        );

        let mut context = PipelineContext::new(run_id, files, chunks);

        for (phase_idx, group) in dag.execution_order().iter().enumerate() {
            let stage = PipelineDAG::phase_stage(group)?;
            self.advance(machine, stage, progress)?;

            let handlers = group
                .iter()
                .map(|agent| {
                    self.handlers.get(agent).cloned().ok_or_else(|| {
                        OrchestratorError::Config(format!("No handler registered for agent {}", agent))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            info!(
                "[{}] Phase {} ({}) - {} agents{}",
                run_id,
                phase_idx + 1,
                stage,
                handlers.len(),
                if handlers.len() > 1 { " (parallel)" } else { "" }
            );

            let outputs = {
                let env = StageEnv {
                    run_id,
                    context: &context,
                    client: &self.client,
                    config: &self.config,
                    pool: &self.pool,
                    progress,
                };
                // Join: the first failure drops the siblings
                try_join_all(handlers.iter().map(|h| execute_handler(h.as_ref(), &env))).await?
            };

            for output in outputs {
                context.commit(output)?;
            }
        }

        let index = ReferenceIndex::new(context.files(), context.chunks());
        let results = context.into_results()?;
        let analysis = merge(&results, &index);

        self.advance(machine, PipelineStage::Complete, progress)?;
        Ok(analysis)
    }

    fn advance(
        &self,
        machine: &mut RunStateMachine,
        to: PipelineStage,
        progress: ProgressReporter<'_>,
    ) -> Result<()> {
        machine.advance(to)?;
        info!("[{}] Stage -> {}", machine.run_id(), to);
        let _ = progress.stage(to);
        Ok(())
    }
}

async fn execute_handler(handler: &dyn StageHandler, env: &StageEnv<'_>) -> Result<StageOutput> {
    let agent = handler.agent();
    let start = Instant::now();
    info!("[{}] Agent {} running...", env.run_id, agent);
    let _ = env.progress.agent_started(agent);

    let output = handler.execute(env).await.map_err(|e| {
        error!("[{}] Agent {} failed: {}", env.run_id, agent, e);
        e
    })?;

    if output.agent() != agent {
        return Err(OrchestratorError::Config(format!(
            "Handler for {} produced {} output",
            agent,
            output.agent()
        )));
    }

    let _ = env.progress.agent_completed(agent);
    info!(
        "[{}] Agent {} completed in {}ms",
        env.run_id,
        agent,
        start.elapsed().as_millis()
    );
    Ok(output)
}

fn validate_files(files: &[FileUnit]) -> Result<()> {
    if files.is_empty() {
        return Err(OrchestratorError::Import("No input files".to_string()));
    }
    let mut seen = HashSet::new();
    for file in files {
        if !seen.insert(file.path.as_str()) {
            return Err(OrchestratorError::Import(format!("Duplicate file path: {}", file.path)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ScriptedBackend;
    use async_trait::async_trait;

    fn orchestrator() -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(PipelineConfig::default(), Arc::new(ScriptedBackend::new())).unwrap()
    }

    #[test]
    fn test_default_plan() {
        let plan = orchestrator().execution_plan().unwrap();
        assert_eq!(
            plan,
            "Phase 1: Structure\n\
             Phase 2: Behavior ∥ Semantic ∥ Risk (parallel)\n\
             Phase 3: Execution\n\
             Phase 4: Synthesizer"
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PipelineConfig::default();
        config.pool.concurrency = 0;
        assert!(AnalysisOrchestrator::new(config, Arc::new(ScriptedBackend::new())).is_err());
    }

    #[tokio::test]
    async fn test_empty_input_aborts_at_chunking() {
        let err = orchestrator().analyze(vec![]).await.unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Chunking));
        assert!(matches!(err.root_cause(), OrchestratorError::Import(_)));
    }

    #[tokio::test]
    async fn test_duplicate_paths_rejected() {
        let files = vec![
            FileUnit::new("a.ts", "1", "ts"),
            FileUnit::new("a.ts", "2", "ts"),
        ];
        let err = orchestrator().analyze(files).await.unwrap_err();
        assert!(err.to_string().contains("Duplicate file path"));
    }

    struct LoopStage(AgentKind, AgentKind);

    #[async_trait]
    impl StageHandler for LoopStage {
        fn agent(&self) -> AgentKind {
            self.0
        }

        fn dependencies(&self) -> Vec<AgentKind> {
            vec![self.1]
        }

        async fn execute(&self, _env: &StageEnv<'_>) -> Result<StageOutput> {
            Err(OrchestratorError::Config("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_cyclic_handlers_abort_at_init() {
        let mut orchestrator = orchestrator();
        orchestrator.register_handler(Arc::new(LoopStage(AgentKind::Structure, AgentKind::Synthesizer)));

        assert!(orchestrator.execution_plan().is_err());
        let err = orchestrator
            .analyze(vec![FileUnit::new("a.ts", "1", "ts")])
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Init));
        assert!(matches!(err.root_cause(), OrchestratorError::DagCycleDetected));
    }
}
