/*
 * CodeSensei Orchestration - Multi-Agent Architecture Analysis Pipeline
 *
 * Coordinates opaque analysis agents over a chunked source tree.
 *
 * Architecture:
 * - Chunker (FullFile + heuristic Block chunks)
 * - Bounded Task Pool (per-unit sub-work, failures dropped)
 * - Agent Client (fence stripping, truncated-JSON repair, typed contracts)
 * - Stage DAG (Structure → Behavior ∥ Semantic ∥ Risk → Execution → Synthesizer)
 * - Result Merger (CanonicalAnalysis with resolved references)
 * - Progress events (stage + agent streams)
 */

// Public modules
pub mod agent;
pub mod best_effort;
pub mod chunker;
pub mod config;
pub mod dag;
pub mod error;
pub mod impact;
pub mod job;
pub mod merge;
pub mod orchestrator;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod stages;
pub mod types;

// Re-exports
pub use agent::{
    AgentBackend, AgentClient, AgentKind, AgentRequest, ResponseContract, ScriptedBackend,
    ScriptedResponse,
};
pub use best_effort::{best_effort, BestEffort};
pub use chunker::Chunker;
pub use config::{
    AgentSettings, AgentTemperatures, ChunkerConfig, ContextLimits, MappingConfig, PipelineConfig,
    PoolConfig,
};
pub use dag::{PipelineDAG, StageNode};
pub use error::{ErrorCategory, OrchestratorError, Result};
pub use impact::{AffectedFile, ImpactAnalyzer, ImpactPrediction};
pub use job::{PipelineStage, RunState, RunStateMachine};
pub use merge::{
    merge, CanonicalAnalysis, DependencyGraph, EdgeKind, ExecutionStep, GraphEdge, GraphNode,
    NodeGroup, ReferenceIndex, Risk, Severity, StageResults,
};
pub use orchestrator::AnalysisOrchestrator;
pub use pipeline::{PipelineContext, StageEnv, StageHandler, StageOutput};
pub use pool::{BoundedPool, PoolProgress};
pub use progress::{
    AgentStatus, ChannelSink, FnSink, NoopSink, ProgressEvent, ProgressReporter, ProgressSink,
    StageEvent, UnitProgress,
};
pub use types::{Chunk, ChunkKind, FileUnit};
