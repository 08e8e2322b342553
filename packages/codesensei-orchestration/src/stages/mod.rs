//! One `StageHandler` per pipeline agent

pub mod behavior_stage;
pub mod execution_stage;
pub mod risk_stage;
pub mod semantic_stage;
pub mod structure_stage;
pub mod synthesis_stage;

pub use behavior_stage::{BehaviorResult, BehaviorStage, CallEdge, GlobalState, SideEffect};
pub use execution_stage::{ExecutionResult, ExecutionStage, StepDraft, VisualFrame};
pub use risk_stage::{RiskFinding, RiskResult, RiskStage};
pub use semantic_stage::{ApiEntry, Invariant, PatternEntry, SemanticResult, SemanticStage};
pub use structure_stage::{FileEntry, FileSummary, ModuleEntry, StructureResult, StructureStage};
pub use synthesis_stage::{GraphDraft, LinkDraft, NodeDraft, SynthesisResult, SynthesisStage};

use crate::pipeline::StageHandler;
use std::sync::Arc;

/// Handlers for the six pipeline agents
pub fn default_handlers() -> Vec<Arc<dyn StageHandler>> {
    vec![
        Arc::new(StructureStage),
        Arc::new(BehaviorStage),
        Arc::new(SemanticStage),
        Arc::new(RiskStage),
        Arc::new(ExecutionStage),
        Arc::new(SynthesisStage),
    ]
}

/// Join context sections with a `---` separator line.
pub(crate) fn join_sections(sections: impl Iterator<Item = String>) -> String {
    sections.collect::<Vec<_>>().join("\n---\n")
}
