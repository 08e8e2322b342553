use crate::error::{ErrorCategory, OrchestratorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Logical stage of one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Init,
    Chunking,
    Structure,
    ParallelReasoning,
    ExecutionSimulation,
    Synthesis,
    Complete,
    Error,
}

impl PipelineStage {
    /// Stages of a successful run, in order.
    pub const SEQUENCE: [PipelineStage; 7] = [
        PipelineStage::Init,
        PipelineStage::Chunking,
        PipelineStage::Structure,
        PipelineStage::ParallelReasoning,
        PipelineStage::ExecutionSimulation,
        PipelineStage::Synthesis,
        PipelineStage::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Init => "init",
            PipelineStage::Chunking => "chunking",
            PipelineStage::Structure => "structure",
            PipelineStage::ParallelReasoning => "parallel_reasoning",
            PipelineStage::ExecutionSimulation => "execution_simulation",
            PipelineStage::Synthesis => "synthesis",
            PipelineStage::Complete => "complete",
            PipelineStage::Error => "error",
        }
    }

    /// Successor on the happy path (`None` for terminal stages).
    pub fn next(&self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Init => Some(PipelineStage::Chunking),
            PipelineStage::Chunking => Some(PipelineStage::Structure),
            PipelineStage::Structure => Some(PipelineStage::ParallelReasoning),
            PipelineStage::ParallelReasoning => Some(PipelineStage::ExecutionSimulation),
            PipelineStage::ExecutionSimulation => Some(PipelineStage::Synthesis),
            PipelineStage::Synthesis => Some(PipelineStage::Complete),
            PipelineStage::Complete | PipelineStage::Error => None,
        }
    }
}

impl std::str::FromStr for PipelineStage {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        PipelineStage::SEQUENCE
            .iter()
            .chain(std::iter::once(&PipelineStage::Error))
            .find(|stage| stage.as_str() == s)
            .copied()
            .ok_or_else(|| OrchestratorError::parse(format!("Invalid pipeline stage: {}", s)))
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Run state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunState {
    Running {
        started_at: DateTime<Utc>,
        stage: PipelineStage,
    },
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        duration_ms: u64,
    },
    Failed {
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
        failed_stage: PipelineStage,
        error: String,
        error_category: ErrorCategory,
    },
}

impl RunState {
    pub fn state_name(&self) -> &'static str {
        match self {
            RunState::Running { .. } => "running",
            RunState::Completed { .. } => "completed",
            RunState::Failed { .. } => "failed",
        }
    }

    /// Current stage, with `Complete`/`Error` for the terminal states.
    pub fn stage(&self) -> PipelineStage {
        match self {
            RunState::Running { stage, .. } => *stage,
            RunState::Completed { .. } => PipelineStage::Complete,
            RunState::Failed { .. } => PipelineStage::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Running { .. })
    }

    /// One-line outcome for the final run log line
    pub fn summary(&self) -> String {
        match self {
            RunState::Running { stage, .. } => format!("running ({})", stage),
            RunState::Completed {
                started_at,
                duration_ms,
                ..
            } => format!(
                "completed in {}ms (started {})",
                duration_ms,
                started_at.to_rfc3339()
            ),
            RunState::Failed {
                started_at,
                failed_at,
                failed_stage,
                error,
                error_category,
            } => format!(
                "failed during {} after {}ms ({}): {}",
                failed_stage,
                (*failed_at - *started_at).num_milliseconds().max(0),
                error_category,
                error
            ),
        }
    }

    fn started_at(&self) -> DateTime<Utc> {
        match self {
            RunState::Running { started_at, .. }
            | RunState::Completed { started_at, .. }
            | RunState::Failed { started_at, .. } => *started_at,
        }
    }
}

/// State machine for one orchestrator run
///
/// `Init → Chunking → Structure → ParallelReasoning → ExecutionSimulation →
/// Synthesis → Complete`, with `Error` reachable from any non-terminal stage.
#[derive(Debug, Clone)]
pub struct RunStateMachine {
    run_id: Uuid,
    state: RunState,
}

impl RunStateMachine {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            state: RunState::Running {
                started_at: Utc::now(),
                stage: PipelineStage::Init,
            },
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn stage(&self) -> PipelineStage {
        self.state.stage()
    }

    /// Transition to the next stage of the happy path.
    pub fn advance(&mut self, to: PipelineStage) -> Result<()> {
        let current = match &self.state {
            RunState::Running { stage, .. } => *stage,
            terminal => {
                return Err(OrchestratorError::InvalidStateTransition {
                    from: terminal.state_name().to_string(),
                    to: to.to_string(),
                })
            }
        };

        if current.next() != Some(to) {
            return Err(OrchestratorError::InvalidStateTransition {
                from: current.to_string(),
                to: to.to_string(),
            });
        }

        let started_at = self.state.started_at();
        self.state = if to == PipelineStage::Complete {
            let now = Utc::now();
            RunState::Completed {
                started_at,
                completed_at: now,
                duration_ms: (now - started_at).num_milliseconds().max(0) as u64,
            }
        } else {
            RunState::Running {
                started_at,
                stage: to,
            }
        };
        Ok(())
    }

    /// Transition: any running stage → Error
    pub fn fail(&mut self, error: &OrchestratorError) -> Result<()> {
        match &self.state {
            RunState::Running { started_at, stage } => {
                self.state = RunState::Failed {
                    started_at: *started_at,
                    failed_at: Utc::now(),
                    failed_stage: error.stage().unwrap_or(*stage),
                    error: error.to_string(),
                    error_category: error.category(),
                };
                Ok(())
            }
            terminal => Err(OrchestratorError::InvalidStateTransition {
                from: terminal.state_name().to_string(),
                to: PipelineStage::Error.to_string(),
            }),
        }
    }
}
