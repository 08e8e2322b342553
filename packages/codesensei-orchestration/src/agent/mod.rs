//! Agent boundary
//!
//! An agent is an opaque capability: system prompt + context in, JSON text
//! out. The hosting application supplies an [`AgentBackend`]; the
//! [`AgentClient`] adds fence stripping, repair, typed validation and a
//! timeout on top of it.

pub mod client;
pub mod contract;
pub mod prompts;
pub mod repair;
pub mod scripted;

pub use client::AgentClient;
pub use contract::ResponseContract;
pub use repair::{repair_truncated_json, strip_code_fences};
pub use scripted::{ScriptedBackend, ScriptedResponse};

use crate::error::OrchestratorError;
use crate::job::PipelineStage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named analysis capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentKind {
    Structure,
    Behavior,
    Semantic,
    Risk,
    Execution,
    Synthesizer,
    /// Change-impact prediction, invoked after a run
    Impact,
    /// Per-file summary used by the optional mapping sub-stage
    FileMapper,
}

impl AgentKind {
    /// The six agents of one analysis run.
    pub const PIPELINE: [AgentKind; 6] = [
        AgentKind::Structure,
        AgentKind::Behavior,
        AgentKind::Semantic,
        AgentKind::Risk,
        AgentKind::Execution,
        AgentKind::Synthesizer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Structure => "Structure",
            AgentKind::Behavior => "Behavior",
            AgentKind::Semantic => "Semantic",
            AgentKind::Risk => "Risk",
            AgentKind::Execution => "Execution",
            AgentKind::Synthesizer => "Synthesizer",
            AgentKind::Impact => "Impact",
            AgentKind::FileMapper => "FileMapper",
        }
    }

    /// Pipeline stage this agent runs in (`None` for agents outside a run).
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            AgentKind::Structure | AgentKind::FileMapper => Some(PipelineStage::Structure),
            AgentKind::Behavior | AgentKind::Semantic | AgentKind::Risk => {
                Some(PipelineStage::ParallelReasoning)
            }
            AgentKind::Execution => Some(PipelineStage::ExecutionSimulation),
            AgentKind::Synthesizer => Some(PipelineStage::Synthesis),
            AgentKind::Impact => None,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AgentKind {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentKind::PIPELINE
            .iter()
            .chain([AgentKind::Impact, AgentKind::FileMapper].iter())
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| OrchestratorError::parse(format!("Unknown agent: {}", s)))
    }
}

/// One backend call
#[derive(Debug, Clone, Serialize)]
pub struct AgentRequest {
    pub agent: AgentKind,
    /// Model hint from configuration
    pub model: String,
    pub system_prompt: String,
    pub context: String,
    /// JSON description of the expected response shape
    pub schema: serde_json::Value,
    pub temperature: f32,
    /// Output format the backend is asked for
    pub response_mime_type: &'static str,
}

impl AgentRequest {
    /// JSON-only output, requested on every call made through `AgentClient`.
    pub const RESPONSE_MIME_TYPE: &'static str = "application/json";
}

/// External analysis capability supplied by the host
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Return the raw response text (JSON, possibly fenced or truncated).
    async fn generate(&self, request: AgentRequest) -> anyhow::Result<String>;

    fn name(&self) -> &str {
        "backend"
    }
}
