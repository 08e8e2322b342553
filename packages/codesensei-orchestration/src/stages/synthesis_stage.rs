//! Synthesis stage
//!
//! The context is a digest of every prior stage, never raw chunk content:
//! the full structure result, the call graph, the API list, risk ids with
//! severities, and step descriptions.

use crate::agent::contract::{self, lenient_f64, ResponseContract};
use crate::agent::{prompts, AgentKind};
use crate::error::{OrchestratorError, Result};
use crate::pipeline::{PipelineContext, StageEnv, StageHandler, StageOutput};
use crate::stages::{ApiEntry, CallEdge, StructureResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisResult {
    pub summary: String,
    pub architecture: String,
    #[serde(rename = "techStack")]
    pub tech_stack: Vec<String>,
    #[serde(rename = "graphData")]
    pub graph_data: GraphDraft,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphDraft {
    pub nodes: Vec<NodeDraft>,
    pub links: Vec<LinkDraft>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDraft {
    pub id: String,
    pub group: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub val: f64,
    pub details: String,
    /// Risk ids the synthesizer associates with this node. Not used for
    /// `CanonicalAnalysis::risks`.
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkDraft {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseContract for SynthesisResult {
    const NAME: &'static str = "SynthesisResult";

    fn schema() -> Value {
        use contract::*;
        object(&[
            ("summary", string()),
            ("architecture", string()),
            ("techStack", string_array()),
            (
                "graphData",
                object(&[
                    (
                        "nodes",
                        array_of(object(&[
                            ("id", string()),
                            ("group", string_enum(&["file", "module", "external"])),
                            ("val", number()),
                            ("details", string()),
                            ("risks", string_array()),
                        ])),
                    ),
                    (
                        "links",
                        array_of(object(&[
                            ("source", string()),
                            ("target", string()),
                            ("type", string_enum(&["import", "dependency"])),
                        ])),
                    ),
                ]),
            ),
        ])
    }
}

#[derive(Debug, Serialize)]
struct RiskDigest<'a> {
    id: &'a str,
    title: &'a str,
    severity: &'a str,
}

#[derive(Debug, Serialize)]
struct SynthesisDigest<'a> {
    structure: &'a StructureResult,
    behavior_summary: &'a [CallEdge],
    semantic_summary: &'a [ApiEntry],
    risk_summary: Vec<RiskDigest<'a>>,
    execution_summary: Vec<&'a str>,
}

/// Pretty JSON digest of Structure, Behavior, Semantic, Risk and Execution.
pub fn build_context(context: &PipelineContext) -> Result<String> {
    let risk = context.risk()?;
    let execution = context.execution()?;

    let digest = SynthesisDigest {
        structure: context.structure()?,
        behavior_summary: &context.behavior()?.call_graph,
        semantic_summary: &context.semantic()?.apis,
        risk_summary: risk
            .risks
            .iter()
            .map(|r| RiskDigest {
                id: &r.id,
                title: &r.id,
                severity: &r.severity,
            })
            .collect(),
        execution_summary: execution.steps.iter().map(|s| s.desc.as_str()).collect(),
    };

    serde_json::to_string_pretty(&digest).map_err(OrchestratorError::serialization)
}

pub struct SynthesisStage;

#[async_trait]
impl StageHandler for SynthesisStage {
    fn agent(&self) -> AgentKind {
        AgentKind::Synthesizer
    }

    fn dependencies(&self) -> Vec<AgentKind> {
        vec![
            AgentKind::Structure,
            AgentKind::Behavior,
            AgentKind::Semantic,
            AgentKind::Risk,
            AgentKind::Execution,
        ]
    }

    async fn execute(&self, env: &StageEnv<'_>) -> Result<StageOutput> {
        let context = build_context(env.context)?;
        let result: SynthesisResult = env
            .client
            .invoke(
                AgentKind::Synthesizer,
                prompts::system_prompt(AgentKind::Synthesizer),
                context,
            )
            .await?;

        info!(
            "[{}] Synthesizer: {} graph nodes, {} links",
            env.run_id,
            result.graph_data.nodes.len(),
            result.graph_data.links.len()
        );
        Ok(StageOutput::Synthesis(result))
    }
}
