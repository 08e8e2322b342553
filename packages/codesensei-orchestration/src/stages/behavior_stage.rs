use super::join_sections;
use crate::agent::contract::{self, ResponseContract};
use crate::agent::{prompts, AgentKind};
use crate::error::Result;
use crate::pipeline::{StageEnv, StageHandler, StageOutput};
use crate::types::Chunk;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorResult {
    pub call_graph: Vec<CallEdge>,
    pub side_effects: Vec<SideEffect>,
    pub global_state: Vec<GlobalState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideEffect {
    pub location: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalState {
    pub name: String,
    pub defined_in: String,
    pub mutated_in: Vec<String>,
}

impl ResponseContract for BehaviorResult {
    const NAME: &'static str = "BehaviorResult";

    fn schema() -> Value {
        use contract::*;
        object(&[
            (
                "call_graph",
                array_of(object(&[("from", string()), ("to", string()), ("type", string())])),
            ),
            (
                "side_effects",
                array_of(object(&[
                    ("location", string()),
                    ("type", string()),
                    ("description", string()),
                ])),
            ),
            (
                "global_state",
                array_of(object(&[
                    ("name", string()),
                    ("defined_in", string()),
                    ("mutated_in", string_array()),
                ])),
            ),
        ])
    }
}

/// First `limit` chunks as `Block: <id>` sections.
pub fn build_context(chunks: &[Chunk], limit: usize) -> String {
    join_sections(
        chunks
            .iter()
            .take(limit)
            .map(|c| format!("Block: {}\n{}", c.id, c.content)),
    )
}

pub struct BehaviorStage;

#[async_trait]
impl StageHandler for BehaviorStage {
    fn agent(&self) -> AgentKind {
        AgentKind::Behavior
    }

    fn dependencies(&self) -> Vec<AgentKind> {
        vec![AgentKind::Structure]
    }

    async fn execute(&self, env: &StageEnv<'_>) -> Result<StageOutput> {
        let context = build_context(env.context.chunks(), env.config.context.behavior_chunk_limit);
        let result: BehaviorResult = env
            .client
            .invoke(
                AgentKind::Behavior,
                prompts::system_prompt(AgentKind::Behavior),
                context,
            )
            .await?;

        info!(
            "[{}] Behavior: {} call edges, {} side effects",
            env.run_id,
            result.call_graph.len(),
            result.side_effects.len()
        );
        Ok(StageOutput::Behavior(result))
    }
}
