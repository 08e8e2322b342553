use super::join_sections;
use crate::agent::contract::{self, string_or_list, ResponseContract};
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
pub struct SemanticResult {
    pub apis: Vec<ApiEntry>,
    pub invariants: Vec<Invariant>,
    pub patterns: Vec<PatternEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEntry {
    pub name: String,
    pub purpose: String,
    pub inputs: String,
    pub outputs: String,
    pub contracts: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Invariant {
    pub description: String,
    #[serde(deserialize_with = "string_or_list")]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternEntry {
    pub pattern: String,
    pub evidence: String,
}

impl ResponseContract for SemanticResult {
    const NAME: &'static str = "SemanticResult";

    fn schema() -> Value {
        use contract::*;
        object(&[
            (
                "apis",
                array_of(object(&[
                    ("name", string()),
                    ("purpose", string()),
                    ("inputs", string()),
                    ("outputs", string()),
                    ("contracts", string()),
                ])),
            ),
            (
                "invariants",
                array_of(object(&[
                    ("description", string()),
                    ("evidence", string_array()),
                ])),
            ),
            (
                "patterns",
                array_of(object(&[("pattern", string()), ("evidence", string())])),
            ),
        ])
    }
}

/// First `limit` chunks as `Chunk: <id>` sections.
pub fn build_context(chunks: &[Chunk], limit: usize) -> String {
    join_sections(
        chunks
            .iter()
            .take(limit)
            .map(|c| format!("Chunk: {}\n{}", c.id, c.content)),
    )
}

pub struct SemanticStage;

#[async_trait]
impl StageHandler for SemanticStage {
    fn agent(&self) -> AgentKind {
        AgentKind::Semantic
    }

    fn dependencies(&self) -> Vec<AgentKind> {
        vec![AgentKind::Structure]
    }

    async fn execute(&self, env: &StageEnv<'_>) -> Result<StageOutput> {
        let context = build_context(env.context.chunks(), env.config.context.semantic_chunk_limit);
        let result: SemanticResult = env
            .client
            .invoke(
                AgentKind::Semantic,
                prompts::system_prompt(AgentKind::Semantic),
                context,
            )
            .await?;

        info!(
            "[{}] Semantic: {} apis, {} invariants, {} patterns",
            env.run_id,
            result.apis.len(),
            result.invariants.len(),
            result.patterns.len()
        );
        Ok(StageOutput::Semantic(result))
    }
}
