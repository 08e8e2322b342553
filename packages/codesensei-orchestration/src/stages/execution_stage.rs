use crate::agent::contract::{self, lenient_u64, string_or_list, ResponseContract};
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
pub struct ExecutionResult {
    pub steps: Vec<StepDraft>,
    pub visual_script: Vec<VisualFrame>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepDraft {
    #[serde(deserialize_with = "lenient_u64")]
    pub step: u64,
    pub desc: String,
    #[serde(deserialize_with = "string_or_list")]
    pub files: Vec<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub approx_time_ms: u64,
    pub location: String,
    pub action: String,
    #[serde(rename = "stateChanges")]
    pub state_changes: String,
    pub narrative: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualFrame {
    pub frame: String,
    pub highlights: Vec<String>,
}

impl ResponseContract for ExecutionResult {
    const NAME: &'static str = "ExecutionResult";

    fn schema() -> Value {
        use contract::*;
        object(&[
            (
                "steps",
                array_of(object(&[
                    ("step", number()),
                    ("desc", string()),
                    ("files", string_array()),
                    ("approx_time_ms", number()),
                    ("location", string()),
                    ("action", string()),
                    ("stateChanges", string()),
                    ("narrative", string()),
                ])),
            ),
            (
                "visual_script",
                array_of(object(&[("frame", string()), ("highlights", string_array())])),
            ),
        ])
    }
}

/// Structure summary line followed by the first `limit` chunk bodies.
pub fn build_context(structure_summary: &str, chunks: &[Chunk], limit: usize) -> String {
    let code = chunks
        .iter()
        .take(limit)
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    format!("STRUCTURE SUMMARY: {}\nCODE CONTEXT:\n{}", structure_summary, code)
}

pub struct ExecutionStage;

#[async_trait]
impl StageHandler for ExecutionStage {
    fn agent(&self) -> AgentKind {
        AgentKind::Execution
    }

    /// Structure is read; the reasoning agents only order the phases.
    fn dependencies(&self) -> Vec<AgentKind> {
        vec![
            AgentKind::Structure,
            AgentKind::Behavior,
            AgentKind::Semantic,
            AgentKind::Risk,
        ]
    }

    async fn execute(&self, env: &StageEnv<'_>) -> Result<StageOutput> {
        let structure = env.context.structure()?;
        let context = build_context(
            &structure.module_summary(),
            env.context.chunks(),
            env.config.context.execution_chunk_limit,
        );

        let result: ExecutionResult = env
            .client
            .invoke(
                AgentKind::Execution,
                prompts::system_prompt(AgentKind::Execution),
                context,
            )
            .await?;

        info!("[{}] Execution: {} steps", env.run_id, result.steps.len());
        Ok(StageOutput::Execution(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileUnit;

    #[test]
    fn test_context_shape() {
        let chunks = vec![
            Chunk::full_file(&FileUnit::new("a.ts", "let a;", "ts")),
            Chunk::full_file(&FileUnit::new("b.ts", "let b;", "ts")),
        ];
        let context = build_context("api, storage", &chunks, 1);
        assert_eq!(context, "STRUCTURE SUMMARY: api, storage\nCODE CONTEXT:\nlet a;");
    }

    #[test]
    fn test_step_numbers_lenient() {
        let result: ExecutionResult = serde_json::from_str(
            r#"{"steps":[{"step":"2","approx_time_ms":12.5,"stateChanges":"cache warmed","files":["a.ts"]}]}"#,
        )
        .unwrap();
        let step = &result.steps[0];
        assert_eq!(step.step, 2);
        assert_eq!(step.approx_time_ms, 12);
        assert_eq!(step.state_changes, "cache warmed");
    }
}
