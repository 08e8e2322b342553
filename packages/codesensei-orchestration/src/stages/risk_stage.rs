use super::join_sections;
use crate::agent::contract::{self, lenient_f64, string_or_list, ResponseContract};
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
pub struct RiskResult {
    pub risks: Vec<RiskFinding>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskFinding {
    pub id: String,
    /// Free text as returned; parsed into `Severity` at merge time
    pub severity: String,
    pub location: String,
    pub description: String,
    pub why: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub confidence: f64,
    #[serde(deserialize_with = "string_or_list")]
    pub mitigation: Vec<String>,
}

impl ResponseContract for RiskResult {
    const NAME: &'static str = "RiskResult";

    fn schema() -> Value {
        use contract::*;
        object(&[(
            "risks",
            array_of(object(&[
                ("id", string()),
                ("severity", string_enum(&["low", "medium", "high", "critical"])),
                ("location", string()),
                ("description", string()),
                ("why", string()),
                ("confidence", number()),
                ("mitigation", string_array()),
            ])),
        )])
    }
}

/// Chunks as `File: <path>` sections; `None` sends every chunk.
pub fn build_context(chunks: &[Chunk], limit: Option<usize>) -> String {
    join_sections(
        chunks
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|c| format!("File: {}\n{}", c.file_ref, c.content)),
    )
}

pub struct RiskStage;

#[async_trait]
impl StageHandler for RiskStage {
    fn agent(&self) -> AgentKind {
        AgentKind::Risk
    }

    fn dependencies(&self) -> Vec<AgentKind> {
        vec![AgentKind::Structure]
    }

    async fn execute(&self, env: &StageEnv<'_>) -> Result<StageOutput> {
        let context = build_context(env.context.chunks(), env.config.context.risk_chunk_limit);
        let result: RiskResult = env
            .client
            .invoke(
                AgentKind::Risk,
                prompts::system_prompt(AgentKind::Risk),
                context,
            )
            .await?;

        info!("[{}] Risk: {} findings", env.run_id, result.risks.len());
        Ok(StageOutput::Risk(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileUnit;

    #[test]
    fn test_context_sends_all_chunks_by_default() {
        let chunks: Vec<Chunk> = (0..20)
            .map(|i| Chunk::full_file(&FileUnit::new(format!("f{}.ts", i), "x", "ts")))
            .collect();

        assert_eq!(build_context(&chunks, None).matches("File: ").count(), 20);
        assert_eq!(build_context(&chunks, Some(5)).matches("File: ").count(), 5);
    }

    #[test]
    fn test_lenient_finding() {
        let result: RiskResult = serde_json::from_str(
            r#"{"risks":[{"id":"R1","severity":"HIGH","confidence":"0.8","mitigation":"sanitize input"}]}"#,
        )
        .unwrap();
        let risk = &result.risks[0];
        assert_eq!(risk.confidence, 0.8);
        assert_eq!(risk.mitigation, vec!["sanitize input"]);
        assert_eq!(risk.severity, "HIGH");
    }
}
