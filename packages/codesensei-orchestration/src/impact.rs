//! Change-impact prediction
//!
//! Runs after a completed analysis: given a proposed change, the Impact
//! agent predicts affected files, tests likely to break and an overall
//! severity. Not part of the six-stage run, so errors are returned as-is.

use crate::agent::contract::{self, lenient_f64, string_or_list, ResponseContract};
use crate::agent::{prompts, AgentClient, AgentKind};
use crate::config::ContextLimits;
use crate::error::{OrchestratorError, Result};
use crate::merge::{CanonicalAnalysis, Severity};
use crate::types::Chunk;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffectedFile {
    pub file: String,
    pub why: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub confidence: f64,
}

/// Raw Impact agent response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
struct ImpactResponse {
    change: String,
    affected: Vec<AffectedFile>,
    #[serde(deserialize_with = "string_or_list")]
    tests_likely_to_break: Vec<String>,
    severity_estimate: String,
    #[serde(deserialize_with = "string_or_list")]
    recommended_mitigations: Vec<String>,
}

impl ResponseContract for ImpactResponse {
    const NAME: &'static str = "ImpactPrediction";

    fn schema() -> Value {
        use contract::*;
        object(&[
            ("change", string()),
            (
                "affected",
                array_of(object(&[
                    ("file", string()),
                    ("why", string()),
                    ("confidence", number()),
                ])),
            ),
            ("tests_likely_to_break", string_array()),
            (
                "severity_estimate",
                string_enum(&["critical", "high", "medium", "low"]),
            ),
            ("recommended_mitigations", string_array()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactPrediction {
    pub change: String,
    pub affected: Vec<AffectedFile>,
    pub tests_likely_to_break: Vec<String>,
    pub severity_estimate: Severity,
    pub recommended_mitigations: Vec<String>,
}

pub struct ImpactAnalyzer {
    client: AgentClient,
    limits: ContextLimits,
}

impl ImpactAnalyzer {
    pub fn new(client: AgentClient, limits: ContextLimits) -> Self {
        Self { client, limits }
    }

    pub async fn predict(
        &self,
        change: &str,
        analysis: &CanonicalAnalysis,
        chunks: &[Chunk],
    ) -> Result<ImpactPrediction> {
        if change.trim().is_empty() {
            return Err(OrchestratorError::config("Proposed change must not be empty"));
        }

        let context = build_context(change, analysis, chunks, self.limits.impact_chunk_limit);
        let response: ImpactResponse = self
            .client
            .invoke(
                AgentKind::Impact,
                prompts::system_prompt(AgentKind::Impact),
                context,
            )
            .await?;

        let prediction = ImpactPrediction {
            change: if response.change.is_empty() {
                change.to_string()
            } else {
                response.change
            },
            affected: response.affected,
            tests_likely_to_break: response.tests_likely_to_break,
            severity_estimate: Severity::parse_lenient(&response.severity_estimate),
            recommended_mitigations: response.recommended_mitigations,
        };

        info!(
            "Impact: {} affected files, severity {}",
            prediction.affected.len(),
            prediction.severity_estimate
        );
        Ok(prediction)
    }
}

fn build_context(change: &str, analysis: &CanonicalAnalysis, chunks: &[Chunk], limit: usize) -> String {
    let code = chunks
        .iter()
        .take(limit)
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "CURRENT ARCHITECTURE: {}\nPROPOSED CHANGE: {}\nCODE CONTEXT:\n{}",
        analysis.architecture_narrative, change, code
    )
}
