//! Pipeline configuration
//!
//! Every size/count limit used while building agent contexts lives here as a
//! named field with a documented default. A `PipelineConfig` is constructed
//! once by the host and handed to `AnalysisOrchestrator::new`.

use crate::agent::AgentKind;
use crate::error::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub chunker: ChunkerConfig,
    pub pool: PoolConfig,
    pub context: ContextLimits,
    pub mapping: MappingConfig,
    pub agents: AgentSettings,
}

/// Chunker heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Files with more lines than this are scanned for blocks
    pub block_split_threshold_lines: usize,

    /// Language tags eligible for block splitting (compared case-insensitively)
    pub block_split_languages: Vec<String>,

    /// Leading keywords that open a top-level block
    pub block_start_keywords: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            block_split_threshold_lines: 50,
            block_split_languages: ["ts", "tsx", "js", "jsx", "typescript", "javascript"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            block_start_keywords: ["export", "function", "class", "const"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Bounded Task Pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum simultaneous per-chunk agent calls (rate-limit guard)
    pub concurrency: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { concurrency: 3 }
    }
}

/// Limits applied while building agent contexts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextLimits {
    /// Characters kept per file in the Structure context
    pub structure_file_chars: usize,
    pub behavior_chunk_limit: usize,
    pub semantic_chunk_limit: usize,
    /// `None` sends every chunk
    pub risk_chunk_limit: Option<usize>,
    pub execution_chunk_limit: usize,
    pub impact_chunk_limit: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            structure_file_chars: 2000,
            behavior_chunk_limit: 15,
            semantic_chunk_limit: 15,
            risk_chunk_limit: None,
            execution_chunk_limit: 10,
            impact_chunk_limit: 10,
        }
    }
}

/// Per-file mapping sub-stage of Structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub enabled: bool,
    /// Files larger than this are skipped
    pub max_file_bytes: usize,
    /// Characters of file content sent per mapping call
    pub file_chars: usize,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_file_bytes: 100_000,
            file_chars: 8000,
        }
    }
}

/// Settings forwarded to the agent backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Model hint; the backend decides how to interpret it
    pub model: String,
    /// Upper bound for a single backend call
    pub request_timeout_ms: u64,
    pub temperatures: AgentTemperatures,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gemini-3-pro-preview".to_string(),
            request_timeout_ms: 300_000,
            temperatures: AgentTemperatures::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTemperatures {
    pub structure: f32,
    pub behavior: f32,
    pub semantic: f32,
    pub risk: f32,
    pub execution: f32,
    pub synthesizer: f32,
    pub impact: f32,
    pub file_mapper: f32,
}

impl Default for AgentTemperatures {
    fn default() -> Self {
        Self {
            structure: 0.1,
            behavior: 0.2,
            semantic: 0.3,
            risk: 0.2,
            execution: 0.0,
            synthesizer: 0.0,
            impact: 0.2,
            file_mapper: 0.1,
        }
    }
}

impl AgentTemperatures {
    pub fn for_agent(&self, agent: AgentKind) -> f32 {
        match agent {
            AgentKind::Structure => self.structure,
            AgentKind::Behavior => self.behavior,
            AgentKind::Semantic => self.semantic,
            AgentKind::Risk => self.risk,
            AgentKind::Execution => self.execution,
            AgentKind::Synthesizer => self.synthesizer,
            AgentKind::Impact => self.impact,
            AgentKind::FileMapper => self.file_mapper,
        }
    }

    fn entries(&self) -> [(&'static str, f32); 8] {
        [
            ("structure", self.structure),
            ("behavior", self.behavior),
            ("semantic", self.semantic),
            ("risk", self.risk),
            ("execution", self.execution),
            ("synthesizer", self.synthesizer),
            ("impact", self.impact),
            ("file_mapper", self.file_mapper),
        ]
    }
}

fn range_error(field: &str, value: impl ToString, min: impl ToString, max: impl ToString) -> OrchestratorError {
    OrchestratorError::Config(format!(
        "Invalid range for field '{}': {} not in {}..={}",
        field,
        value.to_string(),
        min.to_string(),
        max.to_string()
    ))
}

fn require_positive(field: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(range_error(field, value, 1, usize::MAX));
    }
    Ok(())
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        require_positive(
            "chunker.block_split_threshold_lines",
            self.chunker.block_split_threshold_lines,
        )?;
        if !self.chunker.block_split_languages.is_empty()
            && self
                .chunker
                .block_start_keywords
                .iter()
                .all(|k| k.trim().is_empty())
        {
            return Err(OrchestratorError::Config(
                "chunker.block_start_keywords must not be empty when block splitting languages are configured"
                    .to_string(),
            ));
        }

        require_positive("pool.concurrency", self.pool.concurrency)?;

        let limits = &self.context;
        require_positive("context.structure_file_chars", limits.structure_file_chars)?;
        require_positive("context.behavior_chunk_limit", limits.behavior_chunk_limit)?;
        require_positive("context.semantic_chunk_limit", limits.semantic_chunk_limit)?;
        require_positive("context.execution_chunk_limit", limits.execution_chunk_limit)?;
        require_positive("context.impact_chunk_limit", limits.impact_chunk_limit)?;
        if let Some(limit) = limits.risk_chunk_limit {
            require_positive("context.risk_chunk_limit", limit)?;
        }

        require_positive("mapping.max_file_bytes", self.mapping.max_file_bytes)?;
        require_positive("mapping.file_chars", self.mapping.file_chars)?;

        if self.agents.request_timeout_ms == 0 {
            return Err(range_error("agents.request_timeout_ms", 0, 1, u64::MAX));
        }
        for (name, value) in self.agents.temperatures.entries() {
            if !(0.0..=2.0).contains(&value) {
                return Err(range_error(
                    &format!("agents.temperatures.{}", name),
                    value,
                    0.0,
                    2.0,
                ));
            }
        }

        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_yaml::from_str(yaml).map_err(OrchestratorError::config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(OrchestratorError::serialization)
    }
}
