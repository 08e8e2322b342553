//! Structure stage
//!
//! Single call over the heads of every `FullFile` chunk. When mapping is
//! enabled, each file is first summarized by the FileMapper agent through
//! the bounded pool and the surviving summaries are appended to the context.

use crate::agent::contract::{self, lenient_f64, lenient_u64, ResponseContract};
use crate::agent::{prompts, AgentKind};
use crate::config::{ContextLimits, MappingConfig};
use crate::error::{OrchestratorError, Result};
use crate::job::PipelineStage;
use crate::pipeline::{truncate_chars, StageEnv, StageHandler, StageOutput};
use crate::types::{Chunk, FileUnit};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureResult {
    pub files: Vec<FileEntry>,
    pub modules: Vec<ModuleEntry>,
    pub entrypoints: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEntry {
    pub path: String,
    pub language: String,
    pub summary: String,
    pub exports: Vec<String>,
    pub imports: Vec<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub size_lines: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleEntry {
    pub name: String,
    pub files: Vec<String>,
    pub responsibility: String,
}

impl StructureResult {
    /// Module names joined with ", " (the summary Execution builds on).
    pub fn module_summary(&self) -> String {
        self.modules
            .iter()
            .map(|m| m.name.as_str())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl ResponseContract for StructureResult {
    const NAME: &'static str = "StructureResult";

    fn schema() -> Value {
        use contract::*;
        object(&[
            (
                "files",
                array_of(object(&[
                    ("path", string()),
                    ("language", string()),
                    ("summary", string()),
                    ("exports", string_array()),
                    ("imports", string_array()),
                    ("size_lines", number()),
                ])),
            ),
            (
                "modules",
                array_of(object(&[
                    ("name", string()),
                    ("files", string_array()),
                    ("responsibility", string()),
                ])),
            ),
            ("entrypoints", string_array()),
        ])
    }
}

/// Per-file summary produced by the mapping sub-stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSummary {
    pub path: String,
    pub purpose: String,
    pub exports: Vec<String>,
    pub imports: Vec<String>,
    pub dependencies: Vec<String>,
    /// 1-10
    #[serde(deserialize_with = "lenient_f64")]
    pub complexity_score: f64,
}

impl ResponseContract for FileSummary {
    const NAME: &'static str = "FileSummary";

    fn schema() -> Value {
        use contract::*;
        object(&[
            ("path", string()),
            ("purpose", string()),
            ("exports", string_array()),
            ("imports", string_array()),
            ("dependencies", string_array()),
            ("complexity_score", number()),
        ])
    }
}

/// `File: <path>` + head of every `FullFile` chunk, separated by `---`.
pub fn build_context(chunks: &[Chunk], limits: &ContextLimits) -> String {
    chunks
        .iter()
        .filter(|c| c.is_full_file())
        .map(|c| {
            let head = truncate_chars(&c.content, limits.structure_file_chars);
            let ellipsis = if head.len() < c.content.len() { "..." } else { "" };
            format!("File: {}\n{}{}", c.file_ref, head, ellipsis)
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

fn mapping_context(file: &FileUnit, mapping: &MappingConfig) -> String {
    format!(
        "File: {}\nLanguage: {}\n\n{}",
        file.path,
        file.language,
        truncate_chars(&file.content, mapping.file_chars)
    )
}

fn with_summaries(context: String, summaries: &[FileSummary]) -> Result<String> {
    if summaries.is_empty() {
        return Ok(context);
    }
    let json = serde_json::to_string_pretty(summaries).map_err(OrchestratorError::serialization)?;
    Ok(format!("{}\n---\nFILE SUMMARIES:\n{}", context, json))
}

pub struct StructureStage;

impl StructureStage {
    async fn map_files(&self, env: &StageEnv<'_>) -> Vec<FileSummary> {
        let mapping = &env.config.mapping;
        let targets: Vec<&FileUnit> = env
            .context
            .files()
            .iter()
            .filter(|f| {
                let fits = f.size <= mapping.max_file_bytes;
                if !fits {
                    debug!(
                        "[{}] Structure: skipping {} for mapping ({} bytes)",
                        env.run_id, f.path, f.size
                    );
                }
                fits
            })
            .collect();
        let labels: Vec<&str> = targets.iter().map(|f| f.path.as_str()).collect();
        debug!(
            "[{}] Structure: mapping {} files, {} at a time",
            env.run_id,
            targets.len(),
            env.pool.limit()
        );

        let client = env.client;
        let progress = env.progress;
        let results = env
            .pool
            .run_with_progress(
                targets,
                |file| async move {
                    let _ = progress.agent_started(AgentKind::FileMapper);
                    let mut summary: FileSummary = client
                        .invoke(
                            AgentKind::FileMapper,
                            prompts::system_prompt(AgentKind::FileMapper),
                            mapping_context(file, mapping),
                        )
                        .await?;
                    let _ = progress.agent_completed(AgentKind::FileMapper);
                    if summary.path.is_empty() {
                        summary.path = file.path.clone();
                    }
                    Ok::<_, OrchestratorError>(Some(summary))
                },
                |p| {
                    let _ = progress.unit(PipelineStage::Structure, p.completed, p.total, labels[p.index]);
                },
            )
            .await;

        let total = results.len();
        let summaries: Vec<FileSummary> = results.into_iter().flatten().collect();
        info!(
            "[{}] Structure: mapped {}/{} files",
            env.run_id,
            summaries.len(),
            total
        );
        summaries
    }
}

#[async_trait]
impl StageHandler for StructureStage {
    fn agent(&self) -> AgentKind {
        AgentKind::Structure
    }

    async fn execute(&self, env: &StageEnv<'_>) -> Result<StageOutput> {
        let summaries = if env.config.mapping.enabled {
            self.map_files(env).await
        } else {
            Vec::new()
        };

        let context = with_summaries(
            build_context(env.context.chunks(), &env.config.context),
            &summaries,
        )?;

        let result: StructureResult = env
            .client
            .invoke(
                AgentKind::Structure,
                prompts::system_prompt(AgentKind::Structure),
                context,
            )
            .await?;

        info!(
            "[{}] Structure: {} files, {} modules, {} entrypoints",
            env.run_id,
            result.files.len(),
            result.modules.len(),
            result.entrypoints.len()
        );
        Ok(StageOutput::Structure(result))
    }
}
