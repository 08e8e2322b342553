//! Result Merger
//!
//! Pure, deterministic combination of the six stage outputs:
//!
//! - `summary`, `architectureNarrative`, `techStack`, `dependencyGraph` come
//!   from Synthesis
//! - `risks` are field-mapped from the Risk stage
//! - `executionFlow` is field-mapped from the Execution stage
//!
//! Every graph node id and file reference is checked against the run's files
//! and chunks. Unresolvable graph nodes (and their edges) are dropped.

use crate::stages::{
    BehaviorResult, ExecutionResult, RiskResult, SemanticResult, StructureResult, SynthesisResult,
};
use crate::types::{Chunk, FileUnit};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// Risk severity, ordered low < medium < high < critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Case-insensitive parse; anything unrecognized is `Medium`.
    pub fn parse_lenient(label: &str) -> Self {
        label.parse().unwrap_or_else(|_| {
            warn!("Unknown severity '{}', using medium", label);
            Severity::Medium
        })
    }
}

impl std::str::FromStr for Severity {
    type Err = crate::error::OrchestratorError;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(crate::error::OrchestratorError::parse(format!(
                "Invalid severity: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeGroup {
    File,
    Module,
    External,
}

impl NodeGroup {
    /// Unknown labels fall back to `File` (every kept node resolves to a file or chunk).
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "module" => NodeGroup::Module,
            "external" => NodeGroup::External,
            _ => NodeGroup::File,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Import,
    Dependency,
}

impl EdgeKind {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "import" | "imports" => EdgeKind::Import,
            _ => EdgeKind::Dependency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub group: NodeGroup,
    pub weight: f64,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// As reported (may be free text)
    pub location: String,
    /// `location` resolved to a known path or chunk id
    pub file_ref: Option<String>,
    pub mitigation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    pub step: u64,
    pub location: String,
    pub action: String,
    pub state_changes: String,
    pub narrative: String,
    pub files_involved: Vec<String>,
    pub approx_time_ms: u64,
}

/// Terminal artifact of a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalAnalysis {
    pub summary: String,
    pub architecture_narrative: String,
    pub tech_stack: BTreeSet<String>,
    pub dependency_graph: DependencyGraph,
    pub risks: Vec<Risk>,
    pub execution_flow: Vec<ExecutionStep>,
}

impl CanonicalAnalysis {
    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        serde_json::to_string_pretty(self).map_err(crate::error::OrchestratorError::serialization)
    }

    /// Highest risk severity, if any risk was reported.
    pub fn max_severity(&self) -> Option<Severity> {
        self.risks.iter().map(|r| r.severity).max()
    }
}

/// The six committed stage outputs of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageResults {
    pub structure: StructureResult,
    pub behavior: BehaviorResult,
    pub semantic: SemanticResult,
    pub risk: RiskResult,
    pub execution: ExecutionResult,
    pub synthesis: SynthesisResult,
}

/// Known file paths and chunk ids of one run
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    paths: HashSet<String>,
    chunk_ids: HashSet<String>,
}

impl ReferenceIndex {
    pub fn new(files: &[FileUnit], chunks: &[Chunk]) -> Self {
        Self {
            paths: files.iter().map(|f| f.path.clone()).collect(),
            chunk_ids: chunks.iter().map(|c| c.id.clone()).collect(),
        }
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.paths.contains(reference) || self.chunk_ids.contains(reference)
    }

    /// Resolve a reference to a known path or chunk id.
    ///
    /// Accepts exact paths and chunk ids, the same with a leading `./` or
    /// `/`, and `path:line` / `path:start-end` forms (resolved to the path
    /// unless they name an existing chunk).
    pub fn resolve(&self, reference: &str) -> Option<String> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return None;
        }

        let candidates = [
            trimmed,
            trimmed.trim_start_matches("./"),
            trimmed.trim_start_matches('/'),
        ];
        for candidate in candidates {
            if self.contains(candidate) {
                return Some(candidate.to_string());
            }
            if let Some((path, suffix)) = candidate.rsplit_once(':') {
                if is_line_suffix(suffix) && self.paths.contains(path) {
                    return Some(path.to_string());
                }
            }
        }
        None
    }
}

/// `12` or `12-30`
fn is_line_suffix(suffix: &str) -> bool {
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    match suffix.split_once('-') {
        Some((start, end)) => digits(start) && digits(end),
        None => digits(suffix),
    }
}

pub fn merge(results: &StageResults, index: &ReferenceIndex) -> CanonicalAnalysis {
    let synthesis = &results.synthesis;

    CanonicalAnalysis {
        summary: synthesis.summary.clone(),
        architecture_narrative: synthesis.architecture.clone(),
        tech_stack: synthesis
            .tech_stack
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        dependency_graph: merge_graph(synthesis, index),
        risks: merge_risks(&results.risk, index),
        execution_flow: merge_steps(&results.execution, index),
    }
}

fn merge_graph(synthesis: &SynthesisResult, index: &ReferenceIndex) -> DependencyGraph {
    let draft = &synthesis.graph_data;

    let mut kept: HashSet<String> = HashSet::new();
    let mut nodes = Vec::new();
    for node in &draft.nodes {
        let Some(id) = index.resolve(&node.id) else {
            debug!("Merge: dropping graph node '{}' (unknown reference)", node.id);
            continue;
        };
        if !kept.insert(id.clone()) {
            continue;
        }
        nodes.push(GraphNode {
            id,
            group: NodeGroup::from_label(&node.group),
            weight: node.val,
            details: node.details.clone(),
        });
    }

    let mut seen_edges = HashSet::new();
    let mut edges = Vec::new();
    for link in &draft.links {
        let source = index.resolve(&link.source).filter(|id| kept.contains(id));
        let target = index.resolve(&link.target).filter(|id| kept.contains(id));
        let (Some(source), Some(target)) = (source, target) else {
            debug!(
                "Merge: dropping edge {} -> {} (endpoint dropped)",
                link.source, link.target
            );
            continue;
        };

        let edge = GraphEdge {
            source,
            target,
            kind: EdgeKind::from_label(&link.kind),
        };
        if seen_edges.insert((edge.source.clone(), edge.target.clone(), edge.kind)) {
            edges.push(edge);
        }
    }

    DependencyGraph { nodes, edges }
}

fn merge_risks(risk: &RiskResult, index: &ReferenceIndex) -> Vec<Risk> {
    risk.risks
        .iter()
        .map(|r| Risk {
            id: r.id.clone(),
            title: r.id.clone(),
            description: r.description.clone(),
            severity: Severity::parse_lenient(&r.severity),
            location: r.location.clone(),
            file_ref: index.resolve(&r.location),
            mitigation: r.mitigation.clone(),
        })
        .collect()
}

fn merge_steps(execution: &ExecutionResult, index: &ReferenceIndex) -> Vec<ExecutionStep> {
    execution
        .steps
        .iter()
        .map(|s| {
            let mut files_involved: Vec<String> = Vec::new();
            for file in s.files.iter().filter_map(|f| index.resolve(f)) {
                if !files_involved.contains(&file) {
                    files_involved.push(file);
                }
            }

            ExecutionStep {
                step: s.step,
                location: s.location.clone(),
                action: s.action.clone(),
                state_changes: s.state_changes.clone(),
                narrative: s.narrative.clone(),
                files_involved,
                approx_time_ms: s.approx_time_ms,
            }
        })
        .collect()
}
