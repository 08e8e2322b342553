use crate::agent::AgentKind;
use crate::job::PipelineStage;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Raised by the file-acquisition collaborator; opaque to the pipeline.
    #[error("Import error: {0}")]
    Import(String),

    #[error("Agent {agent} invocation failed: {message}")]
    AgentInvocation { agent: AgentKind, message: String },

    #[error("Agent {agent} returned a response that does not match its contract: {message}")]
    SchemaValidation {
        agent: AgentKind,
        message: String,
        raw_excerpt: String,
    },

    /// A single unit inside the bounded pool failed. Logged, never returned by a run.
    #[error("Chunk task {label} failed: {message}")]
    ChunkTaskFailure { label: String, message: String },

    #[error("Pipeline aborted during {stage}: {source}")]
    PipelineAbort {
        stage: PipelineStage,
        #[source]
        source: Box<OrchestratorError>,
    },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("DAG cycle detected")]
    DagCycleDetected,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OrchestratorError {
    pub fn serialization<E: std::fmt::Display>(e: E) -> Self {
        Self::Serialization(e.to_string())
    }

    pub fn parse<E: std::fmt::Display>(e: E) -> Self {
        Self::Parse(e.to_string())
    }

    pub fn config<E: std::fmt::Display>(e: E) -> Self {
        Self::Config(e.to_string())
    }

    /// Wrap a stage-fatal error into `PipelineAbort`, keeping an existing abort as-is.
    pub fn abort(stage: PipelineStage, error: OrchestratorError) -> Self {
        match error {
            abort @ Self::PipelineAbort { .. } => abort,
            other => Self::PipelineAbort {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage a run was aborted in, if this is a `PipelineAbort`.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::PipelineAbort { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Error that caused the abort (or `self` for any other variant).
    pub fn root_cause(&self) -> &OrchestratorError {
        match self {
            Self::PipelineAbort { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AgentInvocation { .. } => ErrorCategory::Transient,
            Self::Io(_) => ErrorCategory::Infrastructure,
            Self::PipelineAbort { source, .. } => source.category(),
            Self::Other(e) => {
                let message = e.to_string();
                if message.contains("timeout") || message.contains("connection") {
                    ErrorCategory::Transient
                } else {
                    ErrorCategory::Permanent
                }
            }
            _ => ErrorCategory::Permanent,
        }
    }
}

/// Error category. Informative only: the pipeline performs no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// Transient error (e.g., timeout, connection)
    Transient,
    /// Permanent error (e.g., malformed response, invalid config)
    Permanent,
    /// Infrastructure error (e.g., disk, OOM)
    Infrastructure,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::Infrastructure => "infrastructure",
        }
    }
}

impl std::str::FromStr for ErrorCategory {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        [
            ErrorCategory::Transient,
            ErrorCategory::Permanent,
            ErrorCategory::Infrastructure,
        ]
        .into_iter()
        .find(|category| category.as_str() == s)
        .ok_or_else(|| OrchestratorError::parse(format!("Unknown error category '{}'", s)))
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
