//! Progress events
//!
//! Two streams share one sink: stage transitions (optionally carrying
//! per-unit progress for stages with pooled sub-work) and per-agent
//! started/completed pairs. Sinks are observers; a failing sink never
//! affects the run.

use crate::agent::AgentKind;
use crate::best_effort::{best_effort, BestEffort};
use crate::error::{OrchestratorError, Result};
use crate::job::PipelineStage;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitProgress {
    pub current_unit: usize,
    pub total_units: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEvent {
    pub stage: PipelineStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<UnitProgress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Started,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Stage(StageEvent),
    Agent { agent: AgentKind, status: AgentStatus },
}

impl ProgressEvent {
    pub fn stage(stage: PipelineStage) -> Self {
        ProgressEvent::Stage(StageEvent {
            stage,
            progress: None,
        })
    }

    pub fn unit(stage: PipelineStage, current_unit: usize, total_units: usize, label: impl Into<String>) -> Self {
        ProgressEvent::Stage(StageEvent {
            stage,
            progress: Some(UnitProgress {
                current_unit,
                total_units,
                label: label.into(),
            }),
        })
    }

    pub fn agent(agent: AgentKind, status: AgentStatus) -> Self {
        ProgressEvent::Agent { agent, status }
    }
}

/// Receiver of progress events
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent) -> Result<()>;
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: ProgressEvent) -> Result<()> {
        Ok(())
    }
}

/// Forwards events into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| OrchestratorError::Other(anyhow::anyhow!("progress channel closed")))
    }
}

/// Adapts a closure into a sink
pub struct FnSink<F>(pub F);

impl<F> ProgressSink for FnSink<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) -> Result<()> {
        (self.0)(event);
        Ok(())
    }
}

/// Emits through a sink, swallowing sink failures
#[derive(Clone, Copy)]
pub struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self { sink }
    }

    pub fn emit(&self, event: ProgressEvent) -> BestEffort {
        best_effort("progress", self.sink.emit(event))
    }

    pub fn stage(&self, stage: PipelineStage) -> BestEffort {
        self.emit(ProgressEvent::stage(stage))
    }

    pub fn unit(&self, stage: PipelineStage, current_unit: usize, total_units: usize, label: &str) -> BestEffort {
        self.emit(ProgressEvent::unit(stage, current_unit, total_units, label))
    }

    pub fn agent_started(&self, agent: AgentKind) -> BestEffort {
        self.emit(ProgressEvent::agent(agent, AgentStatus::Started))
    }

    pub fn agent_completed(&self, agent: AgentKind) -> BestEffort {
        self.emit(ProgressEvent::agent(agent, AgentStatus::Completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_channel_sink_forwards() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let reporter_sink = ChannelSink::new(tx);
        let reporter = ProgressReporter::new(&reporter_sink);

        assert_eq!(reporter.stage(PipelineStage::Chunking), BestEffort::Done);
        assert_eq!(reporter.agent_started(AgentKind::Risk), BestEffort::Done);

        assert_eq!(rx.try_recv().unwrap(), ProgressEvent::stage(PipelineStage::Chunking));
        assert_eq!(
            rx.try_recv().unwrap(),
            ProgressEvent::agent(AgentKind::Risk, AgentStatus::Started)
        );
    }

    #[test]
    fn test_closed_channel_is_swallowed() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let sink = ChannelSink::new(tx);
        let reporter = ProgressReporter::new(&sink);

        assert!(sink.emit(ProgressEvent::stage(PipelineStage::Init)).is_err());
        assert!(reporter.stage(PipelineStage::Init).is_swallowed());
    }

    #[test]
    fn test_fn_sink_collects() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let sink = FnSink(move |e: ProgressEvent| captured.lock().push(e));
        let reporter = ProgressReporter::new(&sink);

        let _ = reporter.unit(PipelineStage::Structure, 2, 5, "src/app.ts");

        let events = seen.lock();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ProgressEvent::Stage(StageEvent {
                stage,
                progress: Some(p),
            }) => {
                assert_eq!(*stage, PipelineStage::Structure);
                assert_eq!((p.current_unit, p.total_units), (2, 5));
                assert_eq!(p.label, "src/app.ts");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(ProgressEvent::unit(PipelineStage::Structure, 1, 3, "a.ts")).unwrap();
        assert_eq!(json["type"], "stage");
        assert_eq!(json["stage"], "structure");
        assert_eq!(json["progress"]["currentUnit"], 1);

        let json = serde_json::to_value(ProgressEvent::agent(AgentKind::Behavior, AgentStatus::Completed)).unwrap();
        assert_eq!(json["type"], "agent");
        assert_eq!(json["status"], "completed");
    }
}
