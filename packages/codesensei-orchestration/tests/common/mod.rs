//! Shared fixtures for integration tests

#![allow(dead_code)]

use codesensei_orchestration::{
    AgentKind, FileUnit, FnSink, PipelineStage, ProgressEvent, ScriptedBackend, StageEvent,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn five_line_file(path: &str) -> FileUnit {
    FileUnit::from_path(
        path,
        "import { helper } from './helper';\n\
         export function main() {\n\
         \x20 return helper();\n\
         }\n\
         main();",
    )
}

pub fn structure_json(paths: &[&str]) -> Value {
    json!({
        "files": paths.iter().map(|p| json!({
            "path": p,
            "language": "ts",
            "summary": "module entry",
            "exports": ["main"],
            "imports": ["./helper"],
            "size_lines": 5
        })).collect::<Vec<_>>(),
        "modules": [{ "name": "core", "files": paths, "responsibility": "bootstraps the app" }],
        "entrypoints": [paths[0]]
    })
}

pub fn behavior_json() -> Value {
    json!({
        "call_graph": [{ "from": "main", "to": "helper", "type": "call" }],
        "side_effects": [{ "location": "main", "type": "io", "description": "logs to stdout" }],
        "global_state": []
    })
}

pub fn semantic_json() -> Value {
    json!({
        "apis": [{ "name": "main", "purpose": "entry", "inputs": "none", "outputs": "number", "contracts": "pure" }],
        "invariants": [{ "description": "helper is total", "evidence": ["helper.ts"] }],
        "patterns": [{ "pattern": "facade", "evidence": "main wraps helper" }]
    })
}

pub fn risk_json(location: &str) -> Value {
    json!({
        "risks": [
            {
                "id": "RISK-1",
                "severity": "high",
                "location": location,
                "description": "unchecked helper result",
                "why": "errors are swallowed",
                "confidence": 0.7,
                "mitigation": ["check the return value"]
            },
            {
                "id": "RISK-2",
                "severity": "Low",
                "location": "somewhere else",
                "description": "naming",
                "why": "style",
                "confidence": 0.2,
                "mitigation": []
            }
        ]
    })
}

pub fn execution_json(path: &str) -> Value {
    json!({
        "steps": [
            {
                "step": 1,
                "desc": "load module",
                "files": [path],
                "approx_time_ms": 3,
                "location": path,
                "action": "import helper",
                "stateChanges": "module cache filled",
                "narrative": "node resolves the import"
            },
            {
                "step": 2,
                "desc": "call main",
                "files": [path, "not/in/input.ts"],
                "approx_time_ms": 1,
                "location": "main()",
                "action": "invoke",
                "stateChanges": "none",
                "narrative": "main delegates to helper"
            }
        ],
        "visual_script": []
    })
}

pub fn synthesis_json(path: &str) -> Value {
    json!({
        "summary": "A tiny entry module.",
        "architecture": "Single module delegating to a helper.",
        "techStack": ["TypeScript", "Node.js"],
        "graphData": {
            "nodes": [
                { "id": path, "group": "file", "val": 5, "details": "entry point", "risks": ["SYNTH-ONLY"] },
                { "id": "lodash", "group": "external", "val": 1, "details": "third party" }
            ],
            "links": [{ "source": path, "target": "lodash", "type": "import" }]
        }
    })
}

pub fn file_summary_json() -> Value {
    json!({
        "purpose": "entry module",
        "exports": ["main"],
        "imports": ["./helper"],
        "dependencies": [],
        "complexity_score": 2
    })
}

/// Backend answering all six pipeline agents for files at `paths`.
pub fn scripted_backend(paths: &[&str]) -> ScriptedBackend {
    let first = paths[0];
    ScriptedBackend::new()
        .with_json(AgentKind::Structure, &structure_json(paths))
        .with_json(AgentKind::Behavior, &behavior_json())
        .with_json(AgentKind::Semantic, &semantic_json())
        .with_json(AgentKind::Risk, &risk_json(first))
        .with_json(AgentKind::Execution, &execution_json(first))
        .with_json(AgentKind::Synthesizer, &synthesis_json(first))
        .with_json(AgentKind::FileMapper, &file_summary_json())
}

/// Sink collecting every event
pub fn collecting_sink() -> (
    FnSink<impl Fn(ProgressEvent) + Send + Sync>,
    Arc<Mutex<Vec<ProgressEvent>>>,
) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let captured = events.clone();
    (FnSink(move |e: ProgressEvent| captured.lock().push(e)), events)
}

/// Stage-transition events without per-unit progress
pub fn stage_sequence(events: &[ProgressEvent]) -> Vec<PipelineStage> {
    events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Stage(StageEvent {
                stage,
                progress: None,
            }) => Some(*stage),
            _ => None,
        })
        .collect()
}

pub fn position(calls: &[AgentKind], agent: AgentKind) -> Option<usize> {
    calls.iter().position(|c| *c == agent)
}
