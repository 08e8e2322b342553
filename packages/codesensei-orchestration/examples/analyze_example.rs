//! Analyze a small in-memory project with a scripted backend
//!
//! Run with: RUST_LOG=info cargo run --example analyze_example

use codesensei_orchestration::{
    AgentKind, AnalysisOrchestrator, ChannelSink, FileUnit, PipelineConfig, ProgressEvent,
    ScriptedBackend,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn project() -> Vec<FileUnit> {
    vec![
        FileUnit::from_path(
            "src/server.ts",
            "import { route } from './router';\nexport function start() {\n  return route('/');\n}\n",
        ),
        FileUnit::from_path(
            "src/router.ts",
            "export function route(path: string) {\n  return { path, ok: true };\n}\n",
        ),
    ]
}

fn backend() -> ScriptedBackend {
    ScriptedBackend::new()
        .with_delay(Duration::from_millis(50))
        .with_json(
            AgentKind::Structure,
            &json!({
                "files": [
                    { "path": "src/server.ts", "language": "ts", "summary": "entry", "size_lines": 4 },
                    { "path": "src/router.ts", "language": "ts", "summary": "routing", "size_lines": 3 }
                ],
                "modules": [{ "name": "http", "files": ["src/server.ts", "src/router.ts"] }],
                "entrypoints": ["src/server.ts"]
            }),
        )
        .with_json(
            AgentKind::Behavior,
            &json!({ "call_graph": [{ "from": "start", "to": "route", "type": "call" }] }),
        )
        .with_json(
            AgentKind::Semantic,
            &json!({ "apis": [{ "name": "route", "purpose": "resolve a path" }] }),
        )
        .with_json(
            AgentKind::Risk,
            &json!({ "risks": [{
                "id": "RISK-ROUTE",
                "severity": "medium",
                "location": "src/router.ts:1-3",
                "description": "every path resolves as ok",
                "mitigation": "validate the path"
            }] }),
        )
        .with_json(
            AgentKind::Execution,
            &json!({ "steps": [
                { "step": 1, "desc": "start", "files": ["src/server.ts"], "action": "call start()" },
                { "step": "2", "desc": "route", "files": ["src/router.ts"], "action": "resolve '/'" }
            ] }),
        )
        .with_json(
            AgentKind::Synthesizer,
            &json!({
                "summary": "A two-file HTTP entry point.",
                "architecture": "server delegates to a router",
                "techStack": ["TypeScript"],
                "graphData": {
                    "nodes": [
                        { "id": "src/server.ts", "group": "file", "val": 4 },
                        { "id": "src/router.ts", "group": "file", "val": 3 }
                    ],
                    "links": [{ "source": "src/server.ts", "target": "src/router.ts", "type": "import" }]
                }
            }),
        )
        .with_json(
            AgentKind::Impact,
            &json!({
                "affected": [{ "file": "src/server.ts", "why": "calls route", "confidence": 0.9 }],
                "tests_likely_to_break": ["server.test.ts"],
                "severity_estimate": "medium",
                "recommended_mitigations": ["keep the old signature as an overload"]
            }),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let orchestrator = AnalysisOrchestrator::new(PipelineConfig::default(), Arc::new(backend()))?;
    println!(
        "{}\n(pool concurrency {})\n",
        orchestrator.execution_plan()?,
        orchestrator.config().pool.concurrency
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::Stage(stage) => println!("stage  {}", stage.stage),
                ProgressEvent::Agent { agent, status } => println!("agent  {} {:?}", agent, status),
            }
        }
    });

    let files = project();
    let chunks = orchestrator.chunker().chunk(&files);
    let sink = ChannelSink::new(tx);
    let analysis = orchestrator.run(files, &sink).await?;
    drop(sink);
    printer.await?;

    println!("\n{}", analysis.to_json_pretty()?);

    let prediction = orchestrator
        .impact_analyzer()
        .predict("rename route() to resolve()", &analysis, &chunks)
        .await?;
    println!("\n{}", serde_json::to_string_pretty(&prediction)?);

    Ok(())
}
