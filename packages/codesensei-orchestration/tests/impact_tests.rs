//! Change-impact prediction on top of a finished run

mod common;

use codesensei_orchestration::{AgentKind, AnalysisOrchestrator, PipelineConfig, Severity};
use common::*;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_predict_after_analysis() {
    let path = "src/main.ts";
    let backend = Arc::new(scripted_backend(&[path]).with_json(
        AgentKind::Impact,
        &json!({
            "change": "",
            "affected": [{ "file": path, "why": "calls helper directly", "confidence": "0.8" }],
            "tests_likely_to_break": "main.test.ts",
            "severity_estimate": "HIGH",
            "recommended_mitigations": ["add an adapter"]
        }),
    ));
    let orchestrator = AnalysisOrchestrator::new(PipelineConfig::default(), backend.clone()).unwrap();

    let file = five_line_file(path);
    let chunks = orchestrator.chunker().chunk(std::slice::from_ref(&file));
    let analysis = orchestrator.analyze(vec![file]).await.unwrap();

    let prediction = orchestrator
        .impact_analyzer()
        .predict("inline helper into main", &analysis, &chunks)
        .await
        .unwrap();

    assert_eq!(prediction.change, "inline helper into main");
    assert_eq!(prediction.severity_estimate, Severity::High);
    assert_eq!(prediction.affected.len(), 1);
    assert!((prediction.affected[0].confidence - 0.8).abs() < f64::EPSILON);
    assert_eq!(prediction.tests_likely_to_break, vec!["main.test.ts"]);

    let request = backend
        .requests()
        .into_iter()
        .find(|r| r.agent == AgentKind::Impact)
        .unwrap();
    assert!(request
        .context
        .starts_with("CURRENT ARCHITECTURE: Single module delegating to a helper.\nPROPOSED CHANGE: inline helper into main"));

    let value = serde_json::to_value(&prediction).unwrap();
    assert_eq!(value["severityEstimate"], "high");
    assert!(value.get("testsLikelyToBreak").is_some());
}

#[tokio::test]
async fn test_impact_failure_is_not_an_abort() {
    let path = "src/main.ts";
    let backend = Arc::new(scripted_backend(&[path]).with_failure(AgentKind::Impact, "quota"));
    let orchestrator = AnalysisOrchestrator::new(PipelineConfig::default(), backend).unwrap();
    let analysis = orchestrator.analyze(vec![five_line_file(path)]).await.unwrap();

    let err = orchestrator
        .impact_analyzer()
        .predict("drop helper", &analysis, &[])
        .await
        .unwrap_err();
    assert!(err.stage().is_none());
}
