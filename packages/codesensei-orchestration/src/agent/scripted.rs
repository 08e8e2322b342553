//! Scripted backend
//!
//! Deterministic in-process [`AgentBackend`] returning canned text (or a
//! canned failure) per agent. Every request is recorded in call order.

use super::{AgentBackend, AgentKind, AgentRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Text(String),
    Failure(String),
}

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    responses: HashMap<AgentKind, ScriptedResponse>,
    delays: HashMap<AgentKind, Duration>,
    default_delay: Option<Duration>,
    requests: Mutex<Vec<AgentRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, agent: AgentKind, text: impl Into<String>) -> Self {
        self.responses.insert(agent, ScriptedResponse::Text(text.into()));
        self
    }

    pub fn with_json(self, agent: AgentKind, value: &serde_json::Value) -> Self {
        self.with_response(agent, value.to_string())
    }

    pub fn with_failure(mut self, agent: AgentKind, message: impl Into<String>) -> Self {
        self.responses
            .insert(agent, ScriptedResponse::Failure(message.into()));
        self
    }

    /// Delay applied to every call without an agent-specific delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn with_agent_delay(mut self, agent: AgentKind, delay: Duration) -> Self {
        self.delays.insert(agent, delay);
        self
    }

    /// Agents in the order their calls started.
    pub fn calls(&self) -> Vec<AgentKind> {
        self.requests.lock().iter().map(|r| r.agent).collect()
    }

    pub fn call_count(&self, agent: AgentKind) -> usize {
        self.requests.lock().iter().filter(|r| r.agent == agent).count()
    }

    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().clone()
    }

    fn delay_for(&self, agent: AgentKind) -> Option<Duration> {
        self.delays.get(&agent).copied().or(self.default_delay)
    }
}

#[async_trait]
impl AgentBackend for ScriptedBackend {
    async fn generate(&self, request: AgentRequest) -> anyhow::Result<String> {
        let agent = request.agent;
        self.requests.lock().push(request);

        if let Some(delay) = self.delay_for(agent) {
            tokio::time::sleep(delay).await;
        }

        match self.responses.get(&agent) {
            Some(ScriptedResponse::Text(text)) => Ok(text.clone()),
            Some(ScriptedResponse::Failure(message)) => Err(anyhow::anyhow!(message.clone())),
            None => Err(anyhow::anyhow!("no scripted response for agent {}", agent)),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(agent: AgentKind) -> AgentRequest {
        AgentRequest {
            agent,
            model: "test".to_string(),
            system_prompt: String::new(),
            context: String::new(),
            schema: serde_json::Value::Null,
            temperature: 0.0,
            response_mime_type: AgentRequest::RESPONSE_MIME_TYPE,
        }
    }

    #[tokio::test]
    async fn test_scripted_responses_and_log() {
        let backend = ScriptedBackend::new()
            .with_response(AgentKind::Structure, "{}")
            .with_failure(AgentKind::Risk, "quota exceeded");

        assert_eq!(backend.generate(request(AgentKind::Structure)).await.unwrap(), "{}");
        let err = backend.generate(request(AgentKind::Risk)).await.unwrap_err();
        assert!(err.to_string().contains("quota"));
        assert!(backend.generate(request(AgentKind::Impact)).await.is_err());

        assert_eq!(
            backend.calls(),
            vec![AgentKind::Structure, AgentKind::Risk, AgentKind::Impact]
        );
        assert_eq!(backend.call_count(AgentKind::Risk), 1);
        assert!(backend
            .requests()
            .iter()
            .all(|r| r.response_mime_type == "application/json"));
    }
}
