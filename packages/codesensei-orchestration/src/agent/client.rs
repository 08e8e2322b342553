//! Agent Client
//!
//! Sends one request to the backend, then turns the raw text into a typed
//! result: strip fences, parse, and on a syntax failure repair once and
//! parse again.

use super::contract::ResponseContract;
use super::repair::{repair_truncated_json, strip_code_fences};
use super::{AgentBackend, AgentKind, AgentRequest};
use crate::config::AgentSettings;
use crate::error::{OrchestratorError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Characters of the raw response kept in a `SchemaValidation` error
const RAW_EXCERPT_CHARS: usize = 200;

#[derive(Clone)]
pub struct AgentClient {
    backend: Arc<dyn AgentBackend>,
    settings: AgentSettings,
}

impl AgentClient {
    pub fn new(backend: Arc<dyn AgentBackend>, settings: AgentSettings) -> Self {
        Self { backend, settings }
    }

    pub async fn invoke<T: ResponseContract>(
        &self,
        agent: AgentKind,
        system_prompt: &str,
        context: String,
    ) -> Result<T> {
        let request = AgentRequest {
            agent,
            model: self.settings.model.clone(),
            system_prompt: system_prompt.to_string(),
            context,
            schema: T::schema(),
            temperature: self.settings.temperatures.for_agent(agent),
            response_mime_type: AgentRequest::RESPONSE_MIME_TYPE,
        };
        debug!(
            "Agent {}: sending {} context chars to {}",
            agent,
            request.context.len(),
            self.backend.name()
        );

        let start = Instant::now();
        let timeout_ms = self.settings.request_timeout_ms;
        let raw = match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.backend.generate(request),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                return Err(OrchestratorError::AgentInvocation {
                    agent,
                    message: format!("{:#}", e),
                })
            }
            Err(_) => {
                return Err(OrchestratorError::AgentInvocation {
                    agent,
                    message: format!("no response within {} ms", timeout_ms),
                })
            }
        };

        info!(
            "Agent {} responded in {}ms ({} chars)",
            agent,
            start.elapsed().as_millis(),
            raw.len()
        );

        parse_response(agent, &raw)
    }
}

/// Parse raw response text against `T`, repairing truncated JSON once.
pub fn parse_response<T: ResponseContract>(agent: AgentKind, raw: &str) -> Result<T> {
    let cleaned = strip_code_fences(raw);

    let first = match serde_json::from_str::<T>(cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    // Well-formed JSON of the wrong shape cannot be repaired
    if first.is_data() {
        return Err(schema_error(agent, format!("{}: {}", T::NAME, first), raw));
    }

    warn!(
        "Agent {}: {} response is not valid JSON ({}), attempting repair",
        agent,
        T::NAME,
        first
    );
    let repaired = repair_truncated_json(cleaned);
    serde_json::from_str::<T>(&repaired).map_err(|e| {
        schema_error(
            agent,
            format!("{} still invalid after repair: {}", T::NAME, e),
            raw,
        )
    })
}

fn schema_error(agent: AgentKind, message: String, raw: &str) -> OrchestratorError {
    OrchestratorError::SchemaValidation {
        agent,
        message,
        raw_excerpt: raw.chars().take(RAW_EXCERPT_CHARS).collect(),
    }
}
