//! A scripted [`Transport`] for tests and ephemeral use.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};
use crate::transport::{Method, OutboundRequest, Transport, TransportResponse};

struct Rule {
    method: Option<Method>,
    url_contains: String,
    response: ProtocolResult<TransportResponse>,
}

/// Serves pre-registered responses and records every request.
///
/// Rules are consumed in registration order; the first rule whose method
/// and URL fragment match the request is used. A request with no matching
/// rule fails with a transport error, which makes scripting gaps visible
/// in tests instead of hanging them.
#[derive(Default)]
pub struct ScriptedTransport {
    rules: Mutex<Vec<Rule>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with a JSON body to the next matching request.
    pub fn respond_json(&self, method: Method, url_contains: &str, status: u16, body: Value) {
        self.push(Rule {
            method: Some(method),
            url_contains: url_contains.to_string(),
            response: Ok(TransportResponse::json(status, &body)),
        });
    }

    /// Respond with a JSON body to the next request, whatever it is.
    pub fn respond_any(&self, status: u16, body: Value) {
        self.push(Rule {
            method: None,
            url_contains: String::new(),
            response: Ok(TransportResponse::json(status, &body)),
        });
    }

    /// Fail the next matching request with a transport error.
    pub fn fail(&self, method: Method, url_contains: &str, message: &str) {
        self.push(Rule {
            method: Some(method),
            url_contains: url_contains.to_string(),
            response: Err(ProtocolError::Transport(message.to_string())),
        });
    }

    fn push(&self, rule: Rule) {
        self.rules.lock().expect("lock poisoned").push(rule);
    }

    /// Every request executed so far, in order.
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    /// Number of rules not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rules.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: OutboundRequest) -> ProtocolResult<TransportResponse> {
        self.requests
            .lock()
            .map_err(|e| ProtocolError::Transport(format!("lock poisoned: {e}")))?
            .push(request.clone());

        let mut rules = self
            .rules
            .lock()
            .map_err(|e| ProtocolError::Transport(format!("lock poisoned: {e}")))?;
        let position = rules
            .iter()
            .position(|rule| {
                rule.method.map_or(true, |m| m == request.method)
                    && request.url.contains(&rule.url_contains)
            })
            .ok_or_else(|| {
                ProtocolError::Transport(format!(
                    "no scripted response for {} {}",
                    request.method, request.url
                ))
            })?;
        rules.remove(position).response
    }
}
