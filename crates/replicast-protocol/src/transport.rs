use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};

/// Request method of the outbound contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of an outbound request.
///
/// Structured entities travel as JSON; binary assets travel as raw bytes
/// with a content-addressed integrity header instead of a JSON body.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Binary {
        bytes: Vec<u8>,
        content_type: String,
        content_disposition: String,
        /// Hex MD5 of `bytes`.
        content_md5: String,
    },
}

/// A fully built, signed request, ready for any [`Transport`].
#[derive(Clone, Debug)]
pub struct OutboundRequest {
    pub method: Method,
    /// Full URL without the query string.
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl OutboundRequest {
    /// The canonical URI the signature covers: the URL plus any query
    /// string, in the order the query was built.
    pub fn uri_with_query(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("{}?{}", self.url, query.join("&"))
    }

    /// First header with the given name, if any.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The JSON body, if the request has one.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// A raw destination response.
///
/// Transports report any completed HTTP exchange as `Ok`, whatever the
/// status; only failures to complete the exchange are transport errors.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// A JSON response, for tests and scripted transports.
    pub fn json(status: u16, value: &Value) -> Self {
        Self {
            status,
            body: value.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn parse_json(&self) -> ProtocolResult<Value> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ProtocolError::Serialization(format!("response body: {e}")))
    }

    /// Human-readable failure reason: the JSON `message` field when
    /// present, otherwise the (truncated) raw body.
    pub fn reason(&self) -> String {
        if let Ok(value) = self.parse_json() {
            if let Some(message) = value.get("message").and_then(Value::as_str) {
                return message.to_string();
            }
        }
        let text = String::from_utf8_lossy(&self.body);
        let mut reason = text.trim().to_string();
        reason.truncate(200);
        if reason.is_empty() {
            reason = format!("status {}", self.status);
        }
        reason
    }
}

/// Transport seam: executes one signed request against a destination.
///
/// Timeout and backoff are the transport's business; the engine surfaces
/// one attempt's outcome per call and never retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: OutboundRequest) -> ProtocolResult<TransportResponse>;
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured client (timeouts, proxies, TLS roots).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: OutboundRequest) -> ProtocolResult<TransportResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Binary { bytes, .. } => builder.body(bytes),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ProtocolError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProtocolError::Transport(e.to_string()))?
            .to_vec();
        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_strings() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn uri_with_query() {
        let request = OutboundRequest {
            method: Method::Delete,
            url: "https://remote.example/wp-json/wp/v2/posts/9/".into(),
            query: vec![("force".into(), "true".into())],
            headers: vec![],
            body: RequestBody::Empty,
        };
        assert_eq!(
            request.uri_with_query(),
            "https://remote.example/wp-json/wp/v2/posts/9/?force=true"
        );
    }

    #[test]
    fn uri_without_query_is_url() {
        let request = OutboundRequest {
            method: Method::Post,
            url: "https://remote.example/wp-json/wp/v2/posts/".into(),
            query: vec![],
            headers: vec![],
            body: RequestBody::Empty,
        };
        assert_eq!(request.uri_with_query(), request.url);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = OutboundRequest {
            method: Method::Post,
            url: "https://x/".into(),
            query: vec![],
            headers: vec![("X-API-KEY".into(), "k".into())],
            body: RequestBody::Empty,
        };
        assert_eq!(request.header("x-api-key"), Some("k"));
        assert_eq!(request.header("X-Missing"), None);
    }

    #[test]
    fn response_reason_prefers_message() {
        let response = TransportResponse::json(403, &json!({"message": "invalid signature"}));
        assert_eq!(response.reason(), "invalid signature");
        assert!(!response.is_success());
    }

    #[test]
    fn response_reason_falls_back_to_body() {
        let response = TransportResponse {
            status: 502,
            body: b"Bad Gateway".to_vec(),
        };
        assert_eq!(response.reason(), "Bad Gateway");

        let empty = TransportResponse {
            status: 500,
            body: Vec::new(),
        };
        assert_eq!(empty.reason(), "status 500");
    }
}
