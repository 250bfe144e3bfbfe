//! OpenAI-compatible chat-completion client.

use std::time::Duration;

use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::Deserialize;

use super::{ChatMessage, LlmError, ModelClient, RetryConfig};
use crate::config::Config;

/// Default per-request timeout for non-streaming completions.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for any OpenAI-compatible `/chat/completions` endpoint
/// (OpenAI, OpenRouter, Groq, Ollama, vLLM).
///
/// Handles auth, status mapping, and retry with exponential backoff for
/// transient failures. Agent loops hold it as `Arc<dyn ModelClient>` and
/// never retry on their own.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    request_timeout: Duration,
    retry: RetryConfig,
}

impl OpenAiClient {
    /// Create a client for the given endpoint, key, and model identifier.
    ///
    /// `api_url` is the API base (e.g. `https://api.openai.com/v1`);
    /// `/chat/completions` is appended per request.
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let api_url = api_url.into();
        let model = model.into();
        tracing::debug!(api_url = %api_url, model = %model, "Model client initialized");

        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key: api_key.into(),
            model,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }

    /// Build a client from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_url, &config.api_key, &config.model_id)
            .with_timeout(config.request_timeout)
            .with_retry(config.retry.clone())
    }

    /// Replace the underlying HTTP client.
    #[must_use]
    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Set the per-request timeout for non-streaming completions.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Request a streaming completion, invoking `on_delta` for each text
    /// fragment as it arrives. Returns the concatenated completion.
    ///
    /// Unlike [`ModelClient::complete`], streaming requests are not
    /// retried: fragments may already have reached the caller.
    pub async fn complete_streaming<F>(
        &self,
        messages: &[ChatMessage],
        mut on_delta: F,
    ) -> Result<String, LlmError>
    where
        F: FnMut(&str),
    {
        let url = format!("{}/chat/completions", self.api_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });

        // No request timeout here: reqwest applies it to the full response
        // body, which would cut off long generations mid-stream.
        let request = self.http.post(&url).bearer_auth(&self.api_key).json(&body);
        let mut source = EventSource::new(request)
            .map_err(|e| LlmError::Network(format!("failed to open event stream: {}", e)))?;

        let mut full = String::new();
        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(message)) => {
                    if message.data.trim() == "[DONE]" {
                        source.close();
                        break;
                    }
                    // Providers interleave keep-alives and malformed
                    // chunks; skip anything that does not decode.
                    let Ok(chunk) = serde_json::from_str::<StreamChunk>(&message.data) else {
                        continue;
                    };
                    if let Some(delta) = chunk
                        .choices
                        .first()
                        .and_then(|choice| choice.delta.content.as_deref())
                    {
                        on_delta(delta);
                        full.push_str(delta);
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(code, response)) => {
                    source.close();
                    return Err(error_for_status(code.as_u16(), response).await);
                }
                Err(err) => {
                    source.close();
                    return Err(LlmError::Network(err.to_string()));
                }
            }
        }

        Ok(full)
    }

    /// Send one chat-completion request without retrying.
    async fn send_chat(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.api_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_for_status(status.as_u16(), response).await);
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("completion has no choices".into()))?;
        choice
            .message
            .content
            .ok_or_else(|| LlmError::InvalidResponse("completion message has no content".into()))
    }
}

#[async_trait::async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        for attempt in 0..self.retry.max_attempts.max(1) {
            match self.send_chat(messages).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    if !err.is_retryable() || attempt + 1 >= self.retry.max_attempts {
                        return Err(err);
                    }
                    // Prefer the server's own cooldown hint over backoff,
                    // capped at max_delay like any computed delay.
                    let delay = match &err {
                        LlmError::RateLimited {
                            retry_after: Some(after),
                        } => (*after).min(self.retry.max_delay),
                        _ => self.retry.delay_for_attempt(attempt),
                    };
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(LlmError::Network("no attempts made".into()))
    }
}

/// Map a non-success HTTP response to an [`LlmError`].
async fn error_for_status(status: u16, response: reqwest::Response) -> LlmError {
    match status {
        401 | 403 => LlmError::Auth,
        429 => {
            let retry_after = parse_retry_after(response.headers());
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "rate limited".into());
            // Quota exhaustion also comes back as 429, but retrying it
            // cannot help.
            if message.contains("insufficient_quota") {
                LlmError::Api {
                    status: 429,
                    message,
                }
            } else {
                LlmError::RateLimited { retry_after }
            }
        }
        _ => {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".into());
            LlmError::Api { status, message }
        }
    }
}

/// Parse `Retry-After` into a Duration (numeric seconds only).
///
/// Returns `None` for non-positive, non-numeric, or unrepresentable
/// values (`inf`, `nan`, out-of-range exponents).
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let value = headers.get("retry-after")?.to_str().ok()?;
    let secs: f64 = value.parse().ok()?;
    if secs <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    /// Reqwest client that bypasses any ambient proxy for test use.
    fn no_proxy_client() -> reqwest::Client {
        reqwest::Client::builder()
            .no_proxy()
            .build()
            .expect("build test client")
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sends_bearer_auth_and_parses_completion() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hello!")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "test-key", "gpt-test")
            .with_client(no_proxy_client())
            .with_retry(RetryConfig::no_retry());

        let reply = client
            .complete(&[ChatMessage::user("Say hello")])
            .await
            .expect("completion succeeds");
        assert_eq!(reply, "Hello!");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn auth_failure_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "bad-key", "gpt-test")
            .with_client(no_proxy_client())
            .with_retry(fast_retry(3));

        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .expect_err("401 should fail");
        assert!(matches!(err, LlmError::Auth));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn server_errors_retry_then_succeed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("recovered")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "test-key", "gpt-test")
            .with_client(no_proxy_client())
            .with_retry(fast_retry(3));

        let reply = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .expect("third attempt succeeds");
        assert_eq!(reply, "recovered");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn retry_exhaustion_returns_last_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(2)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "test-key", "gpt-test")
            .with_client(no_proxy_client())
            .with_retry(fast_retry(2));

        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .expect_err("all attempts fail");
        assert!(matches!(err, LlmError::Api { status: 500, .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rate_limit_carries_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "test-key", "gpt-test")
            .with_client(no_proxy_client())
            .with_retry(RetryConfig::no_retry());

        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .expect_err("rate limited");
        match err {
            LlmError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(2)));
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unparseable_retry_after_still_maps_to_rate_limited() {
        let server = MockServer::start().await;

        // `parse::<f64>()` accepts "inf"; the hint must be dropped, not
        // fed to Duration construction.
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "inf"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "test-key", "gpt-test")
            .with_client(no_proxy_client())
            .with_retry(RetryConfig::no_retry());

        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .expect_err("rate limited");
        assert!(matches!(err, LlmError::RateLimited { retry_after: None }));
    }

    #[test]
    fn retry_after_rejects_unrepresentable_values() {
        let mut headers = reqwest::header::HeaderMap::new();
        for bad in ["inf", "1e300", "nan", "-5", "0", "soon"] {
            headers.insert("retry-after", bad.parse().expect("header value"));
            assert_eq!(parse_retry_after(&headers), None, "value: {}", bad);
        }

        headers.insert("retry-after", "2".parse().expect("header value"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(2)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn oversized_retry_after_hint_is_clamped() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7200"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("recovered")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "test-key", "gpt-test")
            .with_client(no_proxy_client())
            .with_retry(fast_retry(2));

        // Without the max_delay cap this retry would sleep two hours.
        let started = std::time::Instant::now();
        let reply = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .expect("retry succeeds");
        assert_eq!(reply, "recovered");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn quota_exhaustion_is_not_retryable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_string(r#"{"error":{"code":"insufficient_quota"}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "test-key", "gpt-test")
            .with_client(no_proxy_client())
            .with_retry(fast_retry(3));

        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .expect_err("quota errors fail fast");
        assert!(matches!(err, LlmError::Api { status: 429, .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_choices_is_invalid_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-test",
                "choices": []
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "test-key", "gpt-test")
            .with_client(no_proxy_client())
            .with_retry(RetryConfig::no_retry());

        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .expect_err("no choices");
        assert!(matches!(err, LlmError::InvalidResponse(msg) if msg.contains("choices")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn null_message_content_is_invalid_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-test",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": null },
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "test-key", "gpt-test")
            .with_client(no_proxy_client())
            .with_retry(RetryConfig::no_retry());

        let err = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .expect_err("null content");
        assert!(matches!(err, LlmError::InvalidResponse(msg) if msg.contains("content")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn streaming_concatenates_deltas_until_done() {
        let server = MockServer::start().await;

        let sse_body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Par\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"is\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "test-key", "gpt-test")
            .with_client(no_proxy_client());

        let mut deltas = Vec::new();
        let full = client
            .complete_streaming(&[ChatMessage::user("capital of France?")], |d| {
                deltas.push(d.to_string());
            })
            .await
            .expect("stream succeeds");

        assert_eq!(full, "Paris");
        assert_eq!(deltas, vec!["Par", "is"]);
    }
}
