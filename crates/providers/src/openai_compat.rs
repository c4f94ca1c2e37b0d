//! Chat completions over the OpenAI wire format.
//!
//! Groq is the default backend; OpenAI, OpenRouter, Ollama and vLLM speak
//! the same `/chat/completions` protocol and work unchanged.

use async_trait::async_trait;
use futures::StreamExt;
use haru_core::error::ProviderError;
use haru_core::message::{Message, MessageToolCall, Role};
use haru_core::provider::{
    ChunkReceiver, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition, Usage,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Used when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: build_client(DEFAULT_TIMEOUT),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::new("groq", "https://api.groq.com/openai/v1", api_key)
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// POST a completion request and map failure statuses.
    async fn post(&self, body: &CompletionBody<'_>) -> Result<reqwest::Response, ProviderError> {
        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key);
        if body.stream {
            builder = builder.header(reqwest::header::ACCEPT, "text/event-stream");
        }

        let response = builder
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        match response.status().as_u16() {
            200..=299 => Ok(response),
            429 => Err(ProviderError::RateLimited {
                retry_after_secs: retry_after(&response),
            }),
            401 | 403 => Err(ProviderError::AuthenticationFailed(format!(
                "{} rejected the API key",
                self.name
            ))),
            status => {
                let message = response.text().await.unwrap_or_default();
                warn!(provider = %self.name, status, body = %message, "Model API error");
                Err(ProviderError::ApiError {
                    status_code: status,
                    message,
                })
            }
        }
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

fn retry_after(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

#[async_trait]
impl haru_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Completion request");
        let response = self.post(&CompletionBody::new(&request, false)).await?;

        let reply: CompletionReply = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let choice = reply
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no choices".into()))?;

        let mut message = Message::assistant(choice.message.content.unwrap_or_default());
        message.tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|tc| MessageToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(ProviderResponse {
            message,
            usage: reply.usage.map(Usage::from),
            model: reply.model,
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Streaming request");
        let response = self.post(&CompletionBody::new(&request, true)).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut lines = LineBuffer::default();
            let mut state = SseState::default();

            while let Some(next) = bytes.next().await {
                let data = match next {
                    Ok(data) => data,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };
                lines.push(&data);

                while let Some(line) = lines.next_line() {
                    for chunk in state.feed_line(&line, &provider_name) {
                        let done = chunk.done;
                        if tx.send(Ok(chunk)).await.is_err() || done {
                            return;
                        }
                    }
                }
            }

            // no [DONE] marker
            let _ = tx.send(Ok(state.finish(None))).await;
        });

        Ok(rx)
    }
}

/// Raw bytes of the response body that have not yet formed a full line.
///
/// Network chunks can end inside a multi-byte character, so decoding waits
/// for the `\n` that closes each line.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
    }

    /// Next complete line with its line ending stripped.
    fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line).trim_end().to_string())
    }
}

/// Incremental state for one SSE response.
///
/// Text deltas are emitted as they arrive; tool call fragments are
/// accumulated by index and released with the final chunk.
#[derive(Default)]
struct SseState {
    tool_calls: BTreeMap<u32, MessageToolCall>,
}

impl SseState {
    /// Process one SSE line. The last returned chunk has `done` set once the
    /// stream is complete.
    fn feed_line(&mut self, line: &str, provider_name: &str) -> Vec<StreamChunk> {
        let Some(data) = line.strip_prefix("data:").map(str::trim) else {
            // blank separators, comments, `event:` lines
            return Vec::new();
        };

        if data == "[DONE]" {
            return vec![self.finish(None)];
        }

        let delta: DeltaReply = match serde_json::from_str(data) {
            Ok(d) => d,
            Err(e) => {
                trace!(provider = %provider_name, data, error = %e, "Skipping unparseable SSE data");
                return Vec::new();
            }
        };

        let mut out = Vec::new();

        if let Some(choice) = delta.choices.into_iter().next() {
            for fragment in choice.delta.tool_calls {
                let call = self
                    .tool_calls
                    .entry(fragment.index)
                    .or_insert_with(|| MessageToolCall {
                        id: String::new(),
                        name: String::new(),
                        arguments: String::new(),
                    });
                if let Some(id) = fragment.id {
                    call.id = id;
                }
                if let Some(function) = fragment.function {
                    if let Some(name) = function.name {
                        call.name = name;
                    }
                    if let Some(args) = function.arguments {
                        call.arguments.push_str(&args);
                    }
                }
            }

            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                out.push(StreamChunk::text(content));
            }
        }

        // sent last when include_usage is honoured
        if let Some(usage) = delta.usage {
            out.push(self.finish(Some(usage.into())));
        }

        out
    }

    fn finish(&mut self, usage: Option<Usage>) -> StreamChunk {
        let calls = std::mem::take(&mut self.tool_calls).into_values().collect();
        StreamChunk::last(calls, usage)
    }
}

// --- Request wire types ---

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

impl<'a> CompletionBody<'a> {
    fn new(request: &'a ProviderRequest, stream: bool) -> Self {
        Self {
            model: &request.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: request.temperature,
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
            max_tokens: request.max_tokens,
            tools: request.tools.iter().map(WireTool::from).collect(),
        }
    }
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(m: &'a Message) -> Self {
        Self {
            role: match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            },
            content: &m.content,
            tool_calls: m
                .tool_calls
                .iter()
                .map(|tc| WireToolCall {
                    id: &tc.id,
                    kind: "function",
                    function: WireFunction {
                        name: &tc.name,
                        arguments: &tc.arguments,
                    },
                })
                .collect(),
            tool_call_id: m.tool_call_id.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDefinition,
}

impl<'a> From<&'a ToolDefinition> for WireTool<'a> {
    fn from(def: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: def,
        }
    }
}

// --- Response wire types ---

#[derive(Deserialize)]
struct CompletionReply {
    #[serde(default)]
    model: String,
    choices: Vec<ReplyChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ReplyChoice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ReplyToolCall>,
}

#[derive(Deserialize)]
struct ReplyToolCall {
    id: String,
    function: ReplyFunction,
}

#[derive(Deserialize)]
struct ReplyFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<WireUsage> for Usage {
    fn from(u: WireUsage) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

/// One `data:` payload of a streamed reply.
#[derive(Deserialize)]
struct DeltaReply {
    #[serde(default)]
    choices: Vec<DeltaChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct DeltaChoice {
    delta: Delta,
}

#[derive(Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallFragment>,
}

#[derive(Deserialize)]
struct ToolCallFragment {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionFragment>,
}

#[derive(Deserialize)]
struct FunctionFragment {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use haru_core::Provider;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "test-model".into(),
            messages: vec![Message::system("너는 친절한 비서야"), Message::user("안녕")],
            temperature: 0.7,
            max_tokens: None,
            tools: vec![],
        }
    }

    #[test]
    fn groq_defaults() {
        let provider = OpenAiCompatProvider::groq("gsk-test");
        assert_eq!(provider.name(), "groq");
        assert_eq!(provider.base_url, "https://api.groq.com/openai/v1");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new("x", "http://localhost:1234/v1/", "k");
        assert_eq!(provider.base_url, "http://localhost:1234/v1");
    }

    #[test]
    fn body_for_plain_completion() {
        let body = serde_json::to_value(CompletionBody::new(&request(), false)).unwrap();
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["stream"], false);
        assert!(body.get("stream_options").is_none());
        assert!(body.get("tools").is_none());
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "안녕");
    }

    #[test]
    fn stream_body_requests_usage() {
        let body = serde_json::to_value(CompletionBody::new(&request(), true)).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
    }

    #[test]
    fn body_carries_tools_and_tool_traffic() {
        let mut req = request();
        req.tools = vec![ToolDefinition {
            name: "getWeather".into(),
            description: "날씨".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let mut assistant = Message::assistant("");
        assistant.tool_calls = vec![MessageToolCall {
            id: "call_1".into(),
            name: "getWeather".into(),
            arguments: r#"{"location":"서울"}"#.into(),
        }];
        req.messages.push(assistant);
        req.messages.push(Message::tool_result("call_1", "{}"));

        let body = serde_json::to_value(CompletionBody::new(&req, false)).unwrap();
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "getWeather");

        let call = &body["messages"][2]["tool_calls"][0];
        assert_eq!(call["type"], "function");
        assert_eq!(call["function"]["arguments"], r#"{"location":"서울"}"#);

        assert_eq!(body["messages"][3]["role"], "tool");
        assert_eq!(body["messages"][3]["tool_call_id"], "call_1");
        assert!(body["messages"][1].get("tool_call_id").is_none());
    }

    // --- SSE parsing ---

    #[test]
    fn sse_content_delta_is_forwarded() {
        let mut state = SseState::default();
        let chunks = state.feed_line(
            r#"data: {"choices":[{"delta":{"content":"안녕"},"finish_reason":null}]}"#,
            "test",
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content.as_deref(), Some("안녕"));
        assert!(!chunks[0].done);
    }

    #[test]
    fn line_buffer_waits_for_split_characters() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"안녕\"}}]}\r\n".as_bytes();
        let split = line.iter().position(|&b| b >= 0x80).unwrap() + 1;

        let mut lines = LineBuffer::default();
        lines.push(&line[..split]);
        assert_eq!(lines.next_line(), None);

        lines.push(&line[split..]);
        assert_eq!(
            lines.next_line().as_deref(),
            Some("data: {\"choices\":[{\"delta\":{\"content\":\"안녕\"}}]}")
        );
        assert_eq!(lines.next_line(), None);
    }

    #[test]
    fn sse_comments_and_blank_lines_are_ignored() {
        let mut state = SseState::default();
        assert!(state.feed_line("", "test").is_empty());
        assert!(state.feed_line(": keep-alive", "test").is_empty());
        assert!(state.feed_line("data: not json", "test").is_empty());
    }

    #[test]
    fn sse_tool_call_fragments_are_assembled() {
        let mut state = SseState::default();
        state.feed_line(
            r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_w","function":{"name":"getWeather","arguments":""}}]}}]}"#,
            "test",
        );
        state.feed_line(
            r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"location\":"}}]}}]}"#,
            "test",
        );
        state.feed_line(
            r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"서울\"}"}}]}}]}"#,
            "test",
        );
        let chunks = state.feed_line("data: [DONE]", "test");

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].done);
        let tc = &chunks[0].tool_calls[0];
        assert_eq!(tc.id, "call_w");
        assert_eq!(tc.name, "getWeather");
        assert_eq!(tc.arguments, r#"{"location":"서울"}"#);
    }

    #[test]
    fn sse_parallel_tool_calls_keep_index_order() {
        let mut state = SseState::default();
        state.feed_line(
            r#"data: {"choices":[{"delta":{"tool_calls":[{"index":1,"id":"call_b","function":{"name":"getFortune","arguments":"{}"}},{"index":0,"id":"call_a","function":{"name":"getWeather","arguments":"{}"}}]}}]}"#,
            "test",
        );
        let chunk = state.finish(None);
        assert_eq!(chunk.tool_calls.len(), 2);
        assert_eq!(chunk.tool_calls[0].id, "call_a");
        assert_eq!(chunk.tool_calls[1].id, "call_b");
    }

    #[test]
    fn sse_usage_chunk_finishes_stream() {
        let mut state = SseState::default();
        let chunks = state.feed_line(
            r#"data: {"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#,
            "test",
        );
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].done);
        assert_eq!(chunks[0].usage.unwrap().total_tokens, 15);
    }

    // --- HTTP ---

    #[tokio::test]
    async fn rate_limit_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("test", server.uri(), "k");
        let err = provider.complete(request()).await.err().unwrap();
        assert!(matches!(
            err,
            ProviderError::RateLimited {
                retry_after_secs: 12
            }
        ));
    }

    #[tokio::test]
    async fn empty_choices_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"model": "m", "choices": []})),
            )
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("test", server.uri(), "k");
        let err = provider.complete(request()).await.err().unwrap();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn complete_parses_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer gsk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "test-model",
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "getDateTime", "arguments": "{}"}
                        }]
                    }
                }],
                "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
            })))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("test", server.uri(), "gsk-test");
        let response = provider.complete(request()).await.unwrap();
        assert_eq!(response.message.tool_calls.len(), 1);
        assert_eq!(response.message.tool_calls[0].name, "getDateTime");
        assert_eq!(response.usage.unwrap().total_tokens, 5);
    }

    #[tokio::test]
    async fn unauthorized_maps_to_authentication_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("test", server.uri(), "bad");
        let err = provider.stream(request()).await.err().unwrap();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn server_error_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("test", server.uri(), "k");
        match provider.complete(request()).await {
            Err(ProviderError::ApiError {
                status_code,
                message,
            }) => {
                assert_eq!(status_code, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_forwards_text_then_done() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"오늘은 \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"맑아요\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("test", server.uri(), "k");
        let mut rx = provider.stream(request()).await.unwrap();

        let mut text = String::new();
        let mut saw_done = false;
        while let Some(chunk) = rx.recv().await {
            let chunk = chunk.unwrap();
            if let Some(c) = chunk.content {
                text.push_str(&c);
            }
            saw_done |= chunk.done;
        }
        assert_eq!(text, "오늘은 맑아요");
        assert!(saw_done);
    }

    /// Serves one SSE body as two chunked-encoding parts, the first ending
    /// one byte into `안`.
    async fn split_body_server() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
            }
            // drain the JSON body; it is never inspected
            tokio::time::sleep(Duration::from_millis(50)).await;
            while let Ok(n) = socket.try_read(&mut buf) {
                if n == 0 {
                    break;
                }
            }

            let body = "data: {\"choices\":[{\"delta\":{\"content\":\"안녕\"}}]}\n\ndata: [DONE]\n\n"
                .as_bytes();
            let split = body.iter().position(|&b| b >= 0x80).unwrap() + 1;

            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\n\
                      transfer-encoding: chunked\r\nconnection: close\r\n\r\n",
                )
                .await
                .unwrap();
            for part in [&body[..split], &body[split..]] {
                socket
                    .write_all(format!("{:x}\r\n", part.len()).as_bytes())
                    .await
                    .unwrap();
                socket.write_all(part).await.unwrap();
                socket.write_all(b"\r\n").await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            socket.write_all(b"0\r\n\r\n").await.unwrap();
            socket.flush().await.unwrap();
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn stream_keeps_characters_split_across_network_chunks() {
        let base_url = split_body_server().await;
        let provider = OpenAiCompatProvider::new("test", base_url, "k");
        let mut rx = provider.stream(request()).await.unwrap();

        let mut text = String::new();
        while let Some(chunk) = rx.recv().await {
            if let Some(c) = chunk.unwrap().content {
                text.push_str(&c);
            }
        }
        assert_eq!(text, "안녕");
    }
}
