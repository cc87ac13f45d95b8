//! Client for OpenAI-compatible chat-completions endpoints.

use super::{ChatMessage, LanguageModel, ModelRequest, ModelResponse, Role, ToolCall};
use crate::config::ModelConfig;
use crate::errors::ModelError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, instrument};

const MAX_ERROR_BODY: usize = 500;

/// [`LanguageModel`] speaking the `/chat/completions` protocol.
#[derive(Clone)]
pub struct OpenAiChatModel {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    /// Creates a client from model settings.
    ///
    /// A missing API key is allowed so that local endpoints work; hosted
    /// providers will then answer 401.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Configuration`] when the timeout is out of range
    /// or the HTTP client cannot be built.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(
                config
                    .timeout()
                    .map_err(|e| ModelError::Configuration(e.to_string()))?,
            )
            .build()
            .map_err(|e| ModelError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn build_body(&self, request: &ModelRequest) -> Value {
        let model = if request.model.is_empty() {
            &self.model
        } else {
            &request.model
        };

        let mut messages = vec![json!({"role": "system", "content": request.instruction})];
        messages.extend(request.messages.iter().map(encode_message));

        let mut body = json!({
            "model": model,
            "messages": messages,
            "temperature": self.temperature,
        });

        if request.schema.is_some() {
            body["response_format"] = json!({"type": "json_object"});
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.input_schema,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }

        body
    }
}

impl std::fmt::Debug for OpenAiChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatModel")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model, messages = request.messages.len()))]
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        let body = self.build_body(request);
        let started = Instant::now();

        let mut http = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body: String = text.chars().take(MAX_ERROR_BODY).collect();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let mut parsed = decode_response(&text)?;
        parsed.latency_ms = Some(latency_ms);
        if parsed.model.is_empty() {
            parsed.model.clone_from(&self.model);
        }

        debug!(
            latency_ms,
            tokens = parsed.total_tokens(),
            tool_calls = parsed.tool_calls.len(),
            "model responded"
        );
        Ok(parsed)
    }
}

fn encode_message(message: &ChatMessage) -> Value {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    let mut encoded = json!({"role": role, "content": message.content});
    if let Some(ref id) = message.tool_call_id {
        encoded["tool_call_id"] = json!(id);
    }
    if !message.tool_calls.is_empty() {
        let calls: Vec<Value> = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.arguments.to_string(),
                    }
                })
            })
            .collect();
        encoded["tool_calls"] = Value::Array(calls);
    }
    encoded
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Deserialize)]
struct ApiToolCall {
    id: String,
    function: ApiFunction,
}

#[derive(Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

fn decode_response(text: &str) -> Result<ModelResponse, ModelError> {
    let api: ApiResponse =
        serde_json::from_str(text).map_err(|e| ModelError::Decode(e.to_string()))?;

    let choice = api.choices.into_iter().next().ok_or(ModelError::EmptyResponse)?;

    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| {
            let raw = call.function.arguments;
            let arguments = if raw.trim().is_empty() {
                json!({})
            } else {
                serde_json::from_str(&raw).unwrap_or(Value::String(raw))
            };
            ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            }
        })
        .collect();

    let content = choice.message.content.filter(|c| !c.trim().is_empty());
    if content.is_none() && tool_calls.is_empty() {
        return Err(ModelError::EmptyResponse);
    }

    Ok(ModelResponse {
        content,
        tool_calls,
        model: api.model,
        input_tokens: api.usage.as_ref().and_then(|u| u.prompt_tokens),
        output_tokens: api.usage.as_ref().and_then(|u| u.completion_tokens),
        latency_ms: None,
        finish_reason: choice.finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolDefinition;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiChatModel {
        let config = ModelConfig::default()
            .with_base_url(format!("{}/v1/", server.uri()))
            .with_api_key("sk-test");
        OpenAiChatModel::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_json_mode_request_and_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "response_format": {"type": "json_object"},
                "messages": [
                    {"role": "system", "content": "Translate."},
                    {"role": "user", "content": "Bonjour"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4o-mini-2024",
                "choices": [{
                    "message": {"role": "assistant", "content": "{\"en\": \"Hello\"}"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ModelRequest::new("", "Translate.")
            .with_message(ChatMessage::user("Bonjour"))
            .with_schema(json!({"type": "object"}));

        let response = client_for(&server).invoke(&request).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("{\"en\": \"Hello\"}"));
        assert_eq!(response.model, "gpt-4o-mini-2024");
        assert_eq!(response.total_tokens(), 16);
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert!(response.latency_ms.is_some());
    }

    #[tokio::test]
    async fn test_tool_calls_are_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "tools": [{"type": "function", "function": {"name": "fetch_url"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "fetch_url", "arguments": "{\"url\":\"https://example.com\"}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .mount(&server)
            .await;

        let request = ModelRequest::new("gpt-4o-mini", "Summarize.")
            .with_message(ChatMessage::user("https://example.com"))
            .with_tools(vec![ToolDefinition::new("fetch_url")]);

        let response = client_for(&server).invoke(&request).await.unwrap();
        assert!(response.content.is_none());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "fetch_url");
        assert_eq!(response.tool_calls[0].arguments["url"], "https://example.com");
        assert_eq!(response.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .invoke(&ModelRequest::new("", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Status { status: 401, ref body } if body == "invalid api key"));
    }

    #[tokio::test]
    async fn test_transport_error() {
        let config = ModelConfig::default().with_base_url("http://127.0.0.1:1/v1");
        let client = OpenAiChatModel::from_config(&config).unwrap();

        let err = client.invoke(&ModelRequest::new("", "x")).await.unwrap_err();
        assert!(matches!(err, ModelError::Transport(_)));
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(decode_response("not json"), Err(ModelError::Decode(_))));
        assert!(matches!(
            decode_response(r#"{"choices": []}"#),
            Err(ModelError::EmptyResponse)
        ));
        assert!(matches!(
            decode_response(r#"{"choices": [{"message": {"content": "  "}}]}"#),
            Err(ModelError::EmptyResponse)
        ));
    }

    #[test]
    fn test_encode_tool_messages() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "fetch_url".to_string(),
            arguments: json!({"url": "https://example.com"}),
        };
        let assistant = encode_message(&ChatMessage::assistant(None, vec![call]));
        assert_eq!(assistant["content"], Value::Null);
        assert_eq!(
            assistant["tool_calls"][0]["function"]["arguments"],
            "{\"url\":\"https://example.com\"}"
        );

        let result = encode_message(&ChatMessage::tool_result("call_1", "# Example"));
        assert_eq!(result["role"], "tool");
        assert_eq!(result["tool_call_id"], "call_1");
    }
}
