use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatBackend, ChatMessage, CompletionRequest, LlmError, LlmResult};
use crate::config::BackendSettings;

/// Per-attempt deadline covering connect, send, and body read.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// How much of an error body is kept for diagnostics.
const ERROR_BODY_LIMIT: usize = 512;

/// Chat backend speaking the OpenAI-compatible `chat/completions` wire
/// format, used by Qwen/DashScope-style providers.
#[derive(Clone)]
pub struct HttpChatBackend {
    client: Client,
    url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatCompletionPayload<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HttpChatBackend {
    /// Build a client for one configured backend endpoint.
    pub fn new(settings: &BackendSettings) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| LlmError::Transport {
                message: "failed to build HTTP client".into(),
                source: Box::new(source),
            })?;

        Ok(Self {
            client,
            url: settings.url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    async fn send(
        client: Client,
        url: String,
        api_key: String,
        model: String,
        request: CompletionRequest,
    ) -> LlmResult<String> {
        let payload = ChatCompletionPayload {
            model: &model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        let response = client
            .post(&url)
            .bearer_auth(&api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|source| {
                if source.is_timeout() {
                    LlmError::Timeout(REQUEST_TIMEOUT)
                } else {
                    LlmError::Transport {
                        message: format!("request to {url} failed"),
                        source: Box::new(source),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(ERROR_BODY_LIMIT);
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|source| LlmError::Transport {
                    message: "failed to read completion body".into(),
                    source: Box::new(source),
                })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::MalformedResponse)
    }
}

impl ChatBackend for HttpChatBackend {
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'static, LlmResult<String>> {
        let client = self.client.clone();
        let url = self.url.clone();
        let api_key = self.api_key.clone();
        let model = self.model.clone();
        Box::pin(Self::send(client, url, api_key, model, request))
    }
}
