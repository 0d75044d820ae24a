use crate::error::{JudgeError, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// A multimodal model that answers a text prompt about attached images.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send `prompt` with `images` attached in order and return the model's
    /// free-text reply.
    async fn complete(&self, prompt: &str, images: &[&[u8]]) -> Result<String>;
}

/// Connection settings for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// Base URL; `/chat/completions` is appended.
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            request_timeout_secs: 60,
            max_tokens: 1000,
            temperature: 0.2,
        }
    }
}

pub struct ChatCompletionsModel {
    client: Client,
    completions_url: Url,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f64,
}

impl ChatCompletionsModel {
    pub fn new(config: JudgeConfig) -> Result<Self> {
        let completions_url = completions_url(&config.endpoint)?;
        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));

        let client = Client::builder()
            .user_agent(concat!("Fidelity/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .build()?;

        Ok(Self {
            client,
            completions_url,
            model: config.model,
            api_key: config.api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn completions_url(&self) -> &Url {
        &self.completions_url
    }

    fn request_body(&self, prompt: &str, images: &[&[u8]]) -> Value {
        let mut content = vec![json!({ "type": "text", "text": prompt })];
        for image in images {
            content.push(json!({
                "type": "image_url",
                "image_url": {
                    "url": data_url(image),
                    "detail": "high",
                }
            }));
        }

        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        })
    }
}

#[async_trait]
impl VisionModel for ChatCompletionsModel {
    async fn complete(&self, prompt: &str, images: &[&[u8]]) -> Result<String> {
        info!(
            "Requesting judgement from {} with {} image(s)",
            self.model,
            images.len()
        );

        let body = self.request_body(prompt, images);
        let mut request = self.client.post(self.completions_url.clone()).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        debug!("Model answered HTTP {} in {:?}", status.as_u16(), start.elapsed());

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Model request rejected with HTTP {}", status.as_u16());
            return Err(JudgeError::Status {
                code: status.as_u16(),
                body: excerpt(&text, 512),
            });
        }

        let reply: Value = response.json().await?;
        reply["choices"][0]["message"]["content"]
            .as_str()
            .filter(|content| !content.trim().is_empty())
            .map(str::to_string)
            .ok_or(JudgeError::EmptyResponse)
    }
}

fn completions_url(endpoint: &str) -> Result<Url> {
    let joined = format!("{}/chat/completions", endpoint.trim_end_matches('/'));
    let url = Url::parse(&joined)
        .map_err(|e| JudgeError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(JudgeError::InvalidEndpoint(format!(
            "{}: unsupported scheme '{}'",
            endpoint, other
        ))),
    }
}

fn data_url(image: &[u8]) -> String {
    format!("data:{};base64,{}", media_type(image), STANDARD.encode(image))
}

fn media_type(image: &[u8]) -> &'static str {
    if image.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if image.starts_with(b"RIFF") && image.get(8..12) == Some(&b"WEBP"[..]) {
        "image/webp"
    } else {
        "image/png"
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn config_for(server: &MockServer) -> JudgeConfig {
        JudgeConfig {
            endpoint: format!("{}/v1", server.uri()),
            request_timeout_secs: 5,
            ..JudgeConfig::default()
        }
    }

    fn completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
    }

    #[tokio::test]
    async fn test_complete_returns_message_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "max_tokens": 1000, "temperature": 0.2 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"spacing\": 7}")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let model = ChatCompletionsModel::new(config_for(&mock_server))
            .unwrap()
            .with_api_key("test-key".to_string());

        let reply = model.complete("rate these", &[PNG_MAGIC, PNG_MAGIC]).await.unwrap();
        assert_eq!(reply, "{\"spacing\": 7}");
    }

    #[tokio::test]
    async fn test_request_carries_prompt_and_images_in_order() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .mount(&mock_server)
            .await;

        let model = ChatCompletionsModel::new(config_for(&mock_server))
            .unwrap()
            .with_model("vision-test".to_string());
        let jpeg: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];
        model.complete("the rubric", &[PNG_MAGIC, jpeg]).await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: Value = requests[0].body_json().unwrap();

        assert_eq!(body["model"], "vision-test");
        let content = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 3);
        assert_eq!(content[0]["text"], "the rubric");
        assert!(
            content[1]["image_url"]["url"]
                .as_str()
                .unwrap()
                .starts_with("data:image/png;base64,")
        );
        assert!(
            content[2]["image_url"]["url"]
                .as_str()
                .unwrap()
                .starts_with("data:image/jpeg;base64,")
        );
        assert_eq!(content[1]["image_url"]["detail"], "high");
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&mock_server)
            .await;

        let model = ChatCompletionsModel::new(config_for(&mock_server)).unwrap();
        let err = model.complete("rubric", &[PNG_MAGIC]).await.unwrap_err();

        match err {
            JudgeError::Status { code, body } => {
                assert_eq!(code, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_content_is_empty_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&mock_server)
            .await;

        let model = ChatCompletionsModel::new(config_for(&mock_server)).unwrap();
        let err = model.complete("rubric", &[PNG_MAGIC]).await.unwrap_err();
        assert!(matches!(err, JudgeError::EmptyResponse));
    }

    #[test]
    fn test_completions_url_joins_endpoint() {
        let url = completions_url("https://models.example.com/v1/").unwrap();
        assert_eq!(url.as_str(), "https://models.example.com/v1/chat/completions");
    }

    #[test]
    fn test_completions_url_rejects_bad_endpoints() {
        assert!(matches!(
            completions_url("not a url"),
            Err(JudgeError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            completions_url("ftp://models.example.com"),
            Err(JudgeError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_excerpt_truncates_long_bodies() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdefghij", 4), "abcd...");
    }
}
