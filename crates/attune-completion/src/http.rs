//! HTTP implementation of the chat backend.
//!
//! Wire contract: `POST {base}/chat` with `{"message": prompt}`; the
//! service answers `{"message": {"content": …, "role": …}}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::backend::{ChatBackend, ChatReply};
use crate::errors::CompletionError;

/// Chat backend over HTTP.
pub struct HttpChatBackend {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

impl HttpChatBackend {
    /// Backend talking to the service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Backend with a shared HTTP client.
    #[must_use]
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            let _ = base_url.pop();
        }
        Self { base_url, client }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    #[instrument(skip_all, fields(url = %self.chat_url()))]
    async fn chat(&self, prompt: &str) -> Result<ChatReply, CompletionError> {
        debug!(prompt_len = prompt.len(), "sending chat request");

        let response = self
            .client
            .post(self.chat_url())
            .json(&ChatRequest { message: prompt })
            .send()
            .await
            .map_err(CompletionError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                body.trim().to_string()
            };
            error!(status = status.as_u16(), "chat endpoint returned an error");
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;
        Ok(body.message)
    }

    async fn probe(&self) -> Result<(), CompletionError> {
        // Any HTTP answer, error statuses included, proves the service is
        // reachable; only transport failures mark it unavailable.
        let response = self
            .client
            .get(self.base_url.as_str())
            .send()
            .await
            .map_err(|error| CompletionError::Unavailable(error.to_string()))?;
        debug!(status = response.status().as_u16(), "chat service probe answered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn server_replying(content: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"content": content, "role": "assistant"}
            })))
            .mount(&server)
            .await;
        server
    }

    // ── chat ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn chat_posts_the_message_and_parses_the_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(json!({"message": "hello there"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"content": "hi!", "role": "assistant"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HttpChatBackend::new(server.uri());
        let reply = backend.chat("hello there").await.unwrap();
        assert_eq!(reply, ChatReply::assistant("hi!"));
    }

    #[tokio::test]
    async fn trailing_slashes_in_the_base_url_are_tolerated() {
        let server = server_replying("ok").await;
        let backend = HttpChatBackend::new(format!("{}///", server.uri()));
        let reply = backend.chat("hello").await.unwrap();
        assert_eq!(reply.content, "ok");
    }

    #[tokio::test]
    async fn error_status_maps_to_api_error_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
            .mount(&server)
            .await;

        let backend = HttpChatBackend::new(server.uri());
        let error = backend.chat("hello").await.unwrap_err();
        assert_matches!(
            error,
            CompletionError::Api { status: 500, ref message } if message == "backend exploded"
        );
    }

    #[tokio::test]
    async fn empty_error_body_falls_back_to_the_status_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let backend = HttpChatBackend::new(server.uri());
        let error = backend.chat("hello").await.unwrap_err();
        assert_matches!(
            error,
            CompletionError::Api { status: 503, ref message } if message == "Service Unavailable"
        );
    }

    #[tokio::test]
    async fn malformed_success_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
            .mount(&server)
            .await;

        let backend = HttpChatBackend::new(server.uri());
        assert_matches!(
            backend.chat("hello").await,
            Err(CompletionError::MalformedResponse(_))
        );
    }

    // ── probe ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn probe_counts_any_http_answer_as_reachable() {
        // No GET mock mounted: wiremock answers 404, which still proves
        // the service is there.
        let server = MockServer::start().await;
        let backend = HttpChatBackend::new(server.uri());
        assert!(backend.probe().await.is_ok());
    }

    #[tokio::test]
    async fn probe_reports_a_dead_service_unavailable() {
        // A builder-made server is not pooled, so dropping it really
        // shuts the listener down instead of recycling it.
        let server = MockServer::builder().start().await;
        let uri = server.uri();
        drop(server);

        let backend = HttpChatBackend::new(uri);
        assert_matches!(
            backend.probe().await,
            Err(CompletionError::Unavailable(_))
        );
    }
}
