use crate::types::ChatReply;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatTransportError {
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("chat backend returned status {0}")]
    Status(u16),
}

/// Exchanges one user message for the backend's reply.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, message: &str) -> Result<ChatReply, ChatTransportError>;
}

pub struct HttpChatTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChatTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ChatTransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chatbot", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, message: &str) -> Result<ChatReply, ChatTransportError> {
        tracing::debug!(endpoint = %self.endpoint, "chat: sending message");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "message": message }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatTransportError::Status(status.as_u16()));
        }

        let reply = response.json::<ChatReply>().await?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> HttpChatTransport {
        HttpChatTransport::new(&server.uri(), Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn posts_message_and_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chatbot"))
            .and(body_json(json!({ "message": "checkout" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "Taking you there",
                "redirect": "/checkout"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = transport(&server).send("checkout").await.unwrap();
        assert_eq!(reply.response, "Taking you there");
        assert_eq!(reply.redirect.as_deref(), Some("/checkout"));
    }

    #[tokio::test]
    async fn server_error_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chatbot"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = transport(&server).send("hi").await.unwrap_err();
        assert!(matches!(err, ChatTransportError::Status(500)));
    }

    #[tokio::test]
    async fn malformed_body_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chatbot"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = transport(&server).send("hi").await.unwrap_err();
        assert!(matches!(err, ChatTransportError::Request(_)));
    }
}
