use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderServiceError {
    /// The service answered with a structured `{ "error": ... }` body.
    #[error("{0}")]
    Service(String),
    #[error("order service returned status {0}")]
    Status(u16),
    #[error("order service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed order service response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait OrderService: Send + Sync {
    async fn place_order(
        &self,
        user_id: &str,
        product: Option<&str>,
        quantity: Option<&Value>,
    ) -> Result<Value, OrderServiceError>;

    async fn cancel_order(
        &self,
        user_id: &str,
        order_id: Option<&Value>,
    ) -> Result<Value, OrderServiceError>;

    async fn view_orders(&self, user_id: &str) -> Result<Value, OrderServiceError>;
}

pub struct HttpOrderService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOrderService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, OrderServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Value, OrderServiceError> {
        let response = request.send().await?;
        read_body(response).await
    }
}

async fn read_body(response: Response) -> Result<Value, OrderServiceError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&body).ok().and_then(|value| {
            value
                .get("error")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .map(str::to_string)
        });
        return Err(match message {
            Some(message) => OrderServiceError::Service(message),
            None => OrderServiceError::Status(status.as_u16()),
        });
    }

    serde_json::from_str(&body).map_err(|err| OrderServiceError::Malformed(err.to_string()))
}

#[async_trait]
impl OrderService for HttpOrderService {
    async fn place_order(
        &self,
        user_id: &str,
        product: Option<&str>,
        quantity: Option<&Value>,
    ) -> Result<Value, OrderServiceError> {
        let request = self.client.post(self.url("place_order")).json(&json!({
            "user_id": user_id,
            "product": product,
            "quantity": quantity,
        }));
        self.execute(request).await
    }

    async fn cancel_order(
        &self,
        user_id: &str,
        order_id: Option<&Value>,
    ) -> Result<Value, OrderServiceError> {
        let request = self.client.post(self.url("cancel_order")).json(&json!({
            "user_id": user_id,
            "order_id": order_id,
        }));
        self.execute(request).await
    }

    async fn view_orders(&self, user_id: &str) -> Result<Value, OrderServiceError> {
        let request = self
            .client
            .get(self.url("view_orders"))
            .query(&[("user_id", user_id)]);
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> HttpOrderService {
        HttpOrderService::new(&format!("{}/api", server.uri()), Duration::from_secs(5))
            .expect("client")
    }

    #[tokio::test]
    async fn place_order_forwards_values_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/place_order"))
            .and(body_json(json!({ "user_id": "U1", "product": "", "quantity": 0 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "order_id": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        let quantity = json!(0);
        let value = service(&server)
            .place_order("U1", Some(""), Some(&quantity))
            .await
            .unwrap();
        assert_eq!(value, json!({ "order_id": 1 }));
    }

    #[tokio::test]
    async fn structured_error_body_becomes_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cancel_order"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "error": "Order not found" })),
            )
            .mount(&server)
            .await;

        let order_id = json!("99");
        let err = service(&server)
            .cancel_order("U1", Some(&order_id))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderServiceError::Service(ref msg) if msg == "Order not found"));
    }

    #[tokio::test]
    async fn unstructured_error_body_becomes_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/view_orders"))
            .and(query_param("user_id", "U1"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = service(&server).view_orders("U1").await.unwrap_err();
        assert!(matches!(err, OrderServiceError::Status(502)));
    }

    #[tokio::test]
    async fn empty_error_message_becomes_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/place_order"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "" })))
            .mount(&server)
            .await;

        let quantity = json!(1);
        let err = service(&server)
            .place_order("U1", Some("x"), Some(&quantity))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderServiceError::Status(400)));
    }

    #[tokio::test]
    async fn non_json_success_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/view_orders"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = service(&server).view_orders("U1").await.unwrap_err();
        assert!(matches!(err, OrderServiceError::Malformed(_)));
    }
}
