use crate::api::{ApiClient, ApiError, ApiResponse};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::time::Duration;

/// [`ApiClient`] over a pooled `reqwest::Client` that sends the API token on every request.
#[derive(Debug, Clone)]
pub struct ReqwestApiClient {
    client: reqwest::Client,
}

impl ReqwestApiClient {
    pub fn new(token: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(token)
            .map_err(|e| ApiError::Setup(format!("invalid API token header value: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Setup(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ApiClient for ReqwestApiClient {
    async fn get(&self, url: &str) -> Result<ApiResponse, ApiError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client() -> ReqwestApiClient {
        ReqwestApiClient::new("secret-token", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn sends_authorization_header_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/idle/profile"))
            .and(query_param("user", "eq.42"))
            .and(header("authorization", "secret-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{"user": 42}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = test_client()
            .get(&format!("{}/idle/profile?user=eq.42", server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body[0]["user"], 42);
    }

    #[tokio::test]
    async fn non_success_statuses_are_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/idle/loot"))
            .respond_with(ResponseTemplate::new(520).set_body_string("origin down"))
            .mount(&server)
            .await;

        let response = test_client()
            .get(&format!("{}/idle/loot", server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 520);
        assert_eq!(response.body, "origin down");
    }

    #[tokio::test]
    async fn slow_upstream_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;
        let client = ReqwestApiClient::new("t", Duration::from_millis(100)).unwrap();

        let result = client.get(&format!("{}/idle/market", server.uri())).await;

        assert!(matches!(result, Err(ApiError::Transport(_))));
    }

    #[test]
    fn rejects_token_with_control_characters() {
        let result = ReqwestApiClient::new("bad\ntoken", Duration::from_secs(1));
        assert!(matches!(result, Err(ApiError::Setup(_))));
    }
}
