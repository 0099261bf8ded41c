use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{encode_params, Signer};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{instrument, trace, warn};

/// REST client trait for making HTTP requests
///
/// Parameters are ordered pairs. For authenticated calls the signer sees them
/// in that order, and the exact encoded string it signed is what gets sent:
/// as the query string for GET/DELETE, as a form body for POST.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// GET with the encoded parameters in the query string
    async fn get_json<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        authenticated: bool,
    ) -> Result<T, ExchangeError>;

    /// POST with the encoded parameters as an `application/x-www-form-urlencoded` body
    async fn post_form_json<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        authenticated: bool,
    ) -> Result<T, ExchangeError>;

    /// DELETE with the encoded parameters in the query string
    async fn delete_json<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        authenticated: bool,
    ) -> Result<T, ExchangeError>;

    /// POST a JSON document. Venues that sign inside the body build it themselves.
    async fn post_body_json<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, ExchangeError>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
    /// Client-side request budget; requests wait for a slot, they are never retried
    pub requests_per_second: Option<NonZeroU32>,
}

impl RestClientConfig {
    /// Create a new configuration
    ///
    /// # Arguments
    /// * `base_url` - Base URL for the API
    /// * `exchange_name` - Name of the exchange
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            exchange_name,
            timeout_seconds: 30,
            user_agent: format!("perpgate/{}", env!("CARGO_PKG_VERSION")),
            requests_per_second: None,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_rate_limit(mut self, requests_per_second: NonZeroU32) -> Self {
        self.requests_per_second = Some(requests_per_second);
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Set the signer for authenticated requests
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                ExchangeError::NetworkError(format!("Failed to build HTTP client: {}", e))
            })?;

        let limiter = self
            .config
            .requests_per_second
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));

        Ok(ReqwestRest {
            client,
            config: self.config,
            signer: self.signer,
            limiter,
        })
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("signer", &self.signer.as_ref().map(|s| s.identity()))
            .field("rate_limited", &self.limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Venue error body, e.g. `{"code":-2019,"msg":"Margin is insufficient."}`
#[derive(Debug, Deserialize)]
struct VenueErrorBody {
    code: i64,
    msg: String,
}

impl ReqwestRest {
    pub fn new(
        base_url: String,
        exchange_name: String,
        signer: Option<Arc<dyn Signer>>,
    ) -> Result<Self, ExchangeError> {
        let config = RestClientConfig::new(base_url, exchange_name);
        let mut builder = RestClientBuilder::new(config);
        if let Some(signer) = signer {
            builder = builder.with_signer(signer);
        }
        builder.build()
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// Get the current timestamp in milliseconds
    fn get_timestamp() -> Result<u64, ExchangeError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .map_err(|e| ExchangeError::Other(format!("Failed to get timestamp: {}", e)))
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url, endpoint)
    }

    /// Handle the response and extract JSON
    #[instrument(skip(self, response), fields(exchange = %self.config.exchange_name, status = %response.status()))]
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ExchangeError> {
        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            ExchangeError::NetworkError(format!("Failed to read response body: {}", e))
        })?;

        trace!("Response body: {}", response_text);

        if status.is_success() {
            return serde_json::from_str(&response_text).map_err(|e| {
                ExchangeError::DeserializationError(format!(
                    "Failed to parse JSON response: {}",
                    e
                ))
            });
        }

        if let Ok(body) = serde_json::from_str::<VenueErrorBody>(&response_text) {
            warn!(code = body.code, message = %body.msg, "Request rejected by venue");
            return Err(ExchangeError::ExchangeRejected {
                code: Some(body.code),
                message: body.msg,
            });
        }

        Err(ExchangeError::ApiError {
            code: i32::from(status.as_u16()),
            message: response_text,
        })
    }

    /// Encode, optionally sign, and send a parameterised request
    #[instrument(skip(self, params), fields(exchange = %self.config.exchange_name, method = %method, endpoint = %endpoint, param_count = params.len()))]
    async fn make_request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(String, String)],
        authenticated: bool,
    ) -> Result<T, ExchangeError> {
        let mut headers = Vec::new();
        let encoded = if authenticated {
            let signer = self.signer.as_ref().ok_or_else(|| {
                ExchangeError::credential("Authentication required but no credentials configured")
            })?;
            let envelope =
                signer.sign_request(method.as_str(), endpoint, params, Self::get_timestamp()?)?;
            headers = envelope.headers.clone();
            envelope.encoded()
        } else {
            encode_params(params)
        };

        let mut request = if method == Method::POST {
            self.client
                .request(method, self.build_url(endpoint))
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(encoded)
        } else {
            let url = if encoded.is_empty() {
                self.build_url(endpoint)
            } else {
                format!("{}?{}", self.build_url(endpoint), encoded)
            };
            self.client.request(method, url)
        };

        for (key, value) in headers {
            request = request.header(key, value);
        }

        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ExchangeError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExchangeError::NetworkError(format!("Request failed: {}", e)))?;

        self.handle_response(response).await
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    async fn get_json<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        authenticated: bool,
    ) -> Result<T, ExchangeError> {
        self.make_request(Method::GET, endpoint, params, authenticated)
            .await
    }

    async fn post_form_json<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        authenticated: bool,
    ) -> Result<T, ExchangeError> {
        self.make_request(Method::POST, endpoint, params, authenticated)
            .await
    }

    async fn delete_json<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        authenticated: bool,
    ) -> Result<T, ExchangeError> {
        self.make_request(Method::DELETE, endpoint, params, authenticated)
            .await
    }

    #[instrument(skip(self, body), fields(exchange = %self.config.exchange_name, endpoint = %endpoint))]
    async fn post_body_json<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, ExchangeError> {
        let body_bytes = serde_json::to_vec(body).map_err(|e| {
            ExchangeError::SerializationError(format!("Failed to serialize request body: {}", e))
        })?;

        let request = self
            .client
            .post(self.build_url(endpoint))
            .header("Content-Type", "application/json")
            .body(body_bytes);

        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kernel::signer::{param, HmacSigner};
    use mockito::Matcher;
    use serde_json::json;

    fn client(server: &mockito::ServerGuard, signer: Option<Arc<dyn Signer>>) -> ReqwestRest {
        ReqwestRest::new(server.url(), "test".to_string(), signer).unwrap()
    }

    #[tokio::test]
    async fn test_public_get_keeps_parameter_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fapi/v1/ticker/price")
            .match_query(Matcher::Exact("symbol=BTCUSDT&limit=5".to_string()))
            .with_status(200)
            .with_body(r#"{"symbol":"BTCUSDT","price":"50000.10"}"#)
            .create_async()
            .await;

        let rest = client(&server, None);
        let value: Value = rest
            .get_json(
                "/fapi/v1/ticker/price",
                &[param("symbol", "BTCUSDT"), param("limit", 5)],
                false,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(value["price"], "50000.10");
    }

    #[tokio::test]
    async fn test_signed_post_sends_signed_string_as_form_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/fapi/v1/order")
            .match_header("X-MBX-APIKEY", "key")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::Regex(
                r"^symbol=BTCUSDT&side=BUY&recvWindow=5000&timestamp=\d+&signature=[0-9a-f]{64}$"
                    .to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"orderId":1}"#)
            .create_async()
            .await;

        let signer = HmacSigner::new("key".to_string(), "secret".to_string()).unwrap();
        let rest = client(&server, Some(Arc::new(signer)));
        let value: Value = rest
            .post_form_json(
                "/fapi/v1/order",
                &[param("symbol", "BTCUSDT"), param("side", "BUY")],
                true,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(value["orderId"], 1);
    }

    #[tokio::test]
    async fn test_authenticated_call_without_signer_fails_before_sending() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let rest = client(&server, None);
        let result: Result<Value, _> = rest.get_json("/fapi/v2/balance", &[], true).await;

        assert!(matches!(result, Err(ExchangeError::CredentialError(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_venue_error_body_becomes_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/fapi/v1/order")
            .with_status(400)
            .with_body(r#"{"code":-2019,"msg":"Margin is insufficient."}"#)
            .create_async()
            .await;

        let rest = client(&server, None);
        let result: Result<Value, _> = rest.post_form_json("/fapi/v1/order", &[], false).await;

        match result {
            Err(ExchangeError::ExchangeRejected { code, message }) => {
                assert_eq!(code, Some(-2019));
                assert_eq!(message, "Margin is insufficient.");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unstructured_error_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/info")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let rest = client(&server, None);
        let result: Result<Value, _> = rest.get_json("/info", &[], false).await;

        assert!(matches!(
            result,
            Err(ExchangeError::ApiError { code: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_json_body_post() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/info")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"type": "allMids"})))
            .with_status(200)
            .with_body(r#"{"BTC":"50000.5"}"#)
            .create_async()
            .await;

        let rest = client(&server, None);
        let mids: std::collections::HashMap<String, String> = rest
            .post_body_json("/info", &json!({"type": "allMids"}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(mids["BTC"], "50000.5");
    }
}
