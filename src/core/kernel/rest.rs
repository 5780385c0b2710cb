use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde_json::Value;
use tracing::{instrument, trace};

use crate::core::config::Credentials;
use crate::core::env::EnvironmentConfig;
use crate::core::errors::ClientError;
use crate::core::kernel::signer::RequestSigner;
use crate::core::params::Params;
use crate::core::time::now_millis;

const API_KEY_HEADER: &str = "X-MBX-APIKEY";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("binance-fapi/", env!("CARGO_PKG_VERSION"));

/// Descriptor for one outgoing request.
///
/// Param ordering is significant: the signature is computed over the exact
/// encoded string that is transmitted, so [`Params`] never reorders keys.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub params: Params,
    pub sign: bool,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Params::new(),
            sign: false,
        }
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn signed(mut self) -> Self {
        self.sign = true;
        self
    }
}

/// Transport seam; lets the endpoint wrapper run against a mock in tests.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Send the request and decode the JSON response into a generic value.
    async fn send(&self, request: Request) -> Result<Value, ClientError>;
}

/// Where the encoded (and possibly signed) payload travels.
///
/// Exactly one of query or body is ever signed per request; requests with
/// neither (e.g. `/listenKey`) are sent with the API-key header alone.
#[derive(Debug, PartialEq, Eq)]
enum Payload {
    Query(String),
    Body(String),
    None,
}

fn encode_payload(request: &Request, signer: &RequestSigner) -> Result<Payload, ClientError> {
    let encoded = request.params.encode();
    if encoded.is_empty() {
        return Ok(Payload::None);
    }

    let payload = if request.sign {
        signer.attach(&encoded)?
    } else {
        encoded
    };

    if request.method == Method::GET || request.method == Method::DELETE {
        Ok(Payload::Query(payload))
    } else {
        Ok(Payload::Body(payload))
    }
}

/// reqwest-backed implementation of [`RestClient`].
///
/// Synchronous per call and stateless besides the immutable resolved config
/// and credentials, so concurrent calls from multiple tasks are safe.
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    signer: RequestSigner,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    pub fn new(config: &EnvironmentConfig, credentials: Credentials) -> Result<Self, ClientError> {
        Self::with_timeout(config, credentials, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Build a transport with an explicit HTTP timeout. No call blocks
    /// beyond this bound.
    pub fn with_timeout(
        config: &EnvironmentConfig,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(credentials.api_key())
            .map_err(|e| ClientError::Auth(format!("invalid API key: {}", e)))?;
        api_key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.http_base_url.clone(),
            signer: RequestSigner::new(credentials.secret_key().clone()),
        })
    }

    #[instrument(skip(self, response), fields(status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, ClientError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(format!("failed to read response body: {}", e)))?;

        trace!("response body: {}", body);

        if !status.is_success() {
            return Err(ClientError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RestClient for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path, signed = request.sign))]
    async fn send(&self, request: Request) -> Result<Value, ClientError> {
        let mut request = request;
        // The timestamp belongs to the moment of sending, not of building;
        // the exchange rejects requests that drift from server time.
        if request.sign {
            request.params.insert("timestamp", now_millis()?);
        }

        let mut url = format!("{}{}", self.base_url, request.path);
        let builder = match encode_payload(&request, &self.signer)? {
            Payload::Query(query) => {
                url = format!("{}?{}", url, query);
                self.client.request(request.method.clone(), &url)
            }
            Payload::Body(body) => self.client.request(request.method.clone(), &url).body(body),
            Payload::None => self.client.request(request.method.clone(), &url),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("request failed: {}", e)))?;

        self.handle_response(response).await
    }
}
