//! HTTP gateway client backed by reqwest

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{AdminPath, Create, Delete, GatewayClient, GatewayError, Lookup};
use crate::metrics::{CallOutcome, Metrics};

/// Maximum error body echoed into `UnexpectedStatus`
const MAX_ERROR_BODY: usize = 512;

/// Admin API client over HTTP
///
/// One pooled client is shared by all calls; the configured timeout bounds
/// each request including the body read.
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    client: reqwest::Client,
    base_url: String,
    metrics: Arc<Metrics>,
}

impl HttpGatewayClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::Transport(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            metrics,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &AdminPath) -> String {
        format!("{}{}", self.base_url, path.to_path())
    }

    async fn send(
        &self,
        method: Method,
        path: &AdminPath,
        body: Option<&Value>,
    ) -> Result<Response, GatewayError> {
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(classify)?;
        debug!(
            method = %method,
            endpoint = path.endpoint(),
            status = response.status().as_u16(),
            "Gateway call"
        );
        Ok(response)
    }

    fn record<T>(
        &self,
        path: &AdminPath,
        method: &'static str,
        started: Instant,
        result: &Result<T, GatewayError>,
        outcome: impl Fn(&T) -> CallOutcome,
    ) {
        let outcome = result.as_ref().map_or(CallOutcome::Error, outcome);
        self.metrics
            .record_call(path.endpoint(), method, outcome, started.elapsed());
    }
}

/// Map a reqwest failure onto the gateway taxonomy
fn classify(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(err.to_string())
    } else if err.is_connect() {
        GatewayError::Unreachable(err.to_string())
    } else {
        GatewayError::Transport(err.to_string())
    }
}

async fn read_json(response: Response) -> Result<Value, GatewayError> {
    let bytes = response.bytes().await.map_err(classify)?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))
}

async fn unexpected(response: Response) -> GatewayError {
    let status = response.status().as_u16();
    let mut body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("<failed to read body: {}>", e),
    };
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    GatewayError::UnexpectedStatus { status, body }
}

impl HttpGatewayClient {
    async fn try_lookup(&self, path: &AdminPath) -> Result<Lookup, GatewayError> {
        let response = self.send(Method::GET, path, None).await?;
        match response.status() {
            StatusCode::OK => Ok(Lookup::Found(read_json(response).await?)),
            StatusCode::NOT_FOUND => Ok(Lookup::NotFound),
            _ => Err(unexpected(response).await),
        }
    }

    async fn try_create(&self, path: &AdminPath, body: &Value) -> Result<Create, GatewayError> {
        let response = self.send(Method::POST, path, Some(body)).await?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(Create::Created(read_json(response).await?)),
            StatusCode::CONFLICT => Ok(Create::Conflict),
            _ => Err(unexpected(response).await),
        }
    }

    async fn try_delete(&self, path: &AdminPath) -> Result<Delete, GatewayError> {
        let response = self.send(Method::DELETE, path, None).await?;
        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(Delete::Deleted),
            StatusCode::NOT_FOUND => Ok(Delete::NotFound),
            _ => Err(unexpected(response).await),
        }
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn lookup(&self, path: &AdminPath) -> Result<Lookup, GatewayError> {
        let started = Instant::now();
        let result = self.try_lookup(path).await;
        self.record(path, "GET", started, &result, Lookup::call_outcome);
        result
    }

    async fn create(&self, path: &AdminPath, body: &Value) -> Result<Create, GatewayError> {
        let started = Instant::now();
        let result = self.try_create(path, body).await;
        self.record(path, "POST", started, &result, Create::call_outcome);
        result
    }

    async fn delete(&self, path: &AdminPath) -> Result<Delete, GatewayError> {
        let started = Instant::now();
        let result = self.try_delete(path).await;
        self.record(path, "DELETE", started, &result, Delete::call_outcome);
        result
    }
}
