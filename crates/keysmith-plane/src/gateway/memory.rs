//! In-memory gateway
//!
//! Mimics the admin API's consumer and JWT credential resources closely
//! enough for the provisioning flows: unique usernames, unique credential
//! keys per consumer, 409 on duplicates, cursor pagination. Data is lost on
//! drop.
//!
//! Artificial latency is applied before state is touched, so concurrent
//! callers interleave the same way they would against a remote service.
//! Queued faults replace the next matching call's result.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use super::{AdminPath, Create, Delete, GatewayClient, GatewayError, Lookup};
use crate::metrics::{CallOutcome, Metrics};

const DEFAULT_PAGE_SIZE: usize = 100;

/// Injected result for the next matching call
#[derive(Debug, Clone)]
pub enum Fault {
    /// 409 on create; an unexpected status elsewhere
    Conflict,
    /// 404 on lookup and delete; an unexpected status on create
    NotFound,
    /// Fail the call outright
    Error(GatewayError),
}

#[derive(Debug, Default)]
struct State {
    /// Consumers keyed by username
    consumers: BTreeMap<String, Value>,
    /// Credential records keyed by username, in creation order
    credentials: BTreeMap<String, Vec<Value>>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:06}", prefix, self.next_id)
    }
}

/// In-process gateway admin API
#[derive(Debug)]
pub struct MemoryGateway {
    state: Mutex<State>,
    faults: Mutex<VecDeque<(&'static str, &'static str, Fault)>>,
    latency: Duration,
    page_size: usize,
    metrics: Arc<Metrics>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            faults: Mutex::new(VecDeque::new()),
            latency: Duration::ZERO,
            page_size: DEFAULT_PAGE_SIZE,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Items per collection page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Queue a fault for the next call to `endpoint` with `method`
    ///
    /// `endpoint` is a logical label such as `/consumers/{username}/jwt`.
    pub fn inject_fault(&self, endpoint: &'static str, method: &'static str, fault: Fault) {
        self.faults.lock().push_back((endpoint, method, fault));
    }

    /// Store an arbitrary credential record, bypassing validation
    ///
    /// Returns false if the consumer does not exist.
    pub fn insert_raw_credential(&self, username: &str, raw: Value) -> bool {
        let mut state = self.state.lock();
        if !state.consumers.contains_key(username) {
            return false;
        }
        state
            .credentials
            .entry(username.to_string())
            .or_default()
            .push(raw);
        true
    }

    pub fn consumer_count(&self) -> usize {
        self.state.lock().consumers.len()
    }

    /// Keys of a consumer's credentials, in creation order
    pub fn credential_keys(&self, username: &str) -> Vec<String> {
        self.state
            .lock()
            .credentials
            .get(username)
            .map(|creds| {
                creds
                    .iter()
                    .filter_map(|c| c.get("key").and_then(Value::as_str).map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn take_fault(&self, endpoint: &str, method: &str) -> Option<Fault> {
        let mut faults = self.faults.lock();
        let index = faults
            .iter()
            .position(|(e, m, _)| *e == endpoint && *m == method)?;
        faults.remove(index).map(|(_, _, fault)| fault)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn page(&self, items: &[Value], offset: Option<&str>, base: &str) -> Value {
        let start = offset
            .and_then(|o| o.parse::<usize>().ok())
            .unwrap_or(0)
            .min(items.len());
        let end = (start + self.page_size).min(items.len());

        let mut page = json!({ "data": &items[start..end], "next": Value::Null });
        if end < items.len() {
            page["next"] = json!(format!("{}?offset={}", base, end));
            page["offset"] = json!(end.to_string());
        }
        page
    }

    fn lookup_now(&self, path: &AdminPath) -> Result<Lookup, GatewayError> {
        let state = self.state.lock();
        let found = match path {
            AdminPath::Consumers { offset } => {
                let consumers: Vec<Value> = state.consumers.values().cloned().collect();
                Some(self.page(&consumers, offset.as_deref(), "/consumers"))
            }
            AdminPath::Consumer(username) => state.consumers.get(username).cloned(),
            AdminPath::Credentials { username, offset } => {
                state.consumers.get(username).map(|_| {
                    let creds = state.credentials.get(username).cloned().unwrap_or_default();
                    self.page(
                        &creds,
                        offset.as_deref(),
                        &AdminPath::credentials(username.clone()).to_path(),
                    )
                })
            }
            AdminPath::Credential { username, id } => state
                .credentials
                .get(username)
                .and_then(|creds| {
                    creds
                        .iter()
                        .find(|c| c.get("id").and_then(Value::as_str) == Some(id.as_str()))
                })
                .cloned(),
        };

        Ok(found.map_or(Lookup::NotFound, Lookup::Found))
    }

    fn create_now(&self, path: &AdminPath, body: &Value) -> Result<Create, GatewayError> {
        let mut state = self.state.lock();
        let now = Utc::now().timestamp();

        match path {
            AdminPath::Consumers { .. } => {
                let username = body
                    .get("username")
                    .and_then(Value::as_str)
                    .ok_or_else(|| bad_request("username is required"))?
                    .to_string();

                if state.consumers.contains_key(&username) {
                    return Ok(Create::Conflict);
                }

                let consumer = json!({
                    "id": state.next_id("consumer"),
                    "username": username,
                    "custom_id": Value::Null,
                    "created_at": now,
                });
                info!(username = %username, "Memory gateway created consumer");
                state.consumers.insert(username, consumer.clone());
                Ok(Create::Created(consumer))
            }
            AdminPath::Credentials { username, .. } => {
                let consumer_id = state
                    .consumers
                    .get(username)
                    .and_then(|c| c.get("id").cloned())
                    .ok_or_else(|| GatewayError::UnexpectedStatus {
                        status: 404,
                        body: json!({ "message": "Not found" }).to_string(),
                    })?;

                let key = body
                    .get("key")
                    .and_then(Value::as_str)
                    .ok_or_else(|| bad_request("key is required"))?
                    .to_string();

                let taken = state.credentials.get(username).is_some_and(|creds| {
                    creds
                        .iter()
                        .any(|c| c.get("key").and_then(Value::as_str) == Some(key.as_str()))
                });
                if taken {
                    return Ok(Create::Conflict);
                }

                let credential = json!({
                    "id": state.next_id("jwt"),
                    "key": key,
                    "secret": body.get("secret").cloned().unwrap_or(Value::Null),
                    "algorithm": body.get("algorithm").cloned().unwrap_or_else(|| json!("HS256")),
                    "created_at": now,
                    "consumer": { "id": consumer_id },
                    "rsa_public_key": Value::Null,
                });
                state
                    .credentials
                    .entry(username.clone())
                    .or_default()
                    .push(credential.clone());
                Ok(Create::Created(credential))
            }
            _ => Err(GatewayError::UnexpectedStatus {
                status: 405,
                body: "method not allowed".into(),
            }),
        }
    }

    fn delete_now(&self, path: &AdminPath) -> Result<Delete, GatewayError> {
        let mut state = self.state.lock();

        match path {
            AdminPath::Consumer(username) => {
                let removed = state.consumers.remove(username).is_some();
                state.credentials.remove(username);
                Ok(if removed { Delete::Deleted } else { Delete::NotFound })
            }
            AdminPath::Credential { username, id } => {
                let Some(creds) = state.credentials.get_mut(username) else {
                    return Ok(Delete::NotFound);
                };
                let before = creds.len();
                creds.retain(|c| c.get("id").and_then(Value::as_str) != Some(id.as_str()));
                Ok(if creds.len() < before {
                    Delete::Deleted
                } else {
                    Delete::NotFound
                })
            }
            _ => Err(GatewayError::UnexpectedStatus {
                status: 405,
                body: "method not allowed".into(),
            }),
        }
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

fn bad_request(message: &str) -> GatewayError {
    GatewayError::UnexpectedStatus {
        status: 400,
        body: json!({ "message": message }).to_string(),
    }
}

fn unexpected_status(status: u16) -> GatewayError {
    GatewayError::UnexpectedStatus {
        status,
        body: "injected".into(),
    }
}

#[async_trait]
impl GatewayClient for MemoryGateway {
    async fn lookup(&self, path: &AdminPath) -> Result<Lookup, GatewayError> {
        let started = Instant::now();
        self.simulate_latency().await;

        let result = match self.take_fault(path.endpoint(), "GET") {
            Some(Fault::NotFound) => Ok(Lookup::NotFound),
            Some(Fault::Conflict) => Err(unexpected_status(409)),
            Some(Fault::Error(e)) => Err(e),
            None => self.lookup_now(path),
        };

        self.record(path, "GET", started, &result, Lookup::call_outcome);
        result
    }

    async fn create(&self, path: &AdminPath, body: &Value) -> Result<Create, GatewayError> {
        let started = Instant::now();
        self.simulate_latency().await;

        let result = match self.take_fault(path.endpoint(), "POST") {
            Some(Fault::Conflict) => Ok(Create::Conflict),
            Some(Fault::NotFound) => Err(unexpected_status(404)),
            Some(Fault::Error(e)) => Err(e),
            None => self.create_now(path, body),
        };

        self.record(path, "POST", started, &result, Create::call_outcome);
        result
    }

    async fn delete(&self, path: &AdminPath) -> Result<Delete, GatewayError> {
        let started = Instant::now();
        self.simulate_latency().await;

        let result = match self.take_fault(path.endpoint(), "DELETE") {
            Some(Fault::NotFound) => Ok(Delete::NotFound),
            Some(Fault::Conflict) => Err(unexpected_status(409)),
            Some(Fault::Error(e)) => Err(e),
            None => self.delete_now(path),
        };

        self.record(path, "DELETE", started, &result, Delete::call_outcome);
        result
    }
}
