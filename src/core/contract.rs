use crate::domain::model::{Reply, JSON_CONTENT_TYPE};
use crate::domain::ports::{ConfigProvider, ContractCase};
use crate::utils::error::{MockError, Result};
use crate::utils::validation;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_TRIALS: usize = 100;
pub const MIN_DELAY: Duration = Duration::from_millis(1000);

/// One request/response observed by a contract case.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub status: StatusCode,
    pub body: Value,
    pub elapsed: Duration,
}

/// HTTP client for the contract cases; every request is sent as JSON.
#[derive(Debug, Clone)]
pub struct ContractClient {
    client: Client,
    base_url: String,
}

impl ContractClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        validation::validate_url("base_url", base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request and parse the JSON body whatever the status.
    pub async fn call(&self, case: &str, method: Method, path: &str, body: Option<&Value>) -> Result<Exchange> {
        let url = self.url(path);
        let payload = match body {
            Some(body) => serde_json::to_vec(body)?,
            None => Vec::new(),
        };

        tracing::debug!("📡 {}: {} {}", case, method, url);
        let start = Instant::now();
        let response = self
            .client
            .request(method, &url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(payload)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        let elapsed = start.elapsed();

        let body = serde_json::from_str(&text).map_err(|e| {
            MockError::contract(case, format!("{} returned a non-JSON body ({}): {}", path, e, text))
        })?;
        tracing::debug!("📡 {}: {} in {:?}", case, status, elapsed);

        Ok(Exchange {
            status,
            body,
            elapsed,
        })
    }

    pub async fn get(&self, case: &str, path: &str) -> Result<Exchange> {
        self.call(case, Method::GET, path, None).await
    }

    pub async fn post(&self, case: &str, path: &str, body: Option<&Value>) -> Result<Exchange> {
        self.call(case, Method::POST, path, body).await
    }
}

fn expect_status(case: &str, exchange: &Exchange, expected: StatusCode) -> Result<()> {
    if exchange.status != expected {
        return Err(MockError::contract(
            case,
            format!("expected status {}, got {}", expected, exchange.status),
        ));
    }
    Ok(())
}

fn expect_reply(case: &str, body: &Value, expected: &Reply) -> Result<()> {
    if body["code"] != json!(expected.code) {
        return Err(MockError::contract(
            case,
            format!("expected code {}, got {}", expected.code, body["code"]),
        ));
    }
    if body["msg"] != json!(expected.msg) {
        return Err(MockError::contract(
            case,
            format!("expected msg '{}', got {}", expected.msg, body["msg"]),
        ));
    }
    Ok(())
}

/// GET `/t/200` answers 200 with the success reply.
pub struct OkCase;

#[async_trait]
impl ContractCase<ContractClient> for OkCase {
    fn name(&self) -> &str {
        "ok"
    }

    async fn run(&self, client: &ContractClient) -> Result<String> {
        let exchange = client.get(self.name(), "/t/200").await?;
        expect_status(self.name(), &exchange, StatusCode::OK)?;
        expect_reply(self.name(), &exchange.body, &Reply::success())?;
        Ok("200 normal return".to_string())
    }
}

/// POST `/t/500` must fail with 500 and carry the failure reply.
pub struct FailureCase;

#[async_trait]
impl ContractCase<ContractClient> for FailureCase {
    fn name(&self) -> &str {
        "failure"
    }

    async fn run(&self, client: &ContractClient) -> Result<String> {
        let exchange = client.post(self.name(), "/t/500", None).await?;
        if exchange.status.is_success() {
            return Err(MockError::contract(
                self.name(),
                format!("expected an error status, got {}", exchange.status),
            ));
        }
        expect_status(self.name(), &exchange, StatusCode::INTERNAL_SERVER_ERROR)?;
        expect_reply(self.name(), &exchange.body, &Reply::failure())?;
        Ok("500 return failed".to_string())
    }
}

/// GET `/t/delay` takes longer than `min_delay`, then answers like `/t/200`.
pub struct DelayCase {
    pub min_delay: Duration,
}

impl Default for DelayCase {
    fn default() -> Self {
        Self { min_delay: MIN_DELAY }
    }
}

#[async_trait]
impl ContractCase<ContractClient> for DelayCase {
    fn name(&self) -> &str {
        "delay"
    }

    async fn run(&self, client: &ContractClient) -> Result<String> {
        let exchange = client.get(self.name(), "/t/delay").await?;
        if exchange.elapsed <= self.min_delay {
            return Err(MockError::contract(
                self.name(),
                format!(
                    "expected a delay over {:?}, answered in {:?}",
                    self.min_delay, exchange.elapsed
                ),
            ));
        }
        expect_status(self.name(), &exchange, StatusCode::OK)?;
        expect_reply(self.name(), &exchange.body, &Reply::success())?;
        Ok(format!("answered after {:?}", exchange.elapsed))
    }
}

/// `trials` sequential GETs of `/t/probability`: some, but not all, fail.
pub struct ProbabilityCase {
    pub trials: usize,
}

impl Default for ProbabilityCase {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
        }
    }
}

#[async_trait]
impl ContractCase<ContractClient> for ProbabilityCase {
    fn name(&self) -> &str {
        "probability"
    }

    async fn run(&self, client: &ContractClient) -> Result<String> {
        let mut failed_count = 0;
        for trial in 0..self.trials {
            let exchange = client.get(self.name(), "/t/probability").await?;
            match exchange.body["code"].as_i64() {
                Some(1) => {}
                Some(2) => failed_count += 1,
                _ => {
                    return Err(MockError::contract(
                        self.name(),
                        format!("trial {}: unexpected code {}", trial, exchange.body["code"]),
                    ))
                }
            }
        }

        if failed_count == 0 {
            return Err(MockError::contract(
                self.name(),
                format!("no failures in {} trials", self.trials),
            ));
        }
        if failed_count >= self.trials {
            return Err(MockError::contract(
                self.name(),
                format!("all {} trials failed", self.trials),
            ));
        }
        Ok(format!("{}/{} trials failed", failed_count, self.trials))
    }
}

/// GET `/t/body` answers with the success reply.
pub struct ExternalBodyCase;

#[async_trait]
impl ContractCase<ContractClient> for ExternalBodyCase {
    fn name(&self) -> &str {
        "external body"
    }

    async fn run(&self, client: &ContractClient) -> Result<String> {
        let exchange = client.get(self.name(), "/t/body").await?;
        expect_status(self.name(), &exchange, StatusCode::OK)?;
        expect_reply(self.name(), &exchange.body, &Reply::success())?;
        Ok("200 normal return".to_string())
    }
}

/// POST `/t/request/json` echoes the request line and body fields.
pub struct RequestEchoCase;

impl RequestEchoCase {
    pub fn payload() -> Value {
        json!({
            "req_id": 123,
            "req_name": "foo",
            "data": [{"id": 0}, {"id": 456}]
        })
    }

    pub fn expected_fields() -> Vec<(&'static str, Value)> {
        vec![
            ("request_method", json!("POST")),
            ("request_path", json!("/t/request/json")),
            ("request_url", json!("/t/request/json")),
            ("request_path_0", json!("t")),
            ("request_path_1", json!("request")),
            ("request_path_2", json!("json")),
            ("request_body_0", json!(123)),
            ("request_body_1", json!("foo")),
            ("request_body_2", json!(456)),
            ("request_body_3", json!(456)),
        ]
    }
}

#[async_trait]
impl ContractCase<ContractClient> for RequestEchoCase {
    fn name(&self) -> &str {
        "request echo"
    }

    async fn run(&self, client: &ContractClient) -> Result<String> {
        let payload = Self::payload();
        let exchange = client
            .post(self.name(), "/t/request/json", Some(&payload))
            .await?;
        expect_status(self.name(), &exchange, StatusCode::OK)?;
        expect_reply(self.name(), &exchange.body, &Reply::success())?;

        let fields = Self::expected_fields();
        for (field, expected) in &fields {
            if &exchange.body[*field] != expected {
                return Err(MockError::contract(
                    self.name(),
                    format!("{}: expected {}, got {}", field, expected, exchange.body[*field]),
                ));
            }
        }
        Ok(format!("{} echoed fields match", fields.len()))
    }
}

/// Result of a single case.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub name: String,
    pub passed: bool,
    pub elapsed: Duration,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub outcomes: Vec<CaseOutcome>,
    pub duration: Duration,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.passed_count()
    }

    pub fn failures(&self) -> Vec<&CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.passed).collect()
    }

    pub fn outcome(&self, name: &str) -> Option<&CaseOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// 執行摘要
    pub fn summary(&self) -> HashMap<String, Value> {
        let mut summary = HashMap::new();
        summary.insert("total_cases".to_string(), json!(self.outcomes.len()));
        summary.insert("passed_cases".to_string(), json!(self.passed_count()));
        summary.insert("failed_cases".to_string(), json!(self.failed_count()));
        summary.insert(
            "total_duration_ms".to_string(),
            json!(self.duration.as_millis() as u64),
        );
        summary
    }

    /// First failed case as an error.
    pub fn into_result(self) -> Result<()> {
        match self.outcomes.into_iter().find(|o| !o.passed) {
            Some(failed) => Err(MockError::ContractViolation {
                case: failed.name,
                message: failed.detail,
            }),
            None => Ok(()),
        }
    }
}

/// The asserted cases, run one after another against one base URL.
pub struct ContractSuite {
    client: ContractClient,
    cases: Vec<Box<dyn ContractCase<ContractClient>>>,
}

impl ContractSuite {
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        validation::validate_positive_number("trials", config.probability_trials(), 1)?;
        let client = ContractClient::new(
            config.base_url(),
            Duration::from_secs(config.timeout_seconds()),
        )?;

        let cases: Vec<Box<dyn ContractCase<ContractClient>>> = vec![
            Box::new(OkCase),
            Box::new(FailureCase),
            Box::new(DelayCase::default()),
            Box::new(ProbabilityCase {
                trials: config.probability_trials(),
            }),
            Box::new(ExternalBodyCase),
            Box::new(RequestEchoCase),
        ];
        Ok(Self::with_cases(client, cases))
    }

    pub fn with_cases(client: ContractClient, cases: Vec<Box<dyn ContractCase<ContractClient>>>) -> Self {
        Self { client, cases }
    }

    pub fn case_names(&self) -> Vec<&str> {
        self.cases.iter().map(|c| c.name()).collect()
    }

    /// Keep only the named cases; unknown names are reported.
    pub fn retain_cases(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = names.iter().find(|n| !self.case_names().contains(&n.as_str())) {
            return Err(MockError::InvalidConfigValueError {
                field: "case".to_string(),
                value: unknown.clone(),
                reason: format!("Known cases: {}", self.case_names().join(", ")),
            });
        }
        self.cases.retain(|c| names.iter().any(|n| n == c.name()));
        Ok(())
    }

    pub async fn run(&self) -> SuiteReport {
        let suite_start = Instant::now();
        let mut outcomes = Vec::with_capacity(self.cases.len());

        tracing::info!(
            "🔄 Running {} contract cases against {}",
            self.cases.len(),
            self.client.base_url()
        );

        for case in &self.cases {
            let start = Instant::now();
            let result = case.run(&self.client).await;
            let elapsed = start.elapsed();

            let outcome = match result {
                Ok(detail) => {
                    tracing::info!("✅ {} ({:?}): {}", case.name(), elapsed, detail);
                    CaseOutcome {
                        name: case.name().to_string(),
                        passed: true,
                        elapsed,
                        detail,
                    }
                }
                Err(e) => {
                    let detail = match e {
                        MockError::ContractViolation { message, .. } => message,
                        other => other.user_friendly_message(),
                    };
                    tracing::warn!("❌ {} ({:?}): {}", case.name(), elapsed, detail);
                    CaseOutcome {
                        name: case.name().to_string(),
                        passed: false,
                        elapsed,
                        detail,
                    }
                }
            };
            outcomes.push(outcome);
        }

        let report = SuiteReport {
            outcomes,
            duration: suite_start.elapsed(),
        };
        tracing::info!(
            "📈 {} passed, {} failed in {:?}",
            report.passed_count(),
            report.failed_count(),
            report.duration
        );
        report
    }
}
