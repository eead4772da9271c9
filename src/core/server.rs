use crate::config::toml_config::MockConfig;
use crate::core::failure::{RandomFailure, SeededFailure};
use crate::core::template;
use crate::domain::model::{FailureBranch, Reply, RequestSnapshot, RouteDefinition, JSON_CONTENT_TYPE};
use crate::domain::ports::FailureSource;
use crate::utils::error::{MockError, Result};
use crate::utils::validation::Validate;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A route with its response bodies loaded and ready to render.
#[derive(Debug)]
struct CompiledRoute {
    name: String,
    status: u16,
    delay: Duration,
    body: serde_json::Value,
    templated: bool,
    failure: Option<FailureBranch>,
}

impl CompiledRoute {
    fn compile(definition: &RouteDefinition) -> Result<Self> {
        let body = match (&definition.body, &definition.body_file) {
            (Some(body), _) => body.clone(),
            (None, Some(file)) => load_body_file(file)?,
            (None, None) => {
                return Err(MockError::MissingConfigError {
                    field: format!("{}.body", definition.display_name()),
                })
            }
        };

        Ok(Self {
            name: definition.display_name(),
            status: definition.status(),
            delay: Duration::from_millis(definition.delay_ms()),
            templated: template::has_placeholders(&body),
            body,
            failure: definition.failure.clone().filter(|f| f.rate > 0.0),
        })
    }
}

fn load_body_file(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| MockError::ConfigValidationError {
        field: "body_file".to_string(),
        message: format!("Cannot read {}: {}", path.display(), e),
    })?;
    serde_json::from_str(&content).map_err(|e| MockError::ConfigValidationError {
        field: "body_file".to_string(),
        message: format!("{} is not valid JSON: {}", path.display(), e),
    })
}

fn method_filter(method: &str) -> Result<MethodFilter> {
    let invalid = || MockError::InvalidConfigValueError {
        field: "method".to_string(),
        value: method.to_string(),
        reason: "Not a routable HTTP method".to_string(),
    };
    let method = Method::from_bytes(method.to_uppercase().as_bytes()).map_err(|_| invalid())?;
    MethodFilter::try_from(method).map_err(|_| invalid())
}

/// JSON mock server built from a route table.
pub struct MockServer {
    router: Router,
    route_count: usize,
}

impl MockServer {
    /// Build from config; a configured seed makes failure branches reproducible.
    pub fn new(config: &MockConfig) -> Result<Self> {
        let failures: Arc<dyn FailureSource> = match config.seed() {
            Some(seed) => Arc::new(SeededFailure::new(seed)),
            None => Arc::new(RandomFailure),
        };
        Self::with_failure_source(config, failures)
    }

    pub fn with_failure_source(config: &MockConfig, failures: Arc<dyn FailureSource>) -> Result<Self> {
        config.validate()?;

        // 同一路徑的不同方法需合併為一個 MethodRouter
        let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();
        for definition in &config.routes {
            let route = Arc::new(CompiledRoute::compile(definition)?);
            let filter = method_filter(&definition.method)?;
            let failures = Arc::clone(&failures);

            let handler = move |method: Method,
                                uri: Uri,
                                headers: HeaderMap,
                                body: std::result::Result<Bytes, BytesRejection>| {
                let route = Arc::clone(&route);
                let failures = Arc::clone(&failures);
                async move {
                    match body {
                        Ok(body) => respond(&route, failures.as_ref(), method, uri, headers, body).await,
                        Err(rejection) => rejected_body(&method, &uri, rejection),
                    }
                }
            };

            let method_router = by_path
                .remove(&definition.path)
                .unwrap_or_else(MethodRouter::new);
            by_path.insert(definition.path.clone(), method_router.on(filter, handler));
        }

        let mut router = Router::new();
        for (path, method_router) in by_path {
            router = router.route(&path, method_router);
        }

        Ok(Self {
            router: router.fallback(not_found),
            route_count: config.routes.len(),
        })
    }

    pub fn route_count(&self) -> usize {
        self.route_count
    }

    /// Serve in a background task; port 0 picks a free port.
    pub async fn spawn(self, addr: SocketAddr) -> Result<ServerHandle> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let router = self.router;
        let join = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!("🚀 Mock server listening on http://{} ({} routes)", local_addr, self.route_count);
        Ok(ServerHandle {
            local_addr,
            shutdown: Some(shutdown_tx),
            join: Some(join),
        })
    }

    /// Serve in the foreground until `signal` resolves.
    pub async fn run_until<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!("🚀 Mock server listening on http://{} ({} routes)", local_addr, self.route_count);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("🛑 Mock server on {} stopped", local_addr);
        Ok(())
    }
}

/// Handle to a spawned server; dropping it signals shutdown.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<std::io::Result<()>>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            join.await.map_err(|e| MockError::ServerError {
                message: format!("server task failed: {}", e),
            })??;
        }
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn respond(
    route: &CompiledRoute,
    failures: &dyn FailureSource,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let mut snapshot = RequestSnapshot::new(method.as_str(), target).with_raw_body(&body);
    for (name, value) in headers.iter() {
        if let Ok(value) = value.to_str() {
            snapshot = snapshot.with_header(name.as_str(), value);
        }
    }

    if !route.delay.is_zero() {
        tokio::time::sleep(route.delay).await;
    }

    let (status, template_body, failed) = match &route.failure {
        Some(branch) if failures.should_fail(branch.rate) => (branch.status(), &branch.body, true),
        _ => (route.status, &route.body, false),
    };

    let rendered = if failed || route.templated {
        template::render(template_body, &snapshot)
    } else {
        template_body.clone()
    };

    tracing::debug!(
        "{} {} -> {} [{}]{}",
        snapshot.method,
        snapshot.url,
        status,
        route.name,
        if failed { " failure branch" } else { "" }
    );
    json_response(status, &rendered)
}

/// Oversized or unreadable bodies still get a JSON reply.
fn rejected_body(method: &Method, uri: &Uri, rejection: BytesRejection) -> Response {
    let status = rejection.status();
    tracing::debug!("{} {} -> {} ({})", method, uri, status, rejection.body_text());
    json_response(
        status.as_u16(),
        &serde_json::json!({ "code": Reply::failure().code, "msg": rejection.body_text() }),
    )
}

async fn not_found(method: Method, uri: Uri) -> Response {
    tracing::debug!("{} {} -> 404", method, uri);
    json_response(
        StatusCode::NOT_FOUND.as_u16(),
        &serde_json::json!({ "code": Reply::failure().code, "msg": "route not found" }),
    )
}

fn json_response(status: u16, body: &serde_json::Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
        body.to_string(),
    )
        .into_response()
}
