//! Request-scoped trace correlation and global tracing setup.
//!
//! Every request runs inside a task-local [`TraceContext`] so log lines and
//! problem+json error bodies carry the same correlation ID. The ID comes
//! from the `x-request-id` header when the caller supplies one and is echoed
//! back on the response either way.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use log::LevelFilter;
use thiserror::Error;
use tokio::task_local;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::Layer,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

use crate::config::AppConfig;

/// Header carrying the caller-supplied correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation metadata scoped to a single request.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
}

impl TraceContext {
    /// Builds a context from request headers, generating an ID when the
    /// caller did not send a usable one.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let trace_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self { trace_id }
    }
}

task_local! {
    static ACTIVE_TRACE_CONTEXT: TraceContext;
}

/// Runs the request inside its trace context and echoes the ID back to the
/// caller, so a reporter-facing frontend can quote it in support tickets.
pub async fn trace_context_middleware(request: Request, next: Next) -> Response {
    let context = TraceContext::from_headers(request.headers());
    let trace_id = context.trace_id.clone();

    let mut response = with_trace_context(context, next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Execute `future` with `context` available through task-local storage.
pub async fn with_trace_context<Fut, R>(context: TraceContext, future: Fut) -> R
where
    Fut: std::future::Future<Output = R>,
{
    ACTIVE_TRACE_CONTEXT.scope(context, future).await
}

/// The trace ID of the running request, if any.
pub fn current_trace_id() -> Option<String> {
    ACTIVE_TRACE_CONTEXT
        .try_with(|context| context.trace_id.clone())
        .ok()
}

/// Errors that can occur while initializing global telemetry.
#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

static TELEMETRY_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Installs the global tracing subscriber once, with `log::` macros bridged
/// into it. `SIGNALEN_LOG_LEVEL` seeds the filter unless `RUST_LOG` is set;
/// `SIGNALEN_LOG_FORMAT=pretty` switches the JSON output to human-readable.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if TELEMETRY_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    // The only failure mode is a logger that is already installed.
    let _ = LogTracer::builder()
        .with_max_level(LevelFilter::Trace)
        .init();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let fmt_layer = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().boxed(),
        _ => fmt::layer().json().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
