//! # Server Configuration
//!
//! This module contains the server setup and configuration for the Signalen API.
//! `run_server` wires the event dispatcher, the mail rule engine and the
//! external subscribers from the loaded configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::actions::SignalManager;
use crate::areas::DbAreaLookup;
use crate::config::AppConfig;
use crate::events::EventDispatcher;
use crate::handlers;
use crate::mail::{MailRuleEngine, MailSettings};
use crate::mail::outbound::{LogMailer, Mailer, RestMailer};
use crate::subscribers::{ExternalSyncSubscriber, StatusWebhookSubscriber};
use crate::telemetry;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub manager: Arc<SignalManager>,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/signals",
            post(handlers::signals::create_signal).get(handlers::signals::list_signals),
        )
        .route(
            "/signals/{id}",
            get(handlers::signals::get_signal).patch(handlers::signals::update_signal),
        )
        .route("/signals/{id}/status", post(handlers::signals::update_status))
        .route("/signals/{id}/notes", post(handlers::signals::create_note))
        .route(
            "/signals/{id}/attachments",
            post(handlers::signals::add_attachment),
        )
        .route("/signals/{id}/history", get(handlers::signals::history))
        .layer(middleware::from_fn(telemetry::trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Build the event dispatcher from the configured mail and sync endpoints.
pub fn build_dispatcher(
    config: &AppConfig,
    db: DatabaseConnection,
) -> Result<EventDispatcher, Box<dyn std::error::Error>> {
    let timeout = Duration::from_millis(config.outbound_timeout_ms);
    let mut dispatcher = EventDispatcher::new();

    let mailer: Arc<dyn Mailer> = match &config.mail_endpoint {
        Some(endpoint) => Arc::new(RestMailer::new(Url::parse(endpoint)?, timeout)?),
        None => {
            tracing::warn!("no mail endpoint configured, outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    };
    let settings = MailSettings {
        organization_name: config.organization_name.clone(),
        from_email: config.default_from_email.clone(),
        max_decode_iterations: config.mail_max_decode_iterations,
    };
    dispatcher.register(Arc::new(MailRuleEngine::new(db, mailer, settings)));

    if let Some(endpoint) = &config.external_sync_endpoint {
        dispatcher.register(Arc::new(ExternalSyncSubscriber::new(
            Url::parse(endpoint)?,
            timeout,
        )?));
    }
    if let Some(endpoint) = &config.status_webhook_endpoint {
        dispatcher.register(Arc::new(StatusWebhookSubscriber::new(
            Url::parse(endpoint)?,
            timeout,
        )?));
    }

    tracing::info!(
        subscribers = dispatcher.subscriber_count(),
        "event dispatcher initialized"
    );
    Ok(dispatcher)
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = Arc::new(build_dispatcher(&config, db.clone())?);
    let areas = Arc::new(DbAreaLookup::new(db.clone()));
    let manager = Arc::new(SignalManager::new(
        db.clone(),
        dispatcher,
        areas,
        config.max_number_of_children,
        config.default_area_type.clone(),
    ));

    let state = AppState { db, manager };
    let app = create_app(state);

    // Resolve the configured bind address
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Server listening on: {}", addr);
    println!("Running in profile: {}", config.profile);

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::signals::create_signal,
        crate::handlers::signals::list_signals,
        crate::handlers::signals::get_signal,
        crate::handlers::signals::update_signal,
        crate::handlers::signals::update_status,
        crate::handlers::signals::create_note,
        crate::handlers::signals::add_attachment,
        crate::handlers::signals::history,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::workflow::State,
            crate::actions::inputs::CreateSignal,
            crate::actions::inputs::SignalUpdate,
            crate::actions::inputs::LocationInput,
            crate::actions::inputs::StatusInput,
            crate::actions::inputs::CategoryAssignmentInput,
            crate::actions::inputs::ReporterInput,
            crate::actions::inputs::PriorityInput,
            crate::actions::inputs::NoteInput,
            crate::actions::inputs::TypeInput,
            crate::actions::inputs::DepartmentsInput,
            crate::actions::inputs::UserAssignmentInput,
            crate::actions::inputs::AttachmentInput,
            crate::models::signal::Model,
            crate::models::location::Model,
            crate::models::status::Model,
            crate::models::category_assignment::Model,
            crate::models::reporter::Model,
            crate::models::priority::Model,
            crate::models::note::Model,
            crate::models::signal_type::Model,
            crate::models::signal_departments::Model,
            crate::models::signal_user::Model,
            crate::models::attachment::Model,
            crate::repositories::signal::SignalAggregate,
            crate::repositories::signal::HistoryEntry,
        )
    ),
    info(
        title = "Signalen API",
        description = "API for reporting and handling nuisance signals in public space",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
