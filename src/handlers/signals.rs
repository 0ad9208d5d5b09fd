//! # Signals Endpoint Handlers
//!
//! HTTP surface over the actions API and the read repository. Mutations are
//! delegated to the [`SignalManager`](crate::actions::SignalManager); reads
//! resolve the aggregate's current pointers or reconstruct history.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::actions::inputs::{
    AttachmentInput, CreateSignal, NoteInput, SignalUpdate, StatusInput,
};
use crate::error::{ActionError, ApiError};
use crate::models::{attachment, note, signal, status};
use crate::repositories::signal::{HistoryEntry, SignalAggregate};
use crate::repositories::SignalRepository;
use crate::server::AppState;

/// Query parameters for listing signals
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListSignalsQuery {
    /// Return signals created strictly before this timestamp (RFC3339)
    pub created_before: Option<DateTime<FixedOffset>>,
    /// Tie-breaker id belonging to `created_before`
    pub before_id: Option<i64>,
    /// Maximum number of signals to return (default: 50, max: 100)
    pub limit: Option<u64>,
}

/// Create a signal with its initial sub-entity versions
#[utoipa::path(
    post,
    path = "/signals",
    request_body = CreateSignal,
    responses(
        (status = 201, description = "Signal created", body = SignalAggregate),
        (status = 400, description = "Validation failed", body = ApiError, example = json!({
            "code": "VALIDATION_FAILED",
            "message": "Validation failed",
            "details": { "text": "This field may not be blank." },
            "trace_id": "corr-12345678"
        })),
        (status = 404, description = "Referenced category or parent not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "signals"
)]
pub async fn create_signal(
    State(state): State<AppState>,
    Json(input): Json<CreateSignal>,
) -> Result<(StatusCode, Json<SignalAggregate>), ApiError> {
    let signal = state.manager.create_initial(input).await?;
    let aggregate = load_aggregate(&state, signal.id).await?;
    Ok((StatusCode::CREATED, Json(aggregate)))
}

/// List signals, newest first
#[utoipa::path(
    get,
    path = "/signals",
    params(ListSignalsQuery),
    responses(
        (status = 200, description = "Signals listed", body = [signal::Model]),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "signals"
)]
pub async fn list_signals(
    State(state): State<AppState>,
    Query(query): Query<ListSignalsQuery>,
) -> Result<Json<Vec<signal::Model>>, ApiError> {
    let limit = query.limit.unwrap_or(50).min(100);
    let cursor = match (query.created_before, query.before_id) {
        (Some(created_at), Some(id)) => Some((created_at, id)),
        _ => None,
    };
    let signals = SignalRepository::new(&state.db).list(cursor, limit).await?;
    Ok(Json(signals))
}

/// Fetch a signal with its current sub-entity versions
#[utoipa::path(
    get,
    path = "/signals/{id}",
    params(("id" = i64, Path, description = "Signal id")),
    responses(
        (status = 200, description = "Signal found", body = SignalAggregate),
        (status = 404, description = "Signal not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "signals"
)]
pub async fn get_signal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SignalAggregate>, ApiError> {
    let aggregate = load_aggregate(&state, id).await?;
    Ok(Json(aggregate))
}

/// Apply a batched update under a single aggregate claim
#[utoipa::path(
    patch,
    path = "/signals/{id}",
    params(("id" = i64, Path, description = "Signal id")),
    request_body = SignalUpdate,
    responses(
        (status = 200, description = "Update applied", body = SignalAggregate),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Signal not found", body = ApiError),
        (status = 409, description = "Concurrent mutation in progress", body = ApiError, example = json!({
            "code": "CONFLICT",
            "message": "Signal 42 is being mutated by another request",
            "retry_after": 1,
            "trace_id": "corr-87654321"
        })),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "signals"
)]
pub async fn update_signal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<SignalUpdate>,
) -> Result<Json<SignalAggregate>, ApiError> {
    let signal = find_signal(&state, id).await?;
    state.manager.update_multiple(&signal, update).await?;
    let aggregate = load_aggregate(&state, id).await?;
    Ok(Json(aggregate))
}

/// Apply a status transition
#[utoipa::path(
    post,
    path = "/signals/{id}/status",
    params(("id" = i64, Path, description = "Signal id")),
    request_body = StatusInput,
    responses(
        (status = 201, description = "Status applied", body = status::Model),
        (status = 400, description = "Illegal transition or missing field", body = ApiError, example = json!({
            "code": "VALIDATION_FAILED",
            "message": "Validation failed",
            "details": { "state": "Invalid state transition from `reported` to `handled_external`" },
            "trace_id": "corr-11111111"
        })),
        (status = 404, description = "Signal not found", body = ApiError),
        (status = 409, description = "Concurrent mutation in progress", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "signals"
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<StatusInput>,
) -> Result<(StatusCode, Json<status::Model>), ApiError> {
    let signal = find_signal(&state, id).await?;
    let status = state.manager.update_status(&signal, input).await?;
    Ok((StatusCode::CREATED, Json(status)))
}

/// Append a note
#[utoipa::path(
    post,
    path = "/signals/{id}/notes",
    params(("id" = i64, Path, description = "Signal id")),
    request_body = NoteInput,
    responses(
        (status = 201, description = "Note created", body = note::Model),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Signal not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "signals"
)]
pub async fn create_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<NoteInput>,
) -> Result<(StatusCode, Json<note::Model>), ApiError> {
    let signal = find_signal(&state, id).await?;
    let note = state.manager.create_note(&signal, input).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// Register an attachment
#[utoipa::path(
    post,
    path = "/signals/{id}/attachments",
    params(("id" = i64, Path, description = "Signal id")),
    request_body = AttachmentInput,
    responses(
        (status = 201, description = "Attachment registered", body = attachment::Model),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Signal not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "signals"
)]
pub async fn add_attachment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<AttachmentInput>,
) -> Result<(StatusCode, Json<attachment::Model>), ApiError> {
    let signal = find_signal(&state, id).await?;
    let attachment = state.manager.add_attachment(&signal, input).await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

/// Reconstructed history of a signal, oldest first
#[utoipa::path(
    get,
    path = "/signals/{id}/history",
    params(("id" = i64, Path, description = "Signal id")),
    responses(
        (status = 200, description = "History entries", body = [HistoryEntry]),
        (status = 404, description = "Signal not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "signals"
)]
pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let repository = SignalRepository::new(&state.db);
    if repository.get(id).await?.is_none() {
        return Err(ActionError::SignalNotFound(id).into());
    }
    let entries = repository.history(id).await?;
    Ok(Json(entries))
}

async fn find_signal(state: &AppState, id: i64) -> Result<signal::Model, ApiError> {
    SignalRepository::new(&state.db)
        .get(id)
        .await?
        .ok_or_else(|| ActionError::SignalNotFound(id).into())
}

async fn load_aggregate(state: &AppState, id: i64) -> Result<SignalAggregate, ApiError> {
    SignalRepository::new(&state.db)
        .get_aggregate(id)
        .await?
        .ok_or_else(|| ActionError::SignalNotFound(id).into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header::CONTENT_TYPE},
    };
    use chrono::Utc;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ActiveModelTrait, ActiveValue::Set, Database};
    use tower::ServiceExt;

    use crate::actions::SignalManager;
    use crate::areas::NoopAreaLookup;
    use crate::events::EventDispatcher;
    use crate::models::category;
    use crate::server::{AppState, create_app};

    async fn setup_test_app() -> (AppState, axum::Router) {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to init test DB");
        Migrator::up(&db, None).await.expect("Failed to migrate");

        let manager = Arc::new(SignalManager::new(
            db.clone(),
            Arc::new(EventDispatcher::new()),
            Arc::new(NoopAreaLookup),
            3,
            None,
        ));
        let state = AppState { db, manager };
        let app = create_app(state.clone());
        (state, app)
    }

    async fn seed_category(state: &AppState) -> i64 {
        category::ActiveModel {
            slug: Set("overig".to_string()),
            name: Set("Overig".to_string()),
            public_name: Set(None),
            parent_id: Set(None),
            handling_message: Set(None),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(&state.db)
        .await
        .expect("Failed to seed category")
        .id
    }

    fn create_body(category_id: i64, text: &str) -> Body {
        Body::from(
            serde_json::json!({
                "text": text,
                "incident_date_start": Utc::now().to_rfc3339(),
                "location": { "lon": 4.9, "lat": 52.37 },
                "category_assignment": { "category_id": category_id },
                "reporter": { "email": "reporter@example.com" }
            })
            .to_string(),
        )
    }

    fn post_json(uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap()
    }

    #[tokio::test]
    async fn create_then_fetch_roundtrip() {
        let (state, app) = setup_test_app().await;
        let category_id = seed_category(&state).await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/signals",
                create_body(category_id, "There is garbage next to the container."),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/signals/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn blank_report_text_is_a_400() {
        let (state, app) = setup_test_app().await;
        let category_id = seed_category(&state).await;

        let response = app
            .oneshot(post_json("/signals", create_body(category_id, "   ")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_signal_is_a_problem_json_404() {
        let (_state, app) = setup_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/signals/9999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
    }

    #[tokio::test]
    async fn empty_batched_update_is_a_400() {
        let (state, app) = setup_test_app().await;
        let category_id = seed_category(&state).await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/signals",
                create_body(category_id, "Broken street light."),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/signals/1")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn request_id_header_is_echoed() {
        let (_state, app) = setup_test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "req-abc-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-request-id").unwrap(), "req-abc-1");
    }
}
