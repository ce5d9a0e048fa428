//! HTTP Endpoints
//!
//! REST API for sales sessions, the domain catalog and saved customers.

use axum::{
    extract::{DefaultBodyLimit, Json, Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use dealer_assist_agent::{AppliedFields, SessionSummary, TurnOutcome};
use dealer_assist_core::ConversationStage;
use dealer_assist_persistence::CustomerEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::documents;
use crate::metrics::{metrics_handler, record_active_sessions, record_chat_turn, record_session_created};
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let timeout = Duration::from_secs(server.timeout_seconds);
    let body_limit = server.max_body_bytes;

    Router::new()
        // Sessions
        .route("/api/sessions", post(create_session).get(list_sessions))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/scenario", post(select_scenario))
        .route("/api/sessions/:id/chat", post(chat))
        .route("/api/sessions/:id/fields", post(update_fields))
        .route("/api/sessions/:id/stage", post(set_stage))
        .route("/api/sessions/:id/missing-fields", get(missing_fields))
        .route("/api/sessions/:id/form-data", get(form_data))
        .route("/api/sessions/:id/customer", post(save_customer))
        .route("/api/sessions/:id/documents", post(documents::generate_scenario_documents))
        .route(
            "/api/sessions/:id/documents/:template_id",
            post(documents::generate_document),
        )
        // Catalog
        .route("/api/scenarios", get(list_scenarios))
        .route("/api/fields", get(list_fields))
        .route("/api/documents", get(list_documents))
        // Customers
        .route("/api/customers", get(list_customers))
        .route("/api/customers/:id", get(get_customer).delete(delete_customer))
        // Templates
        .route(
            "/api/templates",
            post(documents::upload_template).get(documents::list_templates),
        )
        .route(
            "/api/templates/:id",
            get(documents::get_template).delete(documents::delete_template),
        )
        .route("/api/templates/:id/analyze", post(documents::analyze_template))
        // Health and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// CORS from configured origins; no origins means any
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed.len());
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(methods)
        .allow_headers(Any)
}

#[derive(Debug, Default, Deserialize)]
struct CreateSessionRequest {
    #[serde(default)]
    scenario_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateSessionResponse {
    session_id: String,
    greeting: String,
    stage: ConversationStage,
    missing_fields: Vec<String>,
}

async fn create_session(
    State(state): State<AppState>,
    request: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ServerError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let entry = state.sessions.create(request.scenario_id.as_deref())?;
    record_session_created();
    record_active_sessions(state.sessions.count());

    let guard = entry.lock().await;
    let session = &guard.session;
    let greeting = session
        .messages()
        .first()
        .map(|m| m.content.clone())
        .unwrap_or_default();

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id().to_string(),
            greeting,
            stage: session.stage(),
            missing_fields: session.missing_required_fields(),
        }),
    ))
}

async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.sessions.list();
    Json(serde_json::json!({
        "sessions": sessions,
        "count": sessions.len(),
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ServerError> {
    let entry = state.sessions.get(&id)?;
    let guard = entry.lock().await;
    Ok(Json(guard.session.summary()))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    if !state.sessions.remove(&id) {
        return Err(ServerError::SessionNotFound(id));
    }
    record_active_sessions(state.sessions.count());
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SelectScenarioRequest {
    scenario_id: String,
}

async fn select_scenario(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SelectScenarioRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let scenario_id = request.scenario_id.trim();
    if scenario_id.is_empty() {
        return Err(ServerError::InvalidRequest("scenario_id is empty".to_string()));
    }

    let entry = state.sessions.get(&id)?;
    let mut guard = entry.lock().await;
    let scenario = guard.session.select_scenario(scenario_id).clone();

    Ok(Json(serde_json::json!({
        "scenario": scenario,
        "required_documents": guard.session.required_documents(),
        "missing_fields": guard.session.missing_required_fields(),
    })))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<TurnOutcome>, ServerError> {
    let entry = state.sessions.get(&id)?;
    let mut guard = entry.lock().await;

    let started = Instant::now();
    let outcome = guard
        .session
        .handle_user_message(&request.message, state.chat_model.as_ref())
        .await?;
    record_chat_turn(
        started.elapsed().as_millis() as u64,
        outcome.extracted_fields.len(),
    );

    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
struct UpdateFieldsRequest {
    fields: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct UpdateFieldsResponse {
    applied: AppliedFields,
    missing_fields: Vec<String>,
}

/// Manual field entry
async fn update_fields(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateFieldsRequest>,
) -> Result<Json<UpdateFieldsResponse>, ServerError> {
    let entry = state.sessions.get(&id)?;
    let mut guard = entry.lock().await;
    let applied = guard.session.apply_fields(&request.fields);

    Ok(Json(UpdateFieldsResponse {
        applied,
        missing_fields: guard.session.missing_required_fields(),
    }))
}

#[derive(Debug, Deserialize)]
struct SetStageRequest {
    stage: ConversationStage,
}

async fn set_stage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SetStageRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let entry = state.sessions.get(&id)?;
    let mut guard = entry.lock().await;
    let current = guard.session.stage();

    match guard.session.set_stage(request.stage) {
        Some(transition) => Ok(Json(serde_json::json!({ "transition": transition }))),
        None => Err(ServerError::InvalidRequest(format!(
            "cannot move from {} to {}",
            current.as_str(),
            request.stage.as_str()
        ))),
    }
}

async fn missing_fields(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let entry = state.sessions.get(&id)?;
    let guard = entry.lock().await;
    Ok(Json(serde_json::json!({
        "missing_fields": guard.session.missing_required_fields(),
    })))
}

async fn form_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BTreeMap<String, String>>, ServerError> {
    let entry = state.sessions.get(&id)?;
    let guard = entry.lock().await;
    Ok(Json(guard.session.form_data()))
}

/// Insert the session's record as a customer, or update the one saved before
async fn save_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CustomerEntry>, ServerError> {
    let entry = state.sessions.get(&id)?;
    let mut guard = entry.lock().await;
    let record = guard.session.record().clone();
    let scenario_id = guard.session.scenario().map(|s| s.id.clone());

    let existing = match guard.customer_id.clone() {
        Some(customer_id) => state.persistence.customers.get(&customer_id).await?,
        None => None,
    };
    let customer = match existing {
        Some(mut customer) => {
            customer.record = record;
            customer.scenario_id = scenario_id;
            customer.updated_at = Utc::now();
            customer
        }
        None => {
            let mut customer = CustomerEntry::new(record);
            customer.scenario_id = scenario_id;
            customer
        }
    };

    state.persistence.customers.save(&customer).await?;
    tracing::info!(session_id = %id, customer_id = %customer.id, "Customer saved");
    guard.customer_id = Some(customer.id.clone());
    Ok(Json(customer))
}

async fn list_scenarios(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "scenarios": state.domain.scenarios.all() }))
}

async fn list_fields(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "fields": state.domain.fields.all() }))
}

async fn list_documents(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "documents": state.domain.documents.all() }))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default = "default_list_limit")]
    limit: usize,
}

fn default_list_limit() -> usize {
    50
}

async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let customers = state.persistence.customers.list(query.limit).await?;
    Ok(Json(serde_json::json!({
        "count": customers.len(),
        "customers": customers,
    })))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CustomerEntry>, ServerError> {
    state
        .persistence
        .customers
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("customer {id}")))
}

async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    if state.persistence.customers.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound(format!("customer {id}")))
    }
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.chat_model.model_name(),
        "sessions": state.sessions.count(),
        "catalog": {
            "fields": state.domain.fields.len(),
            "scenarios": state.domain.scenarios.all().len(),
            "documents": state.domain.documents.all().len(),
        },
    }))
}
