use crate::admission::{AdmissionController, AdmissionDecision};
use crate::adapters::RequestParser;
use crate::deployment::{DeploymentOrchestrator, DeploymentStore};
use crate::escrow::LiquidityLocker;
use crate::fees::FeeRouter;
use crate::protection::AntiBotEngine;
use crate::types::{DeploymentRequest, RequestSource};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

/// Everything the HTTP surface needs. Thin by design: handlers admit, parse,
/// hand off to the orchestrator, and read component state — nothing else.
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionController>,
    pub parser: Arc<dyn RequestParser>,
    pub orchestrator: Arc<DeploymentOrchestrator>,
    pub store: Arc<DeploymentStore>,
    pub protection: Arc<AntiBotEngine>,
    pub locker: Arc<LiquidityLocker>,
    pub fees: Arc<FeeRouter>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/launch", post(launch))
        .route("/api/v1/deployments/:request_id", get(get_deployment))
        .route("/api/v1/protection/:token_id", get(get_protection))
        .route("/api/v1/locks/:lock_id", get(get_lock))
        .route("/api/v1/fees/:token_id", get(get_fees))
        .route("/api/v1/admission/stats", get(get_admission_stats))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

#[derive(Debug, Deserialize)]
pub struct LaunchBody {
    pub source: String,
    pub event_id: String,
    pub actor: String,
    pub text: String,
}

/// Inbound event -> admission -> parsing -> orchestration. The deployment
/// outcome, success or failure, comes back in the response body; only
/// admission rejections and parser transport trouble use error statuses.
async fn launch(State(state): State<AppState>, Json(body): Json<LaunchBody>) -> Response {
    let now = Utc::now().timestamp();

    match state
        .admission
        .admit(&body.source, &body.event_id, &body.actor, now)
        .await
    {
        AdmissionDecision::Duplicate => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "event already processed" })),
            )
                .into_response();
        }
        AdmissionDecision::RateLimited { retry_after_secs } => {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "rate limited",
                    "retry_after_secs": retry_after_secs,
                })),
            )
                .into_response();
        }
        AdmissionDecision::Allowed => {}
    }

    let parsed = match state.parser.parse(&body.text).await {
        Ok(parsed) => parsed,
        Err(e) => {
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": format!("parser unavailable: {}", e) })),
            )
                .into_response();
        }
    };
    if !parsed.is_request {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "message is not a token launch request" })),
        )
            .into_response();
    }

    let request_id = Uuid::new_v4();
    let request = DeploymentRequest {
        source: RequestSource::from_str(&body.source).unwrap_or(RequestSource::Api),
        actor_id: body.actor.clone(),
        raw_text: body.text.clone(),
        received_at: now,
    };

    info!(
        "Launch accepted from {} ({}), request {}",
        body.actor, body.source, request_id
    );
    let result = state
        .orchestrator
        .deploy(request_id, &request, &parsed, now)
        .await;
    Json(result).into_response()
}

async fn get_deployment(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Response {
    match state.store.get(request_id).await {
        Some(record) => Json(record).into_response(),
        None => not_found("deployment"),
    }
}

async fn get_protection(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> Response {
    match state.protection.snapshot(&token_id).await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => not_found("protection config"),
    }
}

async fn get_lock(State(state): State<AppState>, Path(lock_id): Path<Uuid>) -> Response {
    match state.locker.get(lock_id).await {
        Some(lock) => Json(lock).into_response(),
        None => not_found("lock"),
    }
}

async fn get_fees(State(state): State<AppState>, Path(token_id): Path<String>) -> Response {
    match state.fees.creator_account(&token_id).await {
        Some(account) => {
            let split = state.fees.split().await;
            Json(json!({ "account": account, "split": split })).into_response()
        }
        None => not_found("fee account"),
    }
}

async fn get_admission_stats(State(state): State<AppState>) -> Response {
    Json(state.admission.stats().await).into_response()
}

async fn health_check() -> &'static str {
    "OK"
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("{} not found", what) })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        InMemoryLedger, KeywordRequestParser, PlaceholderImageStudio, TemplateContentGenerator,
    };
    use crate::config::PlatformConfig;
    use crate::metadata::MetadataAssembler;
    use axum_test::TestServer;

    fn test_state() -> AppState {
        let config = PlatformConfig::default();
        let store = Arc::new(DeploymentStore::new());
        let protection = Arc::new(AntiBotEngine::new());
        let locker = Arc::new(LiquidityLocker::new(config.escrow.clone()));
        let fees = Arc::new(FeeRouter::new(&config.fees));
        let assembler = Arc::new(MetadataAssembler::new(
            Arc::new(TemplateContentGenerator),
            Arc::new(PlaceholderImageStudio),
        ));
        let orchestrator = Arc::new(DeploymentOrchestrator::new(
            config.deployment.clone(),
            config.normalizer.clone(),
            config.protection.clone(),
            store.clone(),
            assembler,
            Arc::new(InMemoryLedger::new()),
            protection.clone(),
            locker.clone(),
            fees.clone(),
        ));
        AppState {
            admission: Arc::new(AdmissionController::new(config.admission.clone())),
            parser: Arc::new(KeywordRequestParser),
            orchestrator,
            store,
            protection,
            locker,
            fees,
        }
    }

    #[tokio::test]
    async fn launch_round_trip_deploys_and_exposes_state() {
        let server = TestServer::new(router(test_state())).unwrap();

        let response = server
            .post("/api/v1/launch")
            .json(&json!({
                "source": "social",
                "event_id": "evt-1",
                "actor": "alice",
                "text": "create a rocket cat token called CatMoon with symbol CMON",
            }))
            .await;
        response.assert_status_ok();

        let result: serde_json::Value = response.json();
        assert_eq!(result["success"], true);
        let token_id = result["token_id"].as_str().unwrap().to_string();
        let request_id = result["request_id"].as_str().unwrap().to_string();

        let record = server
            .get(&format!("/api/v1/deployments/{}", request_id))
            .await;
        record.assert_status_ok();
        let record: serde_json::Value = record.json();
        assert_eq!(record["status"], "liquidity_locked");

        let snapshot = server
            .get(&format!("/api/v1/protection/{}", token_id))
            .await;
        snapshot.assert_status_ok();

        let fees = server.get(&format!("/api/v1/fees/{}", token_id)).await;
        fees.assert_status_ok();
    }

    #[tokio::test]
    async fn replayed_event_gets_conflict() {
        let server = TestServer::new(router(test_state())).unwrap();
        let body = json!({
            "source": "social",
            "event_id": "evt-dup",
            "actor": "alice",
            "text": "create a rocket cat token called CatMoon with symbol CMON",
        });

        server.post("/api/v1/launch").json(&body).await.assert_status_ok();
        let replay = server.post("/api/v1/launch").json(&body).await;
        replay.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn small_talk_is_unprocessable() {
        let server = TestServer::new(router(test_state())).unwrap();
        let response = server
            .post("/api/v1/launch")
            .json(&json!({
                "source": "social",
                "event_id": "evt-chat",
                "actor": "alice",
                "text": "good morning everyone",
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unknown_deployment_is_404() {
        let server = TestServer::new(router(test_state())).unwrap();
        let response = server
            .get(&format!("/api/v1/deployments/{}", Uuid::new_v4()))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}
