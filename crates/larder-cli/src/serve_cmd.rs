use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use larder_core::confirm::{ConfirmError, ConfirmReceipt, confirm_plan};
use larder_core::model::{Ingredient, PlanRequest, StoredPlan};
use larder_core::planner::DayGenerator;
use larder_core::{PantryItem, PlanError, service};
use larder_db::models::{MealEntry, User};
use larder_db::queries::{meal_entries, users};

use crate::user_cmds::ProfileChanges;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.into(),
        }
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        let status = match &err {
            PlanError::UserNotFound(_) => StatusCode::NOT_FOUND,
            PlanError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PlanError::MalformedResponse { .. } | PlanError::InvalidPlanSchema(_) => {
                StatusCode::BAD_GATEWAY
            }
            PlanError::UpstreamGeneration { status, .. } => status
                .filter(|code| larder_core::generator::backend::TRANSIENT_STATUSES.contains(code))
                .and_then(|code| StatusCode::from_u16(code).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            PlanError::PantryArithmetic(_) | PlanError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "plan request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<ConfirmError> for AppError {
    fn from(err: ConfirmError) -> Self {
        let status = match &err {
            ConfirmError::UserNotFound(_)
            | ConfirmError::PlanNotFound(_)
            | ConfirmError::NotOwner { .. } => StatusCode::NOT_FOUND,
            ConfirmError::CorruptPlan { .. }
            | ConfirmError::PantryArithmetic(_)
            | ConfirmError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "confirmation failed");
        }
        // Do not reveal that a plan exists for somebody else.
        let message = match err {
            ConfirmError::NotOwner { plan_id, .. } => format!("plan {plan_id} not found"),
            other => other.to_string(),
        };
        Self { status, message }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct NewUserBody {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    #[serde(default = "one_day")]
    pub days: u32,
}

fn one_day() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    20
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub generator: Arc<dyn DayGenerator>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/users", post(create_user))
        .route("/api/users/{id}", get(get_user).patch(update_user))
        .route("/api/users/{id}/pantry", get(get_pantry).put(put_pantry))
        .route("/api/users/{id}/plans", get(list_plans).post(create_plan))
        .route("/api/users/{id}/plans/{plan_id}", get(get_plan))
        .route("/api/users/{id}/plans/{plan_id}/confirm", post(confirm))
        .route("/api/users/{id}/meals", get(meal_history))
        .route("/api/users/{id}/shopping", get(pending_shopping))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve<G>(pool: PgPool, generator: G, bind: &str, port: u16) -> Result<()>
where
    G: DayGenerator + 'static,
{
    let app = build_router(AppState {
        pool,
        generator: Arc::new(generator),
    });
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("larder serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("larder serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for Ctrl+C; shutting down");
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn require_user(pool: &PgPool, id: Uuid) -> Result<User, AppError> {
    users::get_user(pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("user {id} not found")))
}

async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<NewUserBody>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let email = body.email.trim();
    if email.is_empty() {
        return Err(AppError::unprocessable("email must not be empty"));
    }
    let user = users::insert_user(&state.pool, email)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| {
            AppError::conflict(format!("a user with email {email:?} already exists"))
        })?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    Ok(Json(require_user(&state.pool, id).await?))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<ProfileChanges>,
) -> Result<Json<User>, AppError> {
    let user = changes
        .apply(&state.pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("user {id} not found")))?;
    Ok(Json(user))
}

async fn get_pantry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PantryItem>>, AppError> {
    require_user(&state.pool, id).await?;
    let pantry = service::load_pantry(&state.pool, id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(pantry))
}

async fn put_pantry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(items): Json<Vec<PantryItem>>,
) -> Result<Json<Vec<PantryItem>>, AppError> {
    require_user(&state.pool, id).await?;
    let stored = service::save_pantry(&state.pool, id, &items)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(stored))
}

async fn create_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DaysQuery>,
    Json(request): Json<PlanRequest>,
) -> Result<(StatusCode, Json<StoredPlan>), AppError> {
    let stored =
        service::plan_for_user(&state.pool, &*state.generator, id, request, query.days).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list_plans(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StoredPlan>>, AppError> {
    require_user(&state.pool, id).await?;
    let plans = service::list_plans_for_user(&state.pool, id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(plans))
}

async fn get_plan(
    State(state): State<AppState>,
    Path((id, plan_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<StoredPlan>, AppError> {
    let stored = service::get_plan_for_user(&state.pool, id, plan_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("plan {plan_id} not found")))?;
    Ok(Json(stored))
}

async fn confirm(
    State(state): State<AppState>,
    Path((id, plan_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ConfirmReceipt>, AppError> {
    Ok(Json(confirm_plan(&state.pool, id, plan_id).await?))
}

async fn pending_shopping(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Ingredient>>, AppError> {
    require_user(&state.pool, id).await?;
    let list = service::pending_shopping_list(&state.pool, id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(list))
}

async fn meal_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<MealEntry>>, AppError> {
    require_user(&state.pool, id).await?;
    let entries = meal_entries::list_meal_history(&state.pool, id, query.limit.max(1))
        .await
        .map_err(AppError::internal)?;
    Ok(Json(entries))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
