use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::subscription::{PlanResponse, SubscriptionResponse, current_user};
use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::use_cases::{
        plan_catalog::CreatePlanInput,
        subscription::AssignSubscriptionInput,
    },
    domain::entities::subscription_plan::PlanUpdate,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans).post(create_plan))
        .route(
            "/plans/{id}",
            get(get_plan).put(update_plan).delete(deactivate_plan),
        )
        .route("/stats", get(get_stats))
        .route("/assign", post(assign_subscription))
}

#[derive(Deserialize)]
struct ListPlansQuery {
    page: Option<i32>,
    per_page: Option<i32>,
    is_active: Option<bool>,
}

#[derive(Serialize)]
struct PaginatedPlansResponse {
    plans: Vec<PlanResponse>,
    total: i64,
    page: i32,
    per_page: i32,
    total_pages: i32,
}

async fn list_plans(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ListPlansQuery>,
) -> AppResult<impl IntoResponse> {
    let caller_id = current_user(&jar, &app_state)?;

    let page = app_state
        .plan_catalog_use_cases
        .list_plans(
            caller_id,
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(20),
            query.is_active,
        )
        .await?;

    Ok(Json(PaginatedPlansResponse {
        plans: page.plans.iter().map(PlanResponse::from).collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        total_pages: page.total_pages,
    }))
}

async fn get_plan(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(plan_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let caller_id = current_user(&jar, &app_state)?;

    let plan = app_state
        .plan_catalog_use_cases
        .get_plan(caller_id, plan_id)
        .await?;

    Ok(Json(PlanResponse::from(&plan)))
}

async fn create_plan(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<CreatePlanInput>,
) -> AppResult<impl IntoResponse> {
    let caller_id = current_user(&jar, &app_state)?;

    let plan = app_state
        .plan_catalog_use_cases
        .create_plan(caller_id, input)
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(PlanResponse::from(&plan)),
    ))
}

async fn update_plan(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(plan_id): Path<Uuid>,
    Json(update): Json<PlanUpdate>,
) -> AppResult<impl IntoResponse> {
    let caller_id = current_user(&jar, &app_state)?;

    let plan = app_state
        .plan_catalog_use_cases
        .update_plan(caller_id, plan_id, update)
        .await?;

    Ok(Json(PlanResponse::from(&plan)))
}

async fn deactivate_plan(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Path(plan_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let caller_id = current_user(&jar, &app_state)?;

    let plan = app_state
        .plan_catalog_use_cases
        .deactivate_plan(caller_id, plan_id)
        .await?;

    Ok(Json(PlanResponse::from(&plan)))
}

async fn get_stats(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    let caller_id = current_user(&jar, &app_state)?;

    let stats = app_state.plan_catalog_use_cases.stats(caller_id).await?;

    Ok(Json(stats))
}

async fn assign_subscription(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<AssignSubscriptionInput>,
) -> AppResult<impl IntoResponse> {
    let caller_id = current_user(&jar, &app_state)?;

    // Admin gate lives in the catalog use cases; reuse it so assignment
    // follows the same rule as the rest of the admin surface.
    app_state
        .plan_catalog_use_cases
        .get_plan(caller_id, input.plan_id)
        .await?;

    let sub = app_state.subscription_use_cases.assign(input).await?;

    Ok(Json(SubscriptionResponse::from(&sub)))
}
