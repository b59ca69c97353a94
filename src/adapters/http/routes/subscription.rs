use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::{
        jwt,
        use_cases::subscription::{SubscriptionDetails, UsageSummary},
    },
    domain::entities::{
        feature::Feature, subscription_plan::SubscriptionPlan,
        user_subscription::{SubscriptionStatus, UserSubscription},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/me", get(get_my_subscription))
        .route("/cancel", post(cancel_subscription))
        .route("/reactivate", post(reactivate_subscription))
}

#[derive(Serialize)]
pub struct PlanResponse {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i32,
    pub badge: String,
    pub color: String,
    pub trial_days: i32,
    pub billing_interval: String,
    pub project_post_limit: Option<i32>,
    pub community_limit: Option<i32>,
    pub features: Vec<Feature>,
    pub is_active: bool,
}

impl From<&SubscriptionPlan> for PlanResponse {
    fn from(plan: &SubscriptionPlan) -> Self {
        PlanResponse {
            id: plan.id(),
            name: plan.name().to_string(),
            price_cents: plan.price_cents(),
            badge: plan.badge().as_str().to_string(),
            color: plan.color().to_string(),
            trial_days: plan.trial_days(),
            billing_interval: plan.billing_interval().as_str().to_string(),
            project_post_limit: plan.project_post_limit(),
            community_limit: plan.community_limit(),
            features: plan.features().to_vec(),
            is_active: plan.is_active(),
        }
    }
}

#[derive(Serialize)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub cancel_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl From<&UserSubscription> for SubscriptionResponse {
    fn from(sub: &UserSubscription) -> Self {
        SubscriptionResponse {
            id: sub.id(),
            user_id: sub.user_id(),
            plan_id: sub.plan_id(),
            status: sub.status(),
            current_period_start: sub.current_period_start(),
            current_period_end: sub.current_period_end(),
            trial_start: sub.trial_start(),
            trial_end: sub.trial_end(),
            cancel_at: sub.cancel_at(),
            canceled_at: sub.canceled_at(),
        }
    }
}

async fn list_plans(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let plans = app_state.plan_catalog_use_cases.list_public().await?;
    Ok(Json(
        plans.iter().map(PlanResponse::from).collect::<Vec<_>>(),
    ))
}

#[derive(Serialize)]
struct MySubscriptionResponse {
    subscription: SubscriptionResponse,
    plan: PlanResponse,
    is_in_trial: bool,
    has_expired: bool,
    will_cancel_at_period_end: bool,
    days_until_renewal: i64,
    usage: Vec<UsageSummary>,
}

impl From<SubscriptionDetails> for MySubscriptionResponse {
    fn from(details: SubscriptionDetails) -> Self {
        MySubscriptionResponse {
            subscription: SubscriptionResponse::from(&details.subscription),
            plan: PlanResponse::from(&details.plan),
            is_in_trial: details.is_in_trial,
            has_expired: details.has_expired,
            will_cancel_at_period_end: details.will_cancel_at_period_end,
            days_until_renewal: details.days_until_renewal,
            usage: details.usage,
        }
    }
}

async fn get_my_subscription(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&jar, &app_state)?;

    let details = app_state.subscription_use_cases.get_for_user(user_id).await?;

    Ok(Json(details.map(MySubscriptionResponse::from)))
}

#[derive(Deserialize, Default)]
struct CancelRequest {
    #[serde(default)]
    immediately: bool,
}

async fn cancel_subscription(
    State(app_state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<CancelRequest>>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&jar, &app_state)?;
    let Json(request) = body.unwrap_or_default();

    let sub = app_state
        .subscription_use_cases
        .cancel(user_id, request.immediately)
        .await?;

    Ok(Json(SubscriptionResponse::from(&sub)))
}

async fn reactivate_subscription(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&jar, &app_state)?;

    let sub = app_state.subscription_use_cases.reactivate(user_id).await?;

    Ok(Json(SubscriptionResponse::from(&sub)))
}

pub(super) fn current_user(jar: &CookieJar, app_state: &AppState) -> AppResult<Uuid> {
    let Some(access_cookie) = jar.get("access_token") else {
        return Err(AppError::InvalidCredentials);
    };
    let claims = jwt::verify(access_cookie.value(), &app_state.config.jwt_secret)?;
    claims.user_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use serde_json::json;

    use crate::{
        domain::entities::user::UserRole,
        test_utils::{TestAppStateBuilder, create_test_plan, create_test_subscription, create_test_user},
    };

    fn access_cookie(app_state: &AppState, user_id: Uuid) -> Cookie<'static> {
        let token = jwt::issue(
            user_id,
            UserRole::User,
            &app_state.config.jwt_secret,
            time::Duration::hours(1),
        )
        .unwrap();
        Cookie::new("access_token", token)
    }

    fn server(app_state: AppState) -> TestServer {
        TestServer::new(router().with_state(app_state)).unwrap()
    }

    #[tokio::test]
    async fn list_plans_is_public_and_sorted_content() {
        let plan = create_test_plan(|_| {});
        let app_state = TestAppStateBuilder::new().with_plan(plan.clone()).build();
        let server = server(app_state);

        let response = server.get("/plans").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body: serde_json::Value = response.json();
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], plan.name());
        assert_eq!(body[0]["price_cents"], plan.price_cents());
    }

    #[tokio::test]
    async fn me_requires_authentication() {
        let app_state = TestAppStateBuilder::new().build();
        let server = server(app_state);

        let response = server.get("/me").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_returns_computed_subscription_view() {
        let plan = create_test_plan(|_| {});
        let user = create_test_user(|_| {});
        let user_id = user.id;
        let sub = create_test_subscription(user_id, plan.id(), |_| {});

        let app_state = TestAppStateBuilder::new()
            .with_plan(plan.clone())
            .with_user(user)
            .with_subscription(sub)
            .build();
        let cookie = access_cookie(&app_state, user_id);
        let server = server(app_state);

        let response = server.get("/me").add_cookie(cookie).await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body: serde_json::Value = response.json();
        assert_eq!(body["subscription"]["status"], "active");
        assert_eq!(body["plan"]["id"], plan.id().to_string());
        assert_eq!(body["is_in_trial"], false);
        assert_eq!(body["usage"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn me_without_subscription_is_null() {
        let user = create_test_user(|_| {});
        let user_id = user.id;
        let app_state = TestAppStateBuilder::new().with_user(user).build();
        let cookie = access_cookie(&app_state, user_id);
        let server = server(app_state);

        let response = server.get("/me").add_cookie(cookie).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn cancel_defaults_to_period_end() {
        let plan = create_test_plan(|_| {});
        let user = create_test_user(|_| {});
        let user_id = user.id;
        let sub = create_test_subscription(user_id, plan.id(), |_| {});
        let period_end = sub.current_period_end();

        let app_state = TestAppStateBuilder::new()
            .with_plan(plan)
            .with_user(user)
            .with_subscription(sub)
            .build();
        let cookie = access_cookie(&app_state, user_id);
        let server = server(app_state);

        let response = server.post("/cancel").add_cookie(cookie).await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "canceled");
        assert_eq!(
            body["cancel_at"],
            json!(period_end.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
        );
    }

    #[tokio::test]
    async fn cancel_twice_returns_conflict_payload() {
        let plan = create_test_plan(|_| {});
        let user = create_test_user(|_| {});
        let user_id = user.id;
        let sub = create_test_subscription(user_id, plan.id(), |_| {});

        let app_state = TestAppStateBuilder::new()
            .with_plan(plan)
            .with_user(user)
            .with_subscription(sub)
            .build();
        let cookie = access_cookie(&app_state, user_id);
        let server = server(app_state);

        server.post("/cancel").add_cookie(cookie.clone()).await;
        let response = server
            .post("/cancel")
            .add_cookie(cookie)
            .json(&json!({ "immediately": true }))
            .await;

        assert_eq!(response.status_code(), StatusCode::CONFLICT);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "CONFLICT");
        assert!(body["message"].as_str().unwrap().contains("canceled"));
    }

    #[tokio::test]
    async fn reactivate_after_deferred_cancel_succeeds() {
        let plan = create_test_plan(|_| {});
        let user = create_test_user(|_| {});
        let user_id = user.id;
        let mut sub = create_test_subscription(user_id, plan.id(), |_| {});
        sub.cancel_at_period_end(chrono::Utc::now()).unwrap();

        let app_state = TestAppStateBuilder::new()
            .with_plan(plan)
            .with_user(user)
            .with_subscription(sub)
            .build();
        let cookie = access_cookie(&app_state, user_id);
        let server = server(app_state);

        let response = server.post("/reactivate").add_cookie(cookie).await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "active");
        assert!(body["cancel_at"].is_null());
    }

    #[tokio::test]
    async fn reactivate_without_subscription_is_not_found() {
        let user = create_test_user(|_| {});
        let user_id = user.id;
        let app_state = TestAppStateBuilder::new().with_user(user).build();
        let cookie = access_cookie(&app_state, user_id);
        let server = server(app_state);

        let response = server.post("/reactivate").add_cookie(cookie).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }
}
