//! Test app state builder for HTTP-level integration testing.
//!
//! Provides `TestAppStateBuilder`, which creates a minimal `AppState` backed
//! by in-memory mocks for testing HTTP endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        plan_catalog::PlanCatalogUseCases,
        subscription::{SubscriptionPlanRepo, SubscriptionUseCases, UserRepo, UserSubscriptionRepo},
    },
    domain::entities::{
        subscription_plan::SubscriptionPlan, user::User, user_subscription::UserSubscription,
    },
    infra::config::AppConfig,
    test_utils::{InMemorySubscriptionPlanRepo, InMemoryUserRepo, InMemoryUserSubscriptionRepo},
};

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let plan = create_test_plan(|_| {});
/// let user = create_test_user(|u| u.role = UserRole::Admin);
///
/// let app_state = TestAppStateBuilder::new()
///     .with_plan(plan)
///     .with_user(user)
///     .build();
/// ```
#[derive(Default)]
pub struct TestAppStateBuilder {
    plans: Vec<SubscriptionPlan>,
    users: Vec<User>,
    subscriptions: Vec<UserSubscription>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(mut self, plan: SubscriptionPlan) -> Self {
        self.plans.push(plan);
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_subscription(mut self, subscription: UserSubscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Build the AppState, also handing back the mock repos for assertions.
    pub fn build_with_repos(
        self,
    ) -> (
        AppState,
        Arc<InMemorySubscriptionPlanRepo>,
        Arc<InMemoryUserSubscriptionRepo>,
        Arc<InMemoryUserRepo>,
    ) {
        let plan_repo = Arc::new(InMemorySubscriptionPlanRepo::with_plans(self.plans));
        let subscription_repo = Arc::new(InMemoryUserSubscriptionRepo::new());
        for sub in self.subscriptions {
            subscription_repo.insert(sub);
        }
        let user_repo = Arc::new(InMemoryUserRepo::with_users(self.users));

        let plan_repo_dyn = plan_repo.clone() as Arc<dyn SubscriptionPlanRepo>;
        let subscription_repo_dyn = subscription_repo.clone() as Arc<dyn UserSubscriptionRepo>;
        let user_repo_dyn = user_repo.clone() as Arc<dyn UserRepo>;

        let subscription_use_cases = Arc::new(SubscriptionUseCases::new(
            plan_repo_dyn.clone(),
            subscription_repo_dyn.clone(),
            user_repo_dyn.clone(),
        ));
        let plan_catalog_use_cases = Arc::new(PlanCatalogUseCases::new(
            plan_repo_dyn,
            subscription_repo_dyn,
            user_repo_dyn,
        ));

        // Minimal config for testing
        let config = Arc::new(AppConfig {
            jwt_secret: SecretString::new("test_jwt_secret".into()),
            access_token_ttl: Duration::hours(24),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            database_url: String::new(),
            expiry_sweep_interval: std::time::Duration::from_secs(3600),
        });

        let app_state = AppState {
            config,
            subscription_use_cases,
            plan_catalog_use_cases,
        };

        (app_state, plan_repo, subscription_repo, user_repo)
    }

    /// Build the AppState with all configured mocks.
    pub fn build(self) -> AppState {
        self.build_with_repos().0
    }
}
