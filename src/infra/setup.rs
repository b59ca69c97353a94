use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        plan_catalog::PlanCatalogUseCases,
        subscription::{SubscriptionPlanRepo, SubscriptionUseCases, UserRepo, UserSubscriptionRepo},
    },
    infra::{config::AppConfig, postgres_persistence},
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let plan_repo = postgres_arc.clone() as Arc<dyn SubscriptionPlanRepo>;
    let subscription_repo = postgres_arc.clone() as Arc<dyn UserSubscriptionRepo>;
    let user_repo = postgres_arc.clone() as Arc<dyn UserRepo>;

    let subscription_use_cases = SubscriptionUseCases::new(
        plan_repo.clone(),
        subscription_repo.clone(),
        user_repo.clone(),
    );

    let plan_catalog_use_cases =
        PlanCatalogUseCases::new(plan_repo, subscription_repo, user_repo);

    Ok(AppState {
        config: Arc::new(config),
        subscription_use_cases: Arc::new(subscription_use_cases),
        plan_catalog_use_cases: Arc::new(plan_catalog_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skillforge_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don’t show target (module path)
        .with_level(true) // show log level
        .pretty(); // human-friendly, with colors

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
