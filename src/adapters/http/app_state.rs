use std::sync::Arc;

use crate::{
    application::use_cases::{
        plan_catalog::PlanCatalogUseCases, subscription::SubscriptionUseCases,
    },
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub subscription_use_cases: Arc<SubscriptionUseCases>,
    pub plan_catalog_use_cases: Arc<PlanCatalogUseCases>,
}
