use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::subscription::{SubscriptionPlanRepo, UserRepo, UserSubscriptionRepo};
use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        feature::{Feature, FeatureType},
        subscription_plan::{BillingInterval, PlanBadge, PlanUpdate, SubscriptionPlan},
    },
};

// ============================================================================
// Input / Output Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlanInput {
    pub name: String,
    pub price_cents: i32,
    pub badge: PlanBadge,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub trial_days: i32,
    pub billing_interval: BillingInterval,
    pub project_post_limit: Option<i32>,
    pub community_limit: Option<i32>,
    #[serde(default)]
    pub features: Vec<CreateFeatureInput>,
}

fn default_color() -> String {
    "#6b7280".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFeatureInput {
    pub name: String,
    pub description: Option<String>,
    pub feature_type: FeatureType,
    pub limit_value: Option<i32>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub is_highlighted: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct PaginatedPlans {
    pub plans: Vec<SubscriptionPlan>,
    pub total: i64,
    pub page: i32,
    pub per_page: i32,
    pub total_pages: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanDistribution {
    pub plan_id: Uuid,
    pub plan_name: String,
    pub subscriber_count: i64,
    pub monthly_revenue_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStats {
    pub active_subscribers: i64,
    pub monthly_revenue_cents: i64,
    pub plan_distribution: Vec<PlanDistribution>,
}

/// What one active subscription contributes to monthly recurring revenue:
/// the plan price amortized over its billing window.
fn monthly_amount_cents(price_cents: i32, interval: BillingInterval) -> f64 {
    price_cents as f64 / interval.months() as f64
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct PlanCatalogUseCases {
    plan_repo: Arc<dyn SubscriptionPlanRepo>,
    subscription_repo: Arc<dyn UserSubscriptionRepo>,
    user_repo: Arc<dyn UserRepo>,
}

impl PlanCatalogUseCases {
    pub fn new(
        plan_repo: Arc<dyn SubscriptionPlanRepo>,
        subscription_repo: Arc<dyn UserSubscriptionRepo>,
        user_repo: Arc<dyn UserRepo>,
    ) -> Self {
        Self {
            plan_repo,
            subscription_repo,
            user_repo,
        }
    }

    /// Every admin operation starts here, before any other read.
    async fn ensure_admin(&self, caller_id: Uuid) -> AppResult<()> {
        let caller = self
            .user_repo
            .get_by_id(caller_id)
            .await?
            .ok_or(AppError::Forbidden)?;
        if !caller.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    /// Active plans, for the public pricing page.
    pub async fn list_public(&self) -> AppResult<Vec<SubscriptionPlan>> {
        self.plan_repo.list_active().await
    }

    pub async fn list_plans(
        &self,
        caller_id: Uuid,
        page: i32,
        per_page: i32,
        is_active: Option<bool>,
    ) -> AppResult<PaginatedPlans> {
        self.ensure_admin(caller_id).await?;
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        self.plan_repo.list_paginated(page, per_page, is_active).await
    }

    pub async fn get_plan(&self, caller_id: Uuid, plan_id: Uuid) -> AppResult<SubscriptionPlan> {
        self.ensure_admin(caller_id).await?;
        self.plan_repo
            .get_by_id(plan_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn create_plan(
        &self,
        caller_id: Uuid,
        input: CreatePlanInput,
    ) -> AppResult<SubscriptionPlan> {
        self.ensure_admin(caller_id).await?;

        if self.plan_repo.get_by_name(&input.name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "A plan named '{}' already exists",
                input.name
            )));
        }

        let mut plan = SubscriptionPlan::new(
            &input.name,
            input.price_cents,
            input.badge,
            &input.color,
            input.trial_days,
            input.billing_interval,
            input.project_post_limit,
            input.community_limit,
        )?;
        for f in input.features {
            let feature = Feature::new(
                None,
                &f.name,
                f.description,
                f.feature_type,
                f.limit_value,
                f.is_enabled,
                f.display_order,
                f.is_highlighted,
            )?;
            plan.add_feature(feature)?;
        }

        self.plan_repo.create(&plan).await?;
        Ok(plan)
    }

    pub async fn update_plan(
        &self,
        caller_id: Uuid,
        plan_id: Uuid,
        update: PlanUpdate,
    ) -> AppResult<SubscriptionPlan> {
        self.ensure_admin(caller_id).await?;

        let mut plan = self
            .plan_repo
            .get_by_id(plan_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if let Some(new_name) = &update.name
            && !new_name.eq_ignore_ascii_case(plan.name())
            && let Some(other) = self.plan_repo.get_by_name(new_name).await?
            && other.id() != plan.id()
        {
            return Err(AppError::Conflict(format!(
                "A plan named '{new_name}' already exists"
            )));
        }

        plan.apply_update(update)?;
        self.plan_repo.update(&plan).await?;
        Ok(plan)
    }

    /// Soft delete. The plan disappears from the public catalog but existing
    /// subscriptions keep referencing it.
    pub async fn deactivate_plan(
        &self,
        caller_id: Uuid,
        plan_id: Uuid,
    ) -> AppResult<SubscriptionPlan> {
        self.ensure_admin(caller_id).await?;

        let mut plan = self
            .plan_repo
            .get_by_id(plan_id)
            .await?
            .ok_or(AppError::NotFound)?;
        plan.deactivate()?;
        self.plan_repo.update(&plan).await?;
        Ok(plan)
    }

    pub async fn stats(&self, caller_id: Uuid) -> AppResult<SubscriptionStats> {
        self.ensure_admin(caller_id).await?;

        let counts = self.subscription_repo.count_active_by_plan().await?;
        let mut distribution = Vec::with_capacity(counts.len());
        let mut active_subscribers = 0i64;
        let mut revenue = 0f64;

        for (plan_id, count) in counts {
            let Some(plan) = self.plan_repo.get_by_id(plan_id).await? else {
                tracing::warn!(plan_id = %plan_id, "Active subscriptions reference a missing plan");
                continue;
            };
            let plan_revenue =
                monthly_amount_cents(plan.price_cents(), plan.billing_interval()) * count as f64;
            active_subscribers += count;
            revenue += plan_revenue;
            distribution.push(PlanDistribution {
                plan_id,
                plan_name: plan.name().to_string(),
                subscriber_count: count,
                monthly_revenue_cents: plan_revenue.round() as i64,
            });
        }

        Ok(SubscriptionStats {
            active_subscribers,
            monthly_revenue_cents: revenue.round() as i64,
            plan_distribution: distribution,
        })
    }
}
