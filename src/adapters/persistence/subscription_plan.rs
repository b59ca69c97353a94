use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::{plan_catalog::PaginatedPlans, subscription::SubscriptionPlanRepo},
    domain::entities::{
        feature::Feature,
        subscription_plan::{BillingInterval, PlanBadge, SubscriptionPlan},
    },
};

const SELECT_COLS: &str = r#"
    id, name, price_cents, badge, color, trial_days, billing_interval,
    project_post_limit, community_limit, features, is_active,
    created_at, updated_at
"#;

fn row_to_plan(row: &sqlx::postgres::PgRow) -> AppResult<SubscriptionPlan> {
    let id: Uuid = row.get("id");
    let features_json: serde_json::Value = row.get("features");
    let features: Vec<Feature> =
        super::parse_json_with_fallback(&features_json, "features", "subscription_plan", &id.to_string());

    SubscriptionPlan::restore(
        id,
        row.get("name"),
        row.get("price_cents"),
        PlanBadge::from_str(row.get::<&str, _>("badge")),
        row.get("color"),
        row.get("trial_days"),
        BillingInterval::from_str(row.get::<&str, _>("billing_interval")),
        row.get("project_post_limit"),
        row.get("community_limit"),
        features,
        row.get("is_active"),
        row.get("created_at"),
        row.get("updated_at"),
    )
    .map_err(|e| AppError::Database(format!("Corrupt subscription_plans row {id}: {e}")))
}

#[async_trait]
impl SubscriptionPlanRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlan>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.as_ref().map(row_to_plan).transpose()
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Option<SubscriptionPlan>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans WHERE LOWER(name) = LOWER($1)",
            SELECT_COLS
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.as_ref().map(row_to_plan).transpose()
    }

    async fn list_active(&self) -> AppResult<Vec<SubscriptionPlan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans WHERE is_active = true ORDER BY price_cents ASC",
            SELECT_COLS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        rows.iter().map(row_to_plan).collect()
    }

    async fn list_paginated(
        &self,
        page: i32,
        per_page: i32,
        is_active: Option<bool>,
    ) -> AppResult<PaginatedPlans> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM subscription_plans WHERE ($1::boolean IS NULL OR is_active = $1)",
        )
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        let offset = (page as i64 - 1) * per_page as i64;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM subscription_plans
            WHERE ($1::boolean IS NULL OR is_active = $1)
            ORDER BY price_cents ASC, created_at ASC
            LIMIT $2 OFFSET $3
            "#,
            SELECT_COLS
        ))
        .bind(is_active)
        .bind(per_page as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;

        let plans: AppResult<Vec<SubscriptionPlan>> = rows.iter().map(row_to_plan).collect();
        Ok(PaginatedPlans {
            plans: plans?,
            total,
            page,
            per_page,
            total_pages: ((total + per_page as i64 - 1) / per_page as i64) as i32,
        })
    }

    async fn create(&self, plan: &SubscriptionPlan) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO subscription_plans
                (id, name, price_cents, badge, color, trial_days, billing_interval,
                 project_post_limit, community_limit, features, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(plan.id())
        .bind(plan.name())
        .bind(plan.price_cents())
        .bind(plan.badge().as_str())
        .bind(plan.color())
        .bind(plan.trial_days())
        .bind(plan.billing_interval().as_str())
        .bind(plan.project_post_limit())
        .bind(plan.community_limit())
        .bind(serde_json::to_value(plan.features()).unwrap_or(serde_json::Value::Null))
        .bind(plan.is_active())
        .bind(plan.created_at())
        .bind(plan.updated_at())
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn update(&self, plan: &SubscriptionPlan) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE subscription_plans SET
                name = $2,
                price_cents = $3,
                badge = $4,
                color = $5,
                trial_days = $6,
                billing_interval = $7,
                project_post_limit = $8,
                community_limit = $9,
                features = $10,
                is_active = $11,
                updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(plan.id())
        .bind(plan.name())
        .bind(plan.price_cents())
        .bind(plan.badge().as_str())
        .bind(plan.color())
        .bind(plan.trial_days())
        .bind(plan.billing_interval().as_str())
        .bind(plan.project_post_limit())
        .bind(plan.community_limit())
        .bind(serde_json::to_value(plan.features()).unwrap_or(serde_json::Value::Null))
        .bind(plan.is_active())
        .bind(plan.updated_at())
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
