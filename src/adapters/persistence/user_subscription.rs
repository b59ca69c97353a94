use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::UserSubscriptionRepo,
    domain::entities::user_subscription::{SubscriptionStatus, UserSubscription},
};

const SELECT_COLS: &str = r#"
    id, user_id, plan_id, status, current_period_start, current_period_end,
    trial_start, trial_end, cancel_at, canceled_at, billing_reference,
    created_at, updated_at
"#;

fn row_to_subscription(row: &sqlx::postgres::PgRow) -> AppResult<UserSubscription> {
    let id: Uuid = row.get("id");
    UserSubscription::restore(
        id,
        row.get("user_id"),
        row.get("plan_id"),
        row.get::<SubscriptionStatus, _>("status"),
        row.get("current_period_start"),
        row.get("current_period_end"),
        row.get("trial_start"),
        row.get("trial_end"),
        row.get("cancel_at"),
        row.get("canceled_at"),
        row.get("billing_reference"),
        row.get("created_at"),
        row.get("updated_at"),
    )
    .map_err(|e| AppError::Database(format!("Corrupt user_subscriptions row {id}: {e}")))
}

#[async_trait]
impl UserSubscriptionRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserSubscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM user_subscriptions WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.as_ref().map(row_to_subscription).transpose()
    }

    async fn get_by_user_id(&self, user_id: Uuid) -> AppResult<Option<UserSubscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM user_subscriptions WHERE user_id = $1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.as_ref().map(row_to_subscription).transpose()
    }

    async fn create(&self, subscription: &UserSubscription) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_subscriptions
                (id, user_id, plan_id, status, current_period_start, current_period_end,
                 trial_start, trial_end, cancel_at, canceled_at, billing_reference,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(subscription.id())
        .bind(subscription.user_id())
        .bind(subscription.plan_id())
        .bind(subscription.status())
        .bind(subscription.current_period_start())
        .bind(subscription.current_period_end())
        .bind(subscription.trial_start())
        .bind(subscription.trial_end())
        .bind(subscription.cancel_at())
        .bind(subscription.canceled_at())
        .bind(subscription.billing_reference())
        .bind(subscription.created_at())
        .bind(subscription.updated_at())
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn update(&self, subscription: &UserSubscription) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE user_subscriptions SET
                plan_id = $2,
                status = $3,
                current_period_start = $4,
                current_period_end = $5,
                trial_start = $6,
                trial_end = $7,
                cancel_at = $8,
                canceled_at = $9,
                billing_reference = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(subscription.id())
        .bind(subscription.plan_id())
        .bind(subscription.status())
        .bind(subscription.current_period_start())
        .bind(subscription.current_period_end())
        .bind(subscription.trial_start())
        .bind(subscription.trial_end())
        .bind(subscription.cancel_at())
        .bind(subscription.canceled_at())
        .bind(subscription.billing_reference())
        .bind(subscription.updated_at())
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<UserSubscription>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM user_subscriptions
            WHERE status IN ('active', 'trialing') AND current_period_end < $1
            ORDER BY current_period_end ASC
            "#,
            SELECT_COLS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        rows.iter().map(row_to_subscription).collect()
    }

    async fn count_active_by_plan(&self) -> AppResult<Vec<(Uuid, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT plan_id, COUNT(*) AS subscriber_count
            FROM user_subscriptions
            WHERE status IN ('active', 'trialing')
            GROUP BY plan_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows
            .iter()
            .map(|row| (row.get("plan_id"), row.get("subscriber_count")))
            .collect())
    }
}
