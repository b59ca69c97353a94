use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::UserRepo,
    domain::entities::user::{User, UserRole},
};

const SELECT_COLS: &str = r#"
    id, email, role, subscription_tier, subscription_valid_until,
    subscription_started_at, subscription_auto_renew,
    project_posts_used, communities_created, created_at, updated_at
"#;

fn row_to_user(row: &sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        role: row.get::<UserRole, _>("role"),
        subscription_tier: row.get("subscription_tier"),
        subscription_valid_until: row.get("subscription_valid_until"),
        subscription_started_at: row.get("subscription_started_at"),
        subscription_auto_renew: row.get("subscription_auto_renew"),
        project_posts_used: row.get("project_posts_used"),
        communities_created: row.get("communities_created"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl UserRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", SELECT_COLS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn activate_subscription(
        &self,
        user_id: Uuid,
        tier: &str,
        valid_until: DateTime<Utc>,
        started_at: DateTime<Utc>,
        auto_renew: bool,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                subscription_tier = $2,
                subscription_valid_until = $3,
                subscription_started_at = $4,
                subscription_auto_renew = $5,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(tier)
        .bind(valid_until)
        .bind(started_at)
        .bind(auto_renew)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn set_auto_renew(&self, user_id: Uuid, auto_renew: bool) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET subscription_auto_renew = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(user_id)
        .bind(auto_renew)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn downgrade_to_free(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                subscription_tier = 'free',
                subscription_valid_until = $2,
                subscription_auto_renew = false,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
