use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        subscription_plan::{BillingInterval, SubscriptionPlan},
        user::User,
        user_subscription::{SubscriptionStatus, UserSubscription, advance_period},
    },
};

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait UserSubscriptionRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserSubscription>>;
    async fn get_by_user_id(&self, user_id: Uuid) -> AppResult<Option<UserSubscription>>;
    async fn create(&self, subscription: &UserSubscription) -> AppResult<()>;
    async fn update(&self, subscription: &UserSubscription) -> AppResult<()>;
    /// Subscriptions still marked active/trialing whose period end has passed.
    async fn list_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<UserSubscription>>;
    /// (plan_id, active subscriber count) pairs for the stats dashboard.
    async fn count_active_by_plan(&self) -> AppResult<Vec<(Uuid, i64)>>;
}

/// Collaborator for the denormalized User projection. Writes here are
/// best-effort: the subscription use cases log and swallow any failure.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn activate_subscription(
        &self,
        user_id: Uuid,
        tier: &str,
        valid_until: DateTime<Utc>,
        started_at: DateTime<Utc>,
        auto_renew: bool,
    ) -> AppResult<()>;
    async fn set_auto_renew(&self, user_id: Uuid, auto_renew: bool) -> AppResult<()>;
    async fn downgrade_to_free(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()>;
}

#[async_trait]
pub trait SubscriptionPlanRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlan>>;
    /// Case-insensitive name lookup, used for uniqueness checks.
    async fn get_by_name(&self, name: &str) -> AppResult<Option<SubscriptionPlan>>;
    async fn list_active(&self) -> AppResult<Vec<SubscriptionPlan>>;
    async fn list_paginated(
        &self,
        page: i32,
        per_page: i32,
        is_active: Option<bool>,
    ) -> AppResult<super::plan_catalog::PaginatedPlans>;
    async fn create(&self, plan: &SubscriptionPlan) -> AppResult<()>;
    async fn update(&self, plan: &SubscriptionPlan) -> AppResult<()>;
}

// ============================================================================
// Input / Output Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AssignSubscriptionInput {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    /// Defaults to the plan's own billing interval.
    pub billing_interval: Option<BillingInterval>,
    #[serde(default)]
    pub start_trial: bool,
}

/// One usage metric compared against the plan's numeric limit.
/// `limit: None` means unlimited.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UsageSummary {
    pub metric: String,
    pub used: i32,
    pub limit: Option<i32>,
}

/// Subscription plus everything the "my subscription" view needs, computed
/// in memory from the record and its plan.
#[derive(Debug, Clone)]
pub struct SubscriptionDetails {
    pub subscription: UserSubscription,
    pub plan: SubscriptionPlan,
    pub is_in_trial: bool,
    pub has_expired: bool,
    pub will_cancel_at_period_end: bool,
    pub days_until_renewal: i64,
    pub usage: Vec<UsageSummary>,
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct SubscriptionUseCases {
    plan_repo: Arc<dyn SubscriptionPlanRepo>,
    subscription_repo: Arc<dyn UserSubscriptionRepo>,
    user_repo: Arc<dyn UserRepo>,
}

impl SubscriptionUseCases {
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

    /// Assign a plan to a user, creating or mutating their single
    /// subscription record.
    ///
    /// Tie-break policy: re-assigning the plan a user is already actively
    /// subscribed to EXTENDS the current period by one interval; assigning a
    /// different plan SWITCHES immediately, starting a fresh period with no
    /// credit for unused time. A requested trial (when the plan offers one)
    /// overrides both and pins the period end to the trial end.
    pub async fn assign(&self, input: AssignSubscriptionInput) -> AppResult<UserSubscription> {
        let now = Utc::now();
        let plan = self
            .plan_repo
            .get_by_id(input.plan_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let interval = input.billing_interval.unwrap_or(plan.billing_interval());
        let start_trial = input.start_trial && plan.offers_trial();

        let existing = self.subscription_repo.get_by_user_id(input.user_id).await?;

        let subscription = match existing {
            Some(mut sub) => {
                let (period_start, period_end) = if sub.plan_id() == plan.id() && sub.is_active() {
                    // Extend: keep the original start, push the end out one
                    // interval from whichever is later, the current end or now.
                    let base = sub.current_period_end().max(now);
                    (sub.current_period_start(), advance_period(base, interval)?)
                } else {
                    // Switch: new period starts now, no proration.
                    (now, advance_period(now, interval)?)
                };

                if sub.status() == SubscriptionStatus::Canceled || sub.will_cancel_at_period_end()
                {
                    sub.reactivate(now)?;
                }
                sub.update_plan(plan.id(), Some(period_start), Some(period_end), now)?;
                if start_trial {
                    let trial_end = now + Duration::days(plan.trial_days() as i64);
                    sub.start_trial(now, trial_end, now)?;
                }
                self.subscription_repo.update(&sub).await?;
                sub
            }
            None => {
                let sub = if start_trial {
                    let trial_end = now + Duration::days(plan.trial_days() as i64);
                    UserSubscription::new(
                        input.user_id,
                        plan.id(),
                        SubscriptionStatus::Trialing,
                        now,
                        trial_end,
                        Some(now),
                        Some(trial_end),
                    )?
                } else {
                    UserSubscription::new(
                        input.user_id,
                        plan.id(),
                        SubscriptionStatus::Active,
                        now,
                        advance_period(now, interval)?,
                        None,
                        None,
                    )?
                };
                self.subscription_repo.create(&sub).await?;
                sub
            }
        };

        self.sync_projection(&plan, &subscription).await;
        Ok(subscription)
    }

    /// Cancel the caller's subscription, either at period end or right away.
    pub async fn cancel(&self, user_id: Uuid, immediately: bool) -> AppResult<UserSubscription> {
        let now = Utc::now();
        let mut sub = self
            .subscription_repo
            .get_by_user_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if immediately {
            sub.cancel_immediately(now)?;
        } else {
            sub.cancel_at_period_end(now)?;
        }
        self.subscription_repo.update(&sub).await?;

        // Projection update is best-effort: an immediate cancel drops the
        // user to the free tier, a deferred one only turns auto-renew off.
        let result = if immediately {
            self.user_repo.downgrade_to_free(user_id, now).await
        } else {
            self.user_repo.set_auto_renew(user_id, false).await
        };
        if let Err(e) = result {
            tracing::warn!(
                user_id = %user_id,
                error = ?e,
                "User projection sync failed after cancellation; subscription record is authoritative"
            );
        }

        Ok(sub)
    }

    /// Undo a pending or effective cancellation.
    pub async fn reactivate(&self, user_id: Uuid) -> AppResult<UserSubscription> {
        let now = Utc::now();
        let mut sub = self
            .subscription_repo
            .get_by_user_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        sub.reactivate(now)?;
        self.subscription_repo.update(&sub).await?;

        match self.plan_repo.get_by_id(sub.plan_id()).await {
            Ok(Some(plan)) => self.sync_projection(&plan, &sub).await,
            Ok(None) => {
                tracing::warn!(
                    user_id = %user_id,
                    plan_id = %sub.plan_id(),
                    "Reactivated subscription references a missing plan; projection not synced"
                );
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = ?e, "Plan load failed during projection sync");
            }
        }

        Ok(sub)
    }

    /// The caller's subscription with computed view fields, or None.
    pub async fn get_for_user(&self, user_id: Uuid) -> AppResult<Option<SubscriptionDetails>> {
        let Some(sub) = self.subscription_repo.get_by_user_id(user_id).await? else {
            return Ok(None);
        };
        let plan = self
            .plan_repo
            .get_by_id(sub.plan_id())
            .await?
            .ok_or_else(|| AppError::Internal("Subscription references a missing plan".into()))?;
        let user = self
            .user_repo
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let now = Utc::now();
        let usage = vec![
            UsageSummary {
                metric: "project_posts".into(),
                used: user.project_posts_used,
                limit: plan.project_post_limit(),
            },
            UsageSummary {
                metric: "communities".into(),
                used: user.communities_created,
                limit: plan.community_limit(),
            },
        ];

        Ok(Some(SubscriptionDetails {
            is_in_trial: sub.is_in_trial(now),
            has_expired: sub.has_expired(now),
            will_cancel_at_period_end: sub.will_cancel_at_period_end(),
            days_until_renewal: sub.days_until_renewal(now),
            usage,
            subscription: sub,
            plan,
        }))
    }

    /// Demote every subscription whose period has elapsed. Returns how many
    /// records were processed. Intended to be driven by the sweep loop or an
    /// external scheduler.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let due = self.subscription_repo.list_expired(now).await?;
        let mut processed = 0u64;

        for mut sub in due {
            sub.mark_unpaid(now);
            if let Err(e) = self.subscription_repo.update(&sub).await {
                tracing::error!(
                    subscription_id = %sub.id(),
                    error = ?e,
                    "Failed to demote expired subscription"
                );
                continue;
            }
            processed += 1;

            if let Err(e) = self.user_repo.downgrade_to_free(sub.user_id(), now).await {
                tracing::warn!(
                    user_id = %sub.user_id(),
                    error = ?e,
                    "User projection sync failed after expiry"
                );
            }
        }

        Ok(processed)
    }

    /// Mirror the authoritative record onto the User row. Failures are
    /// logged and swallowed; the subscription mutation already succeeded.
    async fn sync_projection(&self, plan: &SubscriptionPlan, sub: &UserSubscription) {
        let auto_renew = sub.is_active() && !sub.will_cancel_at_period_end();
        let result = self
            .user_repo
            .activate_subscription(
                sub.user_id(),
                plan.badge().tier_name(),
                sub.current_period_end(),
                sub.current_period_start(),
                auto_renew,
            )
            .await;
        if let Err(e) = result {
            tracing::warn!(
                user_id = %sub.user_id(),
                plan_id = %plan.id(),
                error = ?e,
                "User projection sync failed; subscription record is authoritative"
            );
        }
    }
}
