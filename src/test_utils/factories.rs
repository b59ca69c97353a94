//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible
//! defaults. Use the closure parameter to override specific fields as needed.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::entities::{
    subscription_plan::{BillingInterval, PlanBadge, SubscriptionPlan},
    user::{User, UserRole},
    user_subscription::{SubscriptionStatus, UserSubscription, advance_period},
};

/// Create a monthly "Starter" plan with sensible defaults.
pub fn create_test_plan(overrides: impl FnOnce(&mut SubscriptionPlan)) -> SubscriptionPlan {
    let mut plan = SubscriptionPlan::new(
        "Starter",
        1000,
        PlanBadge::Starter,
        "#4f46e5",
        0,
        BillingInterval::Monthly,
        Some(5),
        Some(1),
    )
    .expect("default test plan should be valid");
    overrides(&mut plan);
    plan
}

/// Create an active subscription covering one month starting now.
pub fn create_test_subscription(
    user_id: Uuid,
    plan_id: Uuid,
    overrides: impl FnOnce(&mut UserSubscription),
) -> UserSubscription {
    let now = Utc::now();
    let period_end =
        advance_period(now, BillingInterval::Monthly).expect("period arithmetic should not overflow");
    let mut subscription = UserSubscription::new(
        user_id,
        plan_id,
        SubscriptionStatus::Active,
        now,
        period_end,
        None,
        None,
    )
    .expect("default test subscription should be valid");
    overrides(&mut subscription);
    subscription
}

/// Create a free-tier user with no usage.
pub fn create_test_user(overrides: impl FnOnce(&mut User)) -> User {
    let now = Utc::now();
    let mut user = User {
        id: Uuid::new_v4(),
        email: "user@example.com".to_string(),
        role: UserRole::User,
        subscription_tier: "free".to_string(),
        subscription_valid_until: None,
        subscription_started_at: None,
        subscription_auto_renew: false,
        project_posts_used: 0,
        communities_created: 0,
        created_at: Some(now),
        updated_at: Some(now),
    };
    overrides(&mut user);
    user
}
