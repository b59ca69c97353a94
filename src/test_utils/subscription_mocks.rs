//! In-memory mock implementations for the subscription repository traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        plan_catalog::PaginatedPlans,
        subscription::{SubscriptionPlanRepo, UserRepo, UserSubscriptionRepo},
    },
    domain::entities::{
        subscription_plan::SubscriptionPlan, user::User, user_subscription::UserSubscription,
    },
};

// ============================================================================
// InMemorySubscriptionPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemorySubscriptionPlanRepo {
    pub plans: Mutex<HashMap<Uuid, SubscriptionPlan>>,
    reads: AtomicUsize,
}

impl InMemorySubscriptionPlanRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plans(plans: Vec<SubscriptionPlan>) -> Self {
        let map: HashMap<Uuid, SubscriptionPlan> =
            plans.into_iter().map(|p| (p.id(), p)).collect();
        Self {
            plans: Mutex::new(map),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<SubscriptionPlan> {
        self.plans.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.plans.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of read operations since the last reset, for asserting that a
    /// code path never touched the plan repo.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn reset_read_count(&self) {
        self.reads.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubscriptionPlanRepo for InMemorySubscriptionPlanRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlan>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.plans.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Option<SubscriptionPlan>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .plans
            .lock()
            .unwrap()
            .values()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
            .cloned())
    }

    async fn list_active(&self) -> AppResult<Vec<SubscriptionPlan>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut plans: Vec<SubscriptionPlan> = self
            .plans
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.is_active())
            .cloned()
            .collect();
        plans.sort_by_key(|p| p.price_cents());
        Ok(plans)
    }

    async fn list_paginated(
        &self,
        page: i32,
        per_page: i32,
        is_active: Option<bool>,
    ) -> AppResult<PaginatedPlans> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut plans: Vec<SubscriptionPlan> = self
            .plans
            .lock()
            .unwrap()
            .values()
            .filter(|p| is_active.is_none_or(|active| p.is_active() == active))
            .cloned()
            .collect();
        plans.sort_by_key(|p| p.price_cents());

        let total = plans.len() as i64;
        let start = ((page - 1) * per_page) as usize;
        let plans: Vec<SubscriptionPlan> = plans
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();
        Ok(PaginatedPlans {
            plans,
            total,
            page,
            per_page,
            total_pages: ((total + per_page as i64 - 1) / per_page as i64) as i32,
        })
    }

    async fn create(&self, plan: &SubscriptionPlan) -> AppResult<()> {
        self.plans.lock().unwrap().insert(plan.id(), plan.clone());
        Ok(())
    }

    async fn update(&self, plan: &SubscriptionPlan) -> AppResult<()> {
        let mut plans = self.plans.lock().unwrap();
        if !plans.contains_key(&plan.id()) {
            return Err(AppError::NotFound);
        }
        plans.insert(plan.id(), plan.clone());
        Ok(())
    }
}

// ============================================================================
// InMemoryUserSubscriptionRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserSubscriptionRepo {
    pub subscriptions: Mutex<HashMap<Uuid, UserSubscription>>,
    count_queries: AtomicUsize,
}

impl InMemoryUserSubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, subscription: UserSubscription) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id(), subscription);
    }

    pub fn get(&self, id: Uuid) -> Option<UserSubscription> {
        self.subscriptions.lock().unwrap().get(&id).cloned()
    }

    pub fn find_by_user(&self, user_id: Uuid) -> Option<UserSubscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .values()
            .find(|s| s.user_id() == user_id)
            .cloned()
    }

    /// How many times the stats aggregation query ran.
    pub fn count_queries(&self) -> usize {
        self.count_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserSubscriptionRepo for InMemoryUserSubscriptionRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserSubscription>> {
        Ok(self.subscriptions.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_user_id(&self, user_id: Uuid) -> AppResult<Option<UserSubscription>> {
        Ok(self.find_by_user(user_id))
    }

    async fn create(&self, subscription: &UserSubscription) -> AppResult<()> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if subscriptions
            .values()
            .any(|s| s.user_id() == subscription.user_id())
        {
            return Err(AppError::Conflict(
                "User already has a subscription".into(),
            ));
        }
        subscriptions.insert(subscription.id(), subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &UserSubscription) -> AppResult<()> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if !subscriptions.contains_key(&subscription.id()) {
            return Err(AppError::NotFound);
        }
        subscriptions.insert(subscription.id(), subscription.clone());
        Ok(())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<UserSubscription>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.is_active() && s.has_expired(now))
            .cloned()
            .collect())
    }

    async fn count_active_by_plan(&self) -> AppResult<Vec<(Uuid, i64)>> {
        self.count_queries.fetch_add(1, Ordering::SeqCst);
        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for sub in self.subscriptions.lock().unwrap().values() {
            if sub.is_active() {
                *counts.entry(sub.plan_id()).or_insert(0) += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }
}

// ============================================================================
// InMemoryUserRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepo {
    pub users: Mutex<HashMap<Uuid, User>>,
    fail_writes: AtomicBool,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        let map: HashMap<Uuid, User> = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Mutex::new(map),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    /// Make every projection write fail, to exercise best-effort sync paths.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated projection write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn activate_subscription(
        &self,
        user_id: Uuid,
        tier: &str,
        valid_until: DateTime<Utc>,
        started_at: DateTime<Utc>,
        auto_renew: bool,
    ) -> AppResult<()> {
        self.check_writable()?;
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(AppError::NotFound)?;
        user.subscription_tier = tier.to_string();
        user.subscription_valid_until = Some(valid_until);
        user.subscription_started_at = Some(started_at);
        user.subscription_auto_renew = auto_renew;
        user.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn set_auto_renew(&self, user_id: Uuid, auto_renew: bool) -> AppResult<()> {
        self.check_writable()?;
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(AppError::NotFound)?;
        user.subscription_auto_renew = auto_renew;
        user.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn downgrade_to_free(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        self.check_writable()?;
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(AppError::NotFound)?;
        user.subscription_tier = "free".to_string();
        user.subscription_valid_until = Some(now);
        user.subscription_auto_renew = false;
        user.updated_at = Some(Utc::now());
        Ok(())
    }
}
