use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::domain::entities::subscription_plan::BillingInterval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Unpaid,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "active" => SubscriptionStatus::Active,
            "trialing" => SubscriptionStatus::Trialing,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" | "cancelled" => SubscriptionStatus::Canceled,
            _ => SubscriptionStatus::Unpaid,
        }
    }
}

/// One logical subscription per user. All mutation goes through named methods
/// so the record can never hold an inconsistent combination of status and
/// timestamps (e.g. CANCELED without `canceled_at`).
#[derive(Debug, Clone)]
pub struct UserSubscription {
    id: Uuid,
    user_id: Uuid,
    plan_id: Uuid,
    status: SubscriptionStatus,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
    trial_start: Option<DateTime<Utc>>,
    trial_end: Option<DateTime<Utc>>,
    cancel_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    billing_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserSubscription {
    /// Create a fresh subscription record. Validates period and trial bounds.
    pub fn new(
        user_id: Uuid,
        plan_id: Uuid,
        status: SubscriptionStatus,
        current_period_start: DateTime<Utc>,
        current_period_end: DateTime<Utc>,
        trial_start: Option<DateTime<Utc>>,
        trial_end: Option<DateTime<Utc>>,
    ) -> AppResult<Self> {
        let now = Utc::now();
        Self::restore(
            Uuid::new_v4(),
            user_id,
            plan_id,
            status,
            current_period_start,
            current_period_end,
            trial_start,
            trial_end,
            None,
            None,
            None,
            now,
            now,
        )
    }

    /// Rehydrate a subscription from storage, re-checking every invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        user_id: Uuid,
        plan_id: Uuid,
        status: SubscriptionStatus,
        current_period_start: DateTime<Utc>,
        current_period_end: DateTime<Utc>,
        trial_start: Option<DateTime<Utc>>,
        trial_end: Option<DateTime<Utc>>,
        cancel_at: Option<DateTime<Utc>>,
        canceled_at: Option<DateTime<Utc>>,
        billing_reference: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        if current_period_end <= current_period_start {
            return Err(AppError::InvalidInput(
                "Period end must be after period start".into(),
            ));
        }
        if let (Some(ts), Some(te)) = (trial_start, trial_end)
            && te <= ts
        {
            return Err(AppError::InvalidInput(
                "Trial end must be after trial start".into(),
            ));
        }
        if status == SubscriptionStatus::Canceled && canceled_at.is_none() {
            return Err(AppError::InvalidInput(
                "Canceled subscription requires canceled_at".into(),
            ));
        }
        if status == SubscriptionStatus::Trialing && (trial_start.is_none() || trial_end.is_none())
        {
            return Err(AppError::InvalidInput(
                "Trialing subscription requires trial bounds".into(),
            ));
        }
        Ok(Self {
            id,
            user_id,
            plan_id,
            status,
            current_period_start,
            current_period_end,
            trial_start,
            trial_end,
            cancel_at,
            canceled_at,
            billing_reference,
            created_at,
            updated_at,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn plan_id(&self) -> Uuid {
        self.plan_id
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    pub fn current_period_start(&self) -> DateTime<Utc> {
        self.current_period_start
    }

    pub fn current_period_end(&self) -> DateTime<Utc> {
        self.current_period_end
    }

    pub fn trial_start(&self) -> Option<DateTime<Utc>> {
        self.trial_start
    }

    pub fn trial_end(&self) -> Option<DateTime<Utc>> {
        self.trial_end
    }

    pub fn cancel_at(&self) -> Option<DateTime<Utc>> {
        self.cancel_at
    }

    pub fn canceled_at(&self) -> Option<DateTime<Utc>> {
        self.canceled_at
    }

    pub fn billing_reference(&self) -> Option<&str> {
        self.billing_reference.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True while the subscriber should have access to paid features.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        )
    }

    pub fn is_in_trial(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Trialing
            && matches!(
                (self.trial_start, self.trial_end),
                (Some(ts), Some(te)) if ts <= now && now <= te
            )
    }

    /// The period has elapsed, regardless of what `status` claims.
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.current_period_end
    }

    pub fn will_cancel_at_period_end(&self) -> bool {
        self.cancel_at
            .is_some_and(|at| at <= self.current_period_end)
    }

    /// Whole days until the period ends, rounded up. Negative when expired.
    pub fn days_until_renewal(&self, now: DateTime<Utc>) -> i64 {
        let ms = (self.current_period_end - now).num_milliseconds();
        (ms as f64 / 86_400_000.0).ceil() as i64
    }

    /// Schedule cancellation for the end of the current period.
    ///
    /// Product decision carried over from the original system: the record
    /// flips to CANCELED right away (with `cancel_at` pinned to the period
    /// end) instead of staying ACTIVE until the period lapses. Callers rely
    /// on `canceled_at` being set immediately.
    pub fn cancel_at_period_end(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status == SubscriptionStatus::Canceled {
            return Err(AppError::Conflict(
                "Subscription is already canceled".into(),
            ));
        }
        self.status = SubscriptionStatus::Canceled;
        self.cancel_at = Some(self.current_period_end);
        self.canceled_at = Some(now);
        self.touch(now);
        Ok(())
    }

    /// Cancel right now, collapsing the remaining period.
    pub fn cancel_immediately(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status == SubscriptionStatus::Canceled {
            return Err(AppError::Conflict(
                "Subscription is already canceled".into(),
            ));
        }
        self.status = SubscriptionStatus::Canceled;
        self.cancel_at = Some(now);
        self.canceled_at = Some(now);
        self.current_period_end = now;
        self.touch(now);
        Ok(())
    }

    /// Undo a cancellation. Does not restore a period end that
    /// `cancel_immediately` already collapsed.
    pub fn reactivate(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != SubscriptionStatus::Canceled && !self.will_cancel_at_period_end() {
            return Err(AppError::Conflict(
                "Subscription has no cancellation to undo".into(),
            ));
        }
        self.status = SubscriptionStatus::Active;
        self.cancel_at = None;
        self.canceled_at = None;
        self.touch(now);
        Ok(())
    }

    /// Roll the billing window forward by one interval.
    pub fn renew(&mut self, interval: BillingInterval, now: DateTime<Utc>) -> AppResult<()> {
        let new_start = self.current_period_end;
        self.current_period_end = advance_period(new_start, interval)?;
        self.current_period_start = new_start;
        self.status = SubscriptionStatus::Active;
        self.touch(now);
        Ok(())
    }

    /// Move the subscription to another plan, optionally rewriting the
    /// period bounds. Always lands on ACTIVE.
    pub fn update_plan(
        &mut self,
        new_plan_id: Uuid,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let start = period_start.unwrap_or(self.current_period_start);
        let end = period_end.unwrap_or(self.current_period_end);
        if end <= start {
            return Err(AppError::InvalidInput(
                "Period end must be after period start".into(),
            ));
        }
        self.plan_id = new_plan_id;
        self.current_period_start = start;
        self.current_period_end = end;
        self.status = SubscriptionStatus::Active;
        self.touch(now);
        Ok(())
    }

    /// Enter a trial window; the billing period ends with the trial.
    pub fn start_trial(
        &mut self,
        trial_start: DateTime<Utc>,
        trial_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if trial_end <= trial_start {
            return Err(AppError::InvalidInput(
                "Trial end must be after trial start".into(),
            ));
        }
        self.status = SubscriptionStatus::Trialing;
        self.trial_start = Some(trial_start);
        self.trial_end = Some(trial_end);
        self.current_period_end = trial_end;
        self.touch(now);
        Ok(())
    }

    pub fn mark_past_due(&mut self, now: DateTime<Utc>) {
        self.status = SubscriptionStatus::PastDue;
        self.touch(now);
    }

    pub fn mark_unpaid(&mut self, now: DateTime<Utc>) {
        self.status = SubscriptionStatus::Unpaid;
        self.touch(now);
    }

    pub fn set_billing_reference(&mut self, reference: Option<String>, now: DateTime<Utc>) {
        self.billing_reference = reference;
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Compute the end of a billing window starting at `from`. Lifetime plans
/// get a 100-year window rather than a sentinel timestamp.
pub fn advance_period(
    from: DateTime<Utc>,
    interval: BillingInterval,
) -> AppResult<DateTime<Utc>> {
    from.checked_add_months(Months::new(interval.months()))
        .ok_or_else(|| AppError::Internal("Billing period arithmetic overflowed".into()))
}
