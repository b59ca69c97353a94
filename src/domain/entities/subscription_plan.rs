use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::domain::entities::feature::Feature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Monthly,
    Quarterly,
    Yearly,
    Lifetime,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Monthly => "monthly",
            BillingInterval::Quarterly => "quarterly",
            BillingInterval::Yearly => "yearly",
            BillingInterval::Lifetime => "lifetime",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "quarterly" => BillingInterval::Quarterly,
            "yearly" | "annual" => BillingInterval::Yearly,
            "lifetime" => BillingInterval::Lifetime,
            _ => BillingInterval::Monthly,
        }
    }

    /// Length of one billing window in calendar months. Lifetime is modeled
    /// as a 100-year window.
    pub fn months(&self) -> u32 {
        match self {
            BillingInterval::Monthly => 1,
            BillingInterval::Quarterly => 3,
            BillingInterval::Yearly => 12,
            BillingInterval::Lifetime => 1200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanBadge {
    Free,
    Starter,
    Professional,
    Enterprise,
}

impl PlanBadge {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanBadge::Free => "Free",
            PlanBadge::Starter => "Starter",
            PlanBadge::Professional => "Professional",
            PlanBadge::Enterprise => "Enterprise",
        }
    }

    /// Lowercase tier name written onto the User projection.
    pub fn tier_name(&self) -> &'static str {
        match self {
            PlanBadge::Free => "free",
            PlanBadge::Starter => "starter",
            PlanBadge::Professional => "professional",
            PlanBadge::Enterprise => "enterprise",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "starter" => PlanBadge::Starter,
            "professional" => PlanBadge::Professional,
            "enterprise" => PlanBadge::Enterprise,
            _ => PlanBadge::Free,
        }
    }
}

/// Changes an admin can apply to an existing plan. `None` leaves the field
/// untouched; limits use a double Option so "set to unlimited" (explicit
/// JSON null) stays distinguishable from "leave alone" (field absent).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanUpdate {
    pub name: Option<String>,
    pub price_cents: Option<i32>,
    pub badge: Option<PlanBadge>,
    pub color: Option<String>,
    pub trial_days: Option<i32>,
    pub billing_interval: Option<BillingInterval>,
    #[serde(default, deserialize_with = "double_option")]
    pub project_post_limit: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub community_limit: Option<Option<i32>>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Admin-owned reference data describing a purchasable tier. Construction and
/// every mutation re-run the badge/price consistency checks, so an instance
/// in memory is always valid.
#[derive(Debug, Clone)]
pub struct SubscriptionPlan {
    id: Uuid,
    name: String,
    price_cents: i32,
    badge: PlanBadge,
    color: String,
    trial_days: i32,
    billing_interval: BillingInterval,
    project_post_limit: Option<i32>,
    community_limit: Option<i32>,
    features: Vec<Feature>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SubscriptionPlan {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        price_cents: i32,
        badge: PlanBadge,
        color: &str,
        trial_days: i32,
        billing_interval: BillingInterval,
        project_post_limit: Option<i32>,
        community_limit: Option<i32>,
    ) -> AppResult<Self> {
        let now = Utc::now();
        let plan = Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            price_cents,
            badge,
            color: color.to_string(),
            trial_days,
            billing_interval,
            project_post_limit,
            community_limit,
            features: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Rehydrate from storage, re-checking invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        name: String,
        price_cents: i32,
        badge: PlanBadge,
        color: String,
        trial_days: i32,
        billing_interval: BillingInterval,
        project_post_limit: Option<i32>,
        community_limit: Option<i32>,
        features: Vec<Feature>,
        is_active: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let plan = Self {
            id,
            name,
            price_cents,
            badge,
            color,
            trial_days,
            billing_interval,
            project_post_limit,
            community_limit,
            features,
            is_active,
            created_at,
            updated_at,
        };
        plan.validate()?;
        Ok(plan)
    }

    fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput("Plan name cannot be empty".into()));
        }
        if self.price_cents < 0 {
            return Err(AppError::InvalidInput("Price cannot be negative".into()));
        }
        match self.badge {
            PlanBadge::Free if self.price_cents != 0 => {
                return Err(AppError::InvalidInput(
                    "Free plans must have a price of zero".into(),
                ));
            }
            PlanBadge::Free => {}
            _ if self.price_cents == 0 => {
                return Err(AppError::InvalidInput(
                    "Paid plans must have a price above zero".into(),
                ));
            }
            _ => {}
        }
        if self.trial_days < 0 {
            return Err(AppError::InvalidInput(
                "Trial days cannot be negative".into(),
            ));
        }
        for limit in [self.project_post_limit, self.community_limit]
            .into_iter()
            .flatten()
        {
            if limit < -1 {
                return Err(AppError::InvalidInput(
                    "Limits must be null (unlimited) or >= -1".into(),
                ));
            }
        }
        for feature in &self.features {
            feature.validate()?;
        }
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price_cents(&self) -> i32 {
        self.price_cents
    }

    pub fn badge(&self) -> PlanBadge {
        self.badge
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn trial_days(&self) -> i32 {
        self.trial_days
    }

    pub fn billing_interval(&self) -> BillingInterval {
        self.billing_interval
    }

    pub fn project_post_limit(&self) -> Option<i32> {
        self.project_post_limit
    }

    pub fn community_limit(&self) -> Option<i32> {
        self.community_limit
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn offers_trial(&self) -> bool {
        self.trial_days > 0
    }

    pub fn apply_update(&mut self, update: PlanUpdate) -> AppResult<()> {
        let mut next = self.clone();
        if let Some(name) = update.name {
            next.name = name.trim().to_string();
        }
        if let Some(price) = update.price_cents {
            next.price_cents = price;
        }
        if let Some(badge) = update.badge {
            next.badge = badge;
        }
        if let Some(color) = update.color {
            next.color = color;
        }
        if let Some(trial_days) = update.trial_days {
            next.trial_days = trial_days;
        }
        if let Some(interval) = update.billing_interval {
            next.billing_interval = interval;
        }
        if let Some(limit) = update.project_post_limit {
            next.project_post_limit = limit;
        }
        if let Some(limit) = update.community_limit {
            next.community_limit = limit;
        }
        next.updated_at = Utc::now();
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Attach a feature; names are unique per plan, case-insensitively.
    pub fn add_feature(&mut self, mut feature: Feature) -> AppResult<()> {
        feature.validate()?;
        if self.has_feature_named(&feature.name) {
            return Err(AppError::Conflict(format!(
                "Plan already has a feature named '{}'",
                feature.name
            )));
        }
        feature.plan_id = Some(self.id);
        self.features.push(feature);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn remove_feature(&mut self, feature_id: Uuid) -> AppResult<Feature> {
        let idx = self
            .features
            .iter()
            .position(|f| f.id == feature_id)
            .ok_or(AppError::NotFound)?;
        self.updated_at = Utc::now();
        Ok(self.features.remove(idx))
    }

    pub fn update_feature(&mut self, updated: Feature) -> AppResult<()> {
        updated.validate()?;
        let duplicate = self.features.iter().any(|f| {
            f.id != updated.id && f.name.eq_ignore_ascii_case(&updated.name)
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "Plan already has a feature named '{}'",
                updated.name
            )));
        }
        let slot = self
            .features
            .iter_mut()
            .find(|f| f.id == updated.id)
            .ok_or(AppError::NotFound)?;
        *slot = updated;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn activate(&mut self) -> AppResult<()> {
        if self.is_active {
            return Err(AppError::Conflict("Plan is already active".into()));
        }
        self.is_active = true;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn deactivate(&mut self) -> AppResult<()> {
        if !self.is_active {
            return Err(AppError::Conflict("Plan is already inactive".into()));
        }
        self.is_active = false;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn has_feature_named(&self, name: &str) -> bool {
        self.features
            .iter()
            .any(|f| f.name.eq_ignore_ascii_case(name))
    }
}
