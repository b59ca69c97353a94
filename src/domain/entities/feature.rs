use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Boolean,
    NumericLimit,
    Text,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Boolean => "boolean",
            FeatureType::NumericLimit => "numeric_limit",
            FeatureType::Text => "text",
        }
    }
}

/// A plan feature. Either attached to a plan (`plan_id` set) or sitting in
/// the unassigned library for reuse. Also embedded verbatim in plan rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: Uuid,
    pub plan_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub feature_type: FeatureType,
    pub limit_value: Option<i32>,
    pub is_enabled: bool,
    pub display_order: i32,
    pub is_highlighted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feature {
    pub fn new(
        plan_id: Option<Uuid>,
        name: &str,
        description: Option<String>,
        feature_type: FeatureType,
        limit_value: Option<i32>,
        is_enabled: bool,
        display_order: i32,
        is_highlighted: bool,
    ) -> AppResult<Self> {
        let now = Utc::now();
        let feature = Self {
            id: Uuid::new_v4(),
            plan_id,
            name: name.trim().to_string(),
            description,
            feature_type,
            limit_value,
            is_enabled,
            display_order,
            is_highlighted,
            created_at: now,
            updated_at: now,
        };
        feature.validate()?;
        Ok(feature)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput("Feature name cannot be empty".into()));
        }
        if self.feature_type == FeatureType::NumericLimit && self.limit_value.is_none() {
            return Err(AppError::InvalidInput(
                "Numeric limit feature requires a limit value".into(),
            ));
        }
        if self.display_order < 0 {
            return Err(AppError::InvalidInput(
                "Feature display order cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_limit_requires_value() {
        let result = Feature::new(
            None,
            "Project posts",
            None,
            FeatureType::NumericLimit,
            None,
            true,
            0,
            false,
        );
        assert!(result.is_err());

        let ok = Feature::new(
            None,
            "Project posts",
            None,
            FeatureType::NumericLimit,
            Some(5),
            true,
            0,
            false,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn rejects_blank_name_and_negative_order() {
        assert!(Feature::new(None, "  ", None, FeatureType::Boolean, None, true, 0, false).is_err());
        assert!(
            Feature::new(None, "Chat", None, FeatureType::Boolean, None, true, -1, false).is_err()
        );
    }
}
