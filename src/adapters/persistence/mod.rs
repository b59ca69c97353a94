use sqlx::PgPool;

use crate::app_error::AppError;

const MAX_JSON_LOG_LEN: usize = 200;

/// Parse a JSONB column into the target type, logging a warning on failure.
///
/// SQL NULL becomes `Value::Null` and is treated as a valid empty state,
/// without a warning. Only genuine parse failures (type mismatches,
/// corruption) are logged.
pub fn parse_json_with_fallback<T: serde::de::DeserializeOwned + Default>(
    json: &serde_json::Value,
    field_name: &str,
    entity_type: &str,
    entity_id: &str,
) -> T {
    if json.is_null() {
        return T::default();
    }

    serde_json::from_value(json.clone()).unwrap_or_else(|err| {
        // Truncate raw JSON to prevent log bloat from large arrays
        let raw_str = json.to_string();
        let truncated = if raw_str.len() > MAX_JSON_LOG_LEN {
            format!("{}...", &raw_str[..MAX_JSON_LOG_LEN])
        } else {
            raw_str
        };

        tracing::warn!(
            field = field_name,
            entity_type = entity_type,
            entity_id = entity_id,
            raw_json = %truncated,
            error = %err,
            "Failed to parse JSON field, using default value"
        );
        T::default()
    })
}

pub mod subscription_plan;
pub mod user;
pub mod user_subscription;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // PostgreSQL unique violation
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    AppError::Conflict("A record with this value already exists".into())
                }
                // PostgreSQL foreign key violation
                else if msg.contains("foreign key") || msg.contains("violates foreign key") {
                    AppError::InvalidInput("Referenced record not found".into())
                }
                // PostgreSQL not-null violation
                else if msg.contains("null value") && msg.contains("violates not-null") {
                    AppError::InvalidInput("Required field is missing".into())
                } else {
                    // Log the actual error for debugging, but don't expose details
                    tracing::error!(error = ?err, "Database error");
                    AppError::Database("Database operation failed".into())
                }
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::feature::Feature;

    #[test]
    fn parse_json_valid_array() {
        let json = serde_json::json!(["a", "b", "c"]);
        let result: Vec<String> = parse_json_with_fallback(&json, "test", "entity", "123");
        assert_eq!(result, vec!["a", "b", "c"]);
    }

    #[test]
    fn parse_json_sql_null_returns_empty_no_warning() {
        let json = serde_json::Value::Null;
        let result: Vec<Feature> = parse_json_with_fallback(&json, "features", "plan", "123");
        assert!(result.is_empty());
    }

    #[test]
    fn parse_json_invalid_type_returns_empty() {
        let json = serde_json::json!([1, 2, 3]);
        let result: Vec<Feature> = parse_json_with_fallback(&json, "features", "plan", "123");
        assert!(result.is_empty());
    }
}
