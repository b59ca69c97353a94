pub mod admin_subscription;
pub mod subscription;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/subscriptions", subscription::router())
        .nest("/admin/subscriptions", admin_subscription::router())
}
