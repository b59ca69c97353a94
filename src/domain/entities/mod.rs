pub mod feature;
pub mod subscription_plan;
pub mod user;
pub mod user_subscription;
