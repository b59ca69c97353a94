use dotenvy::dotenv;
use tracing::info;

use skillforge_api::infra::{
    app::create_app, expiry_sweep::run_expiry_sweep_loop, setup::init_app_state,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let app_state = init_app_state().await?;

    let bind_addr = app_state.config.bind_addr;
    let sweep_interval = app_state.config.expiry_sweep_interval;

    let app = create_app(app_state.clone());

    // Spawn the subscription expiry sweep (after tracing is initialized).
    let subscription_use_cases = app_state.subscription_use_cases.clone();
    tokio::spawn(async move {
        run_expiry_sweep_loop(subscription_use_cases, sweep_interval).await;
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
