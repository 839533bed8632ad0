// Post Voting Server

use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use post_voting::{
    app_state::AppState, config::Config, data_seeder::seed_demo_data,
    voting_interface::create_voting_router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("post_voting=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::new(config.clone()).await?;

    if config.database.seed_demo_data {
        seed_demo_data(&app_state.database.pool).await?;
    }
    if !config.post_voting.enabled {
        warn!("POST_VOTING_ENABLED is off, every operation will be refused");
    }

    let app = create_voting_router(app_state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.server_address();
    info!("Post voting server starting on http://{}", addr);
    info!("  GET|POST|PUT|DELETE /post_voting/comments");
    info!("  GET|POST|DELETE     /post_voting/vote");
    info!("  GET                 /post_voting/voters");
    info!("  GET                 /post_voting/topics/{{topic_id}}/events");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app_state.broadcaster.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
