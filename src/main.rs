mod cache;
mod canvas;
mod config;
mod events;
mod rate_limit;
mod routes;
mod services;
mod state;

use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env();
    tracing::info!(
        width = config.width,
        height = config.height,
        cooldown_secs = config.pixel_cooldown.as_secs(),
        "canvas configured"
    );

    // Cache tier: primary resolved from env, downgraded on failure.
    let tier = cache::TieredCache::resolve(config.redis_url.as_deref(), config.cache_op_timeout).await;
    let _probe = tier.spawn_health_probe(config.cache_probe_interval);
    let canvas_cache = cache::CanvasCache::new(tier, config.canvas_ttl, config.counter_ttl);

    let broadcaster = events::Broadcaster::spawn(&config);

    let port = config.port;
    let snapshot_path = config.snapshot_path.clone();
    let snapshot_interval = config.snapshot_interval;
    let sweep_interval = config.cooldown_sweep_interval;

    let state = state::AppState::new(config, canvas_cache, broadcaster);

    // Background maintenance: cooldown eviction and snapshot checkpoints.
    let _sweep = rate_limit::spawn_sweep_task(state.cooldowns.clone(), sweep_interval);
    let sink = Arc::new(services::persistence::JsonFileSink::new(snapshot_path));
    let _snapshots = services::persistence::spawn_snapshot_task(state.clone(), sink, snapshot_interval);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "mural listening");
    axum::serve(listener, app).await.expect("server failed");
}
