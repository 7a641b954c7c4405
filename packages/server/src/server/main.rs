// Main entry point for the timeline backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use server_core::domains::timeline::Materializer;
use server_core::kernel::consumer::{build_consumer, run_consumer};
use server_core::kernel::scheduled_tasks::start_scheduler;
use server_core::kernel::{KafkaEventLog, ServerKernel, ShardRouter, TimelineCache};
use server_core::server::app::build_app;
use server_core::Config;
use txoutbox::Dispatcher;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting timeline backend");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect shard pools and run migrations on each.
    let shard_urls = if config.sharding_enabled && !config.database_shard_urls.is_empty() {
        config.database_shard_urls.clone()
    } else {
        vec![config.database_url.clone()]
    };

    let mut pools = Vec::with_capacity(shard_urls.len());
    for url in &shard_urls {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .context("Failed to connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        pools.push(pool);
    }
    tracing::info!(shards = pools.len(), "Database connected, migrations complete");

    let db = ShardRouter::new(pools);
    let cache = TimelineCache::connect(&config.redis_url, config.timeline_max_size)
        .await
        .context("Failed to connect to Redis")?;
    tracing::info!("Timeline cache connected");

    let kernel = Arc::new(ServerKernel::new(db, cache, config.clone()));

    // One dispatcher per shard drains that shard's outbox onto the log.
    let event_log = Arc::new(
        KafkaEventLog::new(&config.kafka_brokers, &config.kafka_topic)
            .context("Failed to create Kafka producer")?,
    );

    let mut dispatchers = Vec::new();
    for pool in kernel.db.all() {
        let dispatcher = Arc::new(Dispatcher::new(
            pool.clone(),
            event_log.clone(),
            config.dispatcher_config(),
        ));
        dispatchers.push(dispatcher);
    }

    let mut shutdown_flags: Vec<Arc<AtomicBool>> =
        dispatchers.iter().map(|d| d.shutdown_handle()).collect();

    for dispatcher in &dispatchers {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.run().await });
    }

    let _scheduler = start_scheduler(dispatchers)
        .await
        .context("Failed to start scheduled tasks")?;

    // Timeline materializer consumes the log.
    let materializer = Arc::new(Materializer::new(kernel.clone()));
    let consumer = build_consumer(&config).context("Failed to create Kafka consumer")?;
    let consumer_shutdown = Arc::new(AtomicBool::new(false));
    shutdown_flags.push(consumer_shutdown.clone());
    tokio::spawn(run_consumer(consumer, materializer, consumer_shutdown));

    // HTTP edge.
    let app = build_app(kernel);
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_flags))
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for ctrl-c, then flag every background loop to stop.
async fn shutdown_signal(flags: Vec<Arc<AtomicBool>>) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
    for flag in &flags {
        flag.store(true, Ordering::SeqCst);
    }
}
