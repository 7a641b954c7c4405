//! Test harness with testcontainers for integration testing.
//!
//! Postgres and Redis containers are shared across all tests and started
//! once; each test gets its own freshly-migrated database so assertions
//! about counts and timelines never see another test's rows. The message
//! log is the in-process partitioned implementation, so the full pipeline
//! (write -> outbox -> dispatch -> materialize -> cache -> read) runs
//! deterministically without a broker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

use server_core::common::entity_ids::{PostId, UserId};
use server_core::common::RequestContext;
use server_core::domains::timeline::Materializer;
use server_core::kernel::{InMemoryEventLog, ServerKernel, ShardRouter, TimelineCache};
use server_core::Config;
use txoutbox::Dispatcher;

// =============================================================================
// Shared Test Infrastructure
// =============================================================================

/// Shared containers that persist across all tests.
struct SharedTestInfra {
    pg_host_port: (String, u16),
    redis_url: String,
    /// Pool against the admin database; per-test databases are created
    /// through it.
    admin_pool: PgPool,
    _postgres: ContainerAsync<Postgres>,
    _redis: ContainerAsync<Redis>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();
static DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Respect RUST_LOG when debugging tests; never panic if another
        // binary initialized first.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .start()
            .await
            .context("Failed to start Postgres container")?;
        let pg_host = postgres.get_host().await?.to_string();
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let admin_url =
            format!("postgresql://postgres:postgres@{pg_host}:{pg_port}/postgres");

        let redis = Redis::default()
            .start()
            .await
            .context("Failed to start Redis container")?;
        let redis_host = redis.get_host().await?;
        let redis_port = redis.get_host_port_ipv4(6379).await?;
        let redis_url = format!("redis://{redis_host}:{redis_port}");

        let admin_pool = PgPool::connect(&admin_url)
            .await
            .context("Failed to connect to Postgres")?;

        Ok(Self {
            pg_host_port: (pg_host, pg_port),
            redis_url,
            admin_pool,
            _postgres: postgres,
            _redis: redis,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

// =============================================================================
// Test Harness
// =============================================================================

/// One test's isolated pipeline: its own database, the shared Redis (keys
/// are namespaced by fresh v7 user ids), an in-process event log with
/// materializer consumers, and a dispatcher driven manually via
/// [`TestHarness::drive`].
pub struct TestHarness {
    pub kernel: Arc<ServerKernel>,
    pub db_pool: PgPool,
    pub dispatcher: Dispatcher,
    pub log: Arc<InMemoryEventLog>,
    pub materializer: Arc<Materializer>,
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        Self::with_config(|_| {}).await
    }

    /// Build a harness after letting the test tweak the configuration
    /// (celebrity threshold, timeline cap, a dedicated Redis database).
    pub async fn with_config(tweak: impl FnOnce(&mut Config)) -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        // Fresh database per test.
        let db_name = format!("t_{}", DB_COUNTER.fetch_add(1, Ordering::SeqCst));
        sqlx::query(&format!(r#"CREATE DATABASE "{db_name}""#))
            .execute(&infra.admin_pool)
            .await
            .context("Failed to create test database")?;

        let (host, port) = &infra.pg_host_port;
        let database_url = format!("postgresql://postgres:postgres@{host}:{port}/{db_name}");

        let db_pool = PgPool::connect(&database_url)
            .await
            .context("Failed to connect to test database")?;

        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run migrations")?;

        let mut config = Config {
            database_url,
            database_shard_urls: Vec::new(),
            redis_url: infra.redis_url.clone(),
            kafka_brokers: String::new(),
            kafka_topic: "timeline-events".to_string(),
            kafka_group_id: "timeline-materializer".to_string(),
            port: 0,
            timeline_max_size: 800,
            timeline_default_page_size: 20,
            timeline_max_page_size: 100,
            celebrity_follower_threshold: 10_000,
            outbox_poll_interval_ms: 50,
            outbox_batch_size: 100,
            outbox_retention_hours: 24,
            sharding_enabled: false,
        };
        tweak(&mut config);

        let cache = TimelineCache::connect(&config.redis_url, config.timeline_max_size)
            .await
            .context("Failed to connect to test Redis")?;

        let kernel = Arc::new(ServerKernel::new(
            ShardRouter::single(db_pool.clone()),
            cache,
            config.clone(),
        ));

        let materializer = Arc::new(Materializer::new(kernel.clone()));
        let log = Arc::new(InMemoryEventLog::start(4, materializer.clone()));
        let dispatcher = Dispatcher::new(db_pool.clone(), log.clone(), config.dispatcher_config());

        Ok(Self {
            kernel,
            db_pool,
            dispatcher,
            log,
            materializer,
        })
    }

    /// Drain the outbox and wait for every published event to be consumed.
    pub async fn drive(&self) -> Result<()> {
        loop {
            let dispatched = self.dispatcher.tick().await?;
            if dispatched == 0 {
                break;
            }
        }
        self.log.drain().await;
        Ok(())
    }

    /// A fresh user id (users materialize on first write).
    pub fn user(&self) -> UserId {
        self.kernel.ids.generate()
    }

    /// A request context the way the HTTP edge would build one.
    pub fn ctx(&self) -> RequestContext {
        RequestContext::internal()
    }

    /// The reader's materialized timeline, newest first.
    pub async fn timeline_ids(&self, reader: UserId) -> Vec<PostId> {
        self.kernel
            .cache
            .range(reader, None, 1_000)
            .await
            .expect("cache range failed")
    }

    /// The HTTP router over this harness's kernel.
    pub fn app(&self) -> axum::Router {
        server_core::server::app::build_app(self.kernel.clone())
    }
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}
