//! Shared dependency bundle handed to actions, handlers, and the
//! materializer.

use crate::common::id::IdGenerator;
use crate::config::Config;

use super::shard::ShardRouter;
use super::timeline_cache::TimelineCache;

/// Everything the request and consumer paths need: shard-routed database
/// pools, the timeline cache, the id generator, and configuration.
///
/// Cloning is cheap where it matters (pools and the cache connection are
/// handles); the kernel itself is shared behind an `Arc`.
pub struct ServerKernel {
    pub db: ShardRouter,
    pub cache: TimelineCache,
    pub ids: IdGenerator,
    pub config: Config,
}

impl ServerKernel {
    pub fn new(db: ShardRouter, cache: TimelineCache, config: Config) -> Self {
        Self {
            db,
            cache,
            ids: IdGenerator::new(),
            config,
        }
    }
}
