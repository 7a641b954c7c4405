// Infrastructure: shard routing, cache, message log, consumer loop,
// scheduled tasks, and the shared dependency bundle.

pub mod consumer;
pub mod event_log;
pub mod scheduled_tasks;
pub mod server_kernel;
pub mod shard;
pub mod timeline_cache;

pub use event_log::{EventHandler, InMemoryEventLog, KafkaEventLog};
pub use server_kernel::ServerKernel;
pub use shard::ShardRouter;
pub use timeline_cache::TimelineCache;
