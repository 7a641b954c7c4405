pub mod actions;
pub mod materializer;

pub use actions::{get_timeline, TimelinePage};
pub use materializer::Materializer;
