pub mod get_timeline;

pub use get_timeline::{get_timeline, TimelinePage};
