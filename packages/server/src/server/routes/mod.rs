pub mod demo;
pub mod health;
pub mod posts;
pub mod social;
pub mod timeline;

pub use demo::{reset_handler, stats_handler};
pub use health::health_handler;
pub use posts::{create_post_handler, list_user_posts_handler};
pub use social::{follow_handler, followers_handler, following_handler, unfollow_handler};
pub use timeline::timeline_handler;
