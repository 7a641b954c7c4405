pub mod follow_user;
pub mod queries;

pub use follow_user::{follow, unfollow, FollowError};
pub use queries::{list_followers, list_following};
