pub mod create_post;
pub mod queries;

pub use create_post::{create_post, CreatePostError, MAX_CONTENT_CODE_POINTS};
pub use queries::list_user_posts;
