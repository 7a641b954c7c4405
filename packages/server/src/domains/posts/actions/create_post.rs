//! Create-post command: validate, write the post and its outbox event in
//! one transaction.

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::common::entity_ids::{PostId, UserId};
use crate::common::RequestContext;
use crate::domains::events::{DomainEvent, PostCreatedPayload};
use crate::domains::posts::models::Post;
use crate::domains::users::models::User;
use crate::kernel::ServerKernel;

/// Maximum post length in Unicode code points, counted after trimming.
pub const MAX_CONTENT_CODE_POINTS: usize = 280;

#[derive(Error, Debug)]
pub enum CreatePostError {
    #[error("tweet content must not be empty")]
    EmptyContent,

    #[error("tweet content must not exceed {MAX_CONTENT_CODE_POINTS} characters")]
    ContentTooLong,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn validate_content(content: &str) -> Result<&str, CreatePostError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(CreatePostError::EmptyContent);
    }
    if content.chars().count() > MAX_CONTENT_CODE_POINTS {
        return Err(CreatePostError::ContentTooLong);
    }
    Ok(content)
}

/// Create a post for `author`.
///
/// The post row and the `POST_CREATED` outbox record commit atomically: an
/// observer either sees both or neither. Failure to later publish the event
/// can never lose the post; a published event can never reference an
/// uncommitted post.
pub async fn create_post(
    author: UserId,
    content: &str,
    ctx: &RequestContext,
    kernel: &ServerKernel,
) -> Result<Post, CreatePostError> {
    let content = validate_content(content)?;

    let post_id: PostId = kernel.ids.generate();
    let post = Post {
        id: post_id,
        user_id: author,
        content: content.to_string(),
        created_at: Utc::now(),
    };

    let mut tx = kernel.db.pool_for(author).begin().await?;

    // The author may never have been seen before (identity arrives from the
    // edge, not from a registration flow).
    User::upsert_if_absent(author, &mut *tx).await?;
    post.insert(&mut tx).await?;

    DomainEvent::PostCreated(PostCreatedPayload {
        tweet_id: post.id,
        user_id: author.into(),
        content: post.content.clone(),
        created_at: post.created_at,
    })
    .append_to_outbox(&mut tx, &ctx.request_id)
    .await?;

    tx.commit().await?;

    info!(post_id = %post.id, author = %author, "Post created");

    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(validate_content("  hello  ").unwrap(), "hello");
    }

    #[test]
    fn rejects_empty_and_whitespace_only() {
        assert!(matches!(validate_content(""), Err(CreatePostError::EmptyContent)));
        assert!(matches!(
            validate_content("   \n\t "),
            Err(CreatePostError::EmptyContent)
        ));
    }

    #[test]
    fn limit_counts_code_points_not_bytes() {
        // 280 'é' chars: 560 bytes but exactly at the limit.
        let at_limit = "é".repeat(MAX_CONTENT_CODE_POINTS);
        assert!(validate_content(&at_limit).is_ok());

        let over = "é".repeat(MAX_CONTENT_CODE_POINTS + 1);
        assert!(matches!(
            validate_content(&over),
            Err(CreatePostError::ContentTooLong)
        ));
    }

    #[test]
    fn limit_applies_after_trim() {
        let padded = format!("   {}   ", "x".repeat(MAX_CONTENT_CODE_POINTS));
        assert!(validate_content(&padded).is_ok());
    }
}
