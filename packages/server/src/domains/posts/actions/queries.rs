//! Read-side queries over an author's post history.

use anyhow::Result;

use crate::common::entity_ids::{PostId, UserId};
use crate::common::pagination::{decode_id_cursor, trim_results};
use crate::domains::posts::models::Post;
use crate::kernel::ServerKernel;

/// One page of an author's posts, id descending.
///
/// The cursor is an id cursor (base64 of the post id); invalid cursors fall
/// back to the first page.
pub async fn list_user_posts(
    author: UserId,
    cursor: Option<&str>,
    limit: i64,
    kernel: &ServerKernel,
) -> Result<(Vec<Post>, bool)> {
    let cursor: Option<PostId> = decode_id_cursor(cursor);
    let pool = kernel.db.pool_for(author);

    let posts = Post::find_by_author(author, cursor, limit + 1, pool).await?;
    Ok(trim_results(posts, limit as usize))
}
