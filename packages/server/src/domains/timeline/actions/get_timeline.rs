//! Read-path merger: materialized timeline plus on-demand celebrity reads.

use anyhow::Result;

use crate::common::entity_ids::{PostId, UserId};
use crate::common::pagination::{decode_id_cursor, encode_id_cursor};
use crate::domains::posts::models::Post;
use crate::domains::social::models::Follow;
use crate::kernel::ServerKernel;

/// One page of a reader's home timeline.
#[derive(Debug)]
pub struct TimelinePage {
    pub posts: Vec<Post>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Assemble `reader`'s home timeline page.
///
/// The materialized cache serves the bulk in constant time; posts by
/// followed celebrities are fetched on demand and merged, because they were
/// deliberately never fanned out. Both sources can overlap (a celebrity's
/// posts may sit in the cache from a follow-time backfill), so the merge
/// dedupes by post id before paging.
pub async fn get_timeline(
    reader: UserId,
    cursor: Option<&str>,
    limit: i64,
    kernel: &ServerKernel,
) -> Result<TimelinePage> {
    // An invalid cursor means first page, never an error.
    let cursor_id: Option<PostId> = decode_id_cursor(cursor);
    let max_score = cursor_id.map(|id| id.timestamp_ms());

    let cached_ids = kernel.cache.range(reader, max_score, limit + 1).await?;
    let mut posts = Post::find_by_ids(&cached_ids, &kernel.db).await?;

    let celebrities = Follow::find_followed_celebrities(
        reader,
        kernel.config.celebrity_follower_threshold,
        &kernel.db,
    )
    .await?;

    for celebrity in celebrities {
        let latest =
            Post::find_by_author_latest(celebrity, limit, kernel.db.pool_for(celebrity)).await?;
        posts.extend(latest.into_iter().filter(|p| match max_score {
            Some(max) => p.id.timestamp_ms() < max,
            None => true,
        }));
    }

    let (posts, has_more) = merge_and_page(posts, limit as usize);
    let next_cursor = if has_more {
        posts.last().map(|p| encode_id_cursor(p.id))
    } else {
        None
    };

    Ok(TimelinePage {
        posts,
        next_cursor,
        has_more,
    })
}

/// Sort id-descending, dedupe by id, and cut one page. Post ids are
/// globally unique and time-ordered, so id order is time order.
fn merge_and_page(mut posts: Vec<Post>, limit: usize) -> (Vec<Post>, bool) {
    posts.sort_by(|a, b| b.id.cmp(&a.id));
    posts.dedup_by_key(|p| p.id);

    let has_more = posts.len() > limit;
    posts.truncate(limit);
    (posts, has_more)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::id::IdGenerator;
    use chrono::Utc;

    fn post(ids: &IdGenerator) -> Post {
        Post {
            id: ids.generate(),
            user_id: ids.generate(),
            content: "post".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn merge_sorts_descending_and_dedupes() {
        let ids = IdGenerator::new();
        let a = post(&ids);
        let b = post(&ids);
        let c = post(&ids);

        // Shuffled input with a duplicate of b.
        let merged = vec![b.clone(), c.clone(), a.clone(), b.clone()];
        let (page, has_more) = merge_and_page(merged, 10);

        let got: Vec<PostId> = page.iter().map(|p| p.id).collect();
        assert_eq!(got, vec![c.id, b.id, a.id]);
        assert!(!has_more);
    }

    #[test]
    fn merge_pages_at_limit() {
        let ids = IdGenerator::new();
        let posts: Vec<Post> = (0..5).map(|_| post(&ids)).collect();
        let newest = posts.last().unwrap().id;

        let (page, has_more) = merge_and_page(posts, 3);
        assert_eq!(page.len(), 3);
        assert!(has_more);
        assert_eq!(page[0].id, newest);
    }

    #[test]
    fn empty_merge_is_empty_page() {
        let (page, has_more) = merge_and_page(Vec::new(), 20);
        assert!(page.is_empty());
        assert!(!has_more);
    }
}
