//! Follower/following listings and their time-keyed cursors.

mod common;

use common::TestHarness;
use server_core::common::entity_ids::UserId;
use server_core::common::pagination::encode_time_cursor;
use server_core::domains::social::actions::{follow, list_followers, list_following};
use test_context::test_context;

#[test_context(TestHarness)]
#[tokio::test]
async fn following_pages_by_created_at_cursor(ctx: &mut TestHarness) {
    let reader = ctx.user();
    let mut followees: Vec<UserId> = Vec::new();

    for _ in 0..5 {
        let other = ctx.user();
        follow(reader, other, &ctx.ctx(), &ctx.kernel).await.unwrap();
        followees.push(other);
        // Distinct timestamps so the time cursor pages deterministically.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let (first, has_more) = list_following(reader, None, 2, &ctx.kernel).await.unwrap();
    assert!(has_more);
    assert_eq!(first.len(), 2);
    // Newest edge first.
    assert_eq!(first[0].followee_id, followees[4]);
    assert_eq!(first[1].followee_id, followees[3]);

    let cursor = encode_time_cursor(first.last().unwrap().created_at);
    let (second, has_more) = list_following(reader, Some(&cursor), 2, &ctx.kernel)
        .await
        .unwrap();
    assert!(has_more);
    assert_eq!(second[0].followee_id, followees[2]);
    assert_eq!(second[1].followee_id, followees[1]);

    let cursor = encode_time_cursor(second.last().unwrap().created_at);
    let (third, has_more) = list_following(reader, Some(&cursor), 2, &ctx.kernel)
        .await
        .unwrap();
    assert!(!has_more);
    assert_eq!(third.len(), 1);
    assert_eq!(third[0].followee_id, followees[0]);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn followers_list_the_other_end_of_the_edge(ctx: &mut TestHarness) {
    let celebrity = ctx.user();
    let mut fans: Vec<UserId> = Vec::new();

    for _ in 0..3 {
        let fan = ctx.user();
        follow(fan, celebrity, &ctx.ctx(), &ctx.kernel).await.unwrap();
        fans.push(fan);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let (page, has_more) = list_followers(celebrity, None, 10, &ctx.kernel).await.unwrap();
    assert!(!has_more);

    let got: Vec<UserId> = page.iter().map(|f| f.follower_id).collect();
    let expected: Vec<UserId> = fans.iter().rev().copied().collect();
    assert_eq!(got, expected);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn invalid_time_cursor_returns_the_first_page(ctx: &mut TestHarness) {
    let reader = ctx.user();
    let other = ctx.user();
    follow(reader, other, &ctx.ctx(), &ctx.kernel).await.unwrap();

    let (page, _) = list_following(reader, Some("not-a-timestamp"), 10, &ctx.kernel)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].followee_id, other);
}
