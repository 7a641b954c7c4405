//! Domain events and their wire format.
//!
//! Every state mutation that must propagate to the timeline pipeline is one
//! of these events. The discriminator string travels in the `eventType`
//! message header and in the outbox row; the payload is the JSON body.
//! Field names are part of the contract — consumers in other services parse
//! them — so they are pinned by serde attributes, not by struct naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, Transaction};

use txoutbox::OutboxRecord;

use crate::common::entity_ids::{PostId, UserId};

pub const POST_CREATED: &str = "POST_CREATED";
pub const USER_FOLLOWED: &str = "USER_FOLLOWED";
pub const USER_UNFOLLOWED: &str = "USER_UNFOLLOWED";

/// A user id as it appears on the wire: `{"value": "<uuid>"}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdRef {
    pub value: UserId,
}

impl From<UserId> for UserIdRef {
    fn from(value: UserId) -> Self {
        Self { value }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCreatedPayload {
    pub tweet_id: PostId,
    pub user_id: UserIdRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowChangedPayload {
    pub follower_id: UserIdRef,
    pub followee_id: UserIdRef,
}

/// The event union. The aggregate — the identity that keys the log
/// partition — is the author for post events and the follower for follow
/// events.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    PostCreated(PostCreatedPayload),
    UserFollowed(FollowChangedPayload),
    UserUnfollowed(FollowChangedPayload),
}

impl DomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::PostCreated(_) => POST_CREATED,
            DomainEvent::UserFollowed(_) => USER_FOLLOWED,
            DomainEvent::UserUnfollowed(_) => USER_UNFOLLOWED,
        }
    }

    pub fn aggregate_id(&self) -> String {
        match self {
            DomainEvent::PostCreated(p) => p.user_id.value.to_string(),
            DomainEvent::UserFollowed(p) | DomainEvent::UserUnfollowed(p) => {
                p.follower_id.value.to_string()
            }
        }
    }

    pub fn payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            DomainEvent::PostCreated(p) => serde_json::to_value(p),
            DomainEvent::UserFollowed(p) | DomainEvent::UserUnfollowed(p) => {
                serde_json::to_value(p)
            }
        }
    }

    /// Append this event to the outbox inside the caller's transaction —
    /// the same transaction as the business write it describes.
    pub async fn append_to_outbox(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        request_id: &str,
    ) -> anyhow::Result<OutboxRecord> {
        let payload = self.payload()?;
        OutboxRecord::append(tx, self.event_type(), &self.aggregate_id(), payload, request_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::id::IdGenerator;

    #[test]
    fn post_created_wire_shape() {
        let ids = IdGenerator::new();
        let author: UserId = ids.generate();
        let post: PostId = ids.generate();
        let event = DomainEvent::PostCreated(PostCreatedPayload {
            tweet_id: post,
            user_id: author.into(),
            content: "hello".to_string(),
            created_at: Utc::now(),
        });

        assert_eq!(event.event_type(), "POST_CREATED");
        assert_eq!(event.aggregate_id(), author.to_string());

        let json = event.payload().unwrap();
        assert_eq!(json["tweetId"], post.to_string());
        assert_eq!(json["userId"]["value"], author.to_string());
        assert_eq!(json["content"], "hello");
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn follow_events_key_on_follower() {
        let ids = IdGenerator::new();
        let follower: UserId = ids.generate();
        let followee: UserId = ids.generate();
        let payload = FollowChangedPayload {
            follower_id: follower.into(),
            followee_id: followee.into(),
        };

        let followed = DomainEvent::UserFollowed(payload.clone());
        let unfollowed = DomainEvent::UserUnfollowed(payload);

        assert_eq!(followed.event_type(), "USER_FOLLOWED");
        assert_eq!(unfollowed.event_type(), "USER_UNFOLLOWED");
        assert_eq!(followed.aggregate_id(), follower.to_string());
        assert_eq!(unfollowed.aggregate_id(), follower.to_string());

        let json = followed.payload().unwrap();
        assert_eq!(json["followerId"]["value"], follower.to_string());
        assert_eq!(json["followeeId"]["value"], followee.to_string());
    }

    #[test]
    fn payload_roundtrips() {
        let ids = IdGenerator::new();
        let payload = FollowChangedPayload {
            follower_id: ids.generate::<crate::common::entity_ids::User>().into(),
            followee_id: ids.generate::<crate::common::entity_ids::User>().into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        let back: FollowChangedPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back.follower_id, payload.follower_id);
        assert_eq!(back.followee_id, payload.followee_id);
    }
}
