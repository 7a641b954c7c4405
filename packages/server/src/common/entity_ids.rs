//! Typed ID definitions for the domain entities.
//!
//! Type aliases over [`Id`] give each entity an incompatible id type, so the
//! compiler catches a `PostId` handed to a follower-graph query.

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for users (authors and readers).
pub struct User;

/// Marker type for posts.
pub struct Post;

/// Marker type for outbox / log events.
pub struct Event;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for users.
pub type UserId = Id<User>;

/// Typed ID for posts. Time-ordered: the id alone defines timeline order.
pub type PostId = Id<Post>;

/// Typed ID for events.
pub type EventId = Id<Event>;
