//! Explicit per-request context.
//!
//! The caller identity and request id travel as a value through every call
//! instead of living in task-local storage. The event consumer rebuilds a
//! context from the message key and headers before touching storage.

use uuid::Uuid;

use super::entity_ids::UserId;

/// Context for one unit of work: an HTTP request or one consumed event.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Authenticated caller, when there is one. Consumer-side contexts and
    /// unauthenticated endpoints carry `None`.
    pub caller: Option<UserId>,
    /// Correlation id, echoed in responses and propagated through the
    /// outbox into message-log headers.
    pub request_id: String,
}

impl RequestContext {
    pub fn new(caller: Option<UserId>, request_id: impl Into<String>) -> Self {
        Self {
            caller,
            request_id: request_id.into(),
        }
    }

    /// Context with a freshly generated request id (background work).
    pub fn internal() -> Self {
        Self {
            caller: None,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    /// Context recovered on the consumer path from a message envelope.
    pub fn from_event(request_id: impl Into<String>) -> Self {
        Self {
            caller: None,
            request_id: request_id.into(),
        }
    }

    /// The caller, or `None` when the request is anonymous.
    pub fn caller(&self) -> Option<UserId> {
        self.caller
    }
}
