// Domain modules: one per bounded area, each with its models and actions.

pub mod events;
pub mod posts;
pub mod social;
pub mod timeline;
pub mod users;
