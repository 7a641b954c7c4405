pub mod identity;
pub mod request_id;

pub use identity::{caller_identity_middleware, USER_ID_HEADER};
pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
