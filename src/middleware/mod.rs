//! HTTP middleware

pub mod request_id;
pub mod session;

pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use session::{MAX_SESSION_TOKEN_CHARS, SESSION_HEADER, SessionToken, session_middleware};
