//! Relay plumbing: target selection, outbound calls, errors, request ids.

pub mod behavior;
pub mod error;
pub mod request_id;
pub mod upstream;
