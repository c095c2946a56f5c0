//! Per-request id generation.

use uuid::Uuid;

/// Header carrying the id of the inbound request that caused an outbound call.
pub const REQUEST_ID_HEADER: &str = "x-relay-request-id";

/// Generate a new request id (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
