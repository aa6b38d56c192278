use uuid::Uuid;

/// Length of the short request id shown in logs.
pub const REQUEST_ID_LEN: usize = 12;

/// Generate a request id for log correlation (UUID v4 hex, truncated).
pub fn request_id() -> String {
    let full = Uuid::new_v4().simple().to_string();
    full[..REQUEST_ID_LEN].to_string()
}

/// Generate a session id (UUID v4 hex, 32 chars).
pub fn session_id() -> String {
    Uuid::new_v4().simple().to_string()
}
