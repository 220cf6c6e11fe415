//! Current-conversation cookie

use axum::http::{header, HeaderMap};

pub const SESSION_COOKIE: &str = "mcpchat_conversation";

/// Conversation id from the request's session cookie
pub fn current_conversation(headers: &HeaderMap) -> Option<i64> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.trim().parse().ok())
}

/// `Set-Cookie` header value making `conversation_id` current
pub fn set_cookie(conversation_id: i64) -> (header::HeaderName, String) {
    (
        header::SET_COOKIE,
        format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, conversation_id),
    )
}
