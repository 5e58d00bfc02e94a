use crate::bencode::response::build_failure_response;
use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};

pub async fn fallback_handler(headers: HeaderMap) -> Response {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let is_browser = ["Mozilla", "Chrome", "Safari", "Firefox", "Edge"]
        .iter()
        .any(|marker| user_agent.contains(marker));

    if is_browser {
        return Html("Nothing to see here. Lost in the void!").into_response();
    }

    let body = build_failure_response("Invalid endpoint. Valid endpoints: /announce, /health, /metrics");
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
}
