use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const TRACE_HEADER: &str = "x-trace-id";
const MAX_INCOMING_LEN: usize = 128;

tokio::task_local! {
    static TRACE_ID: String;
}

/// Trace id of the request currently being served, if any.
pub fn current() -> Option<String> {
    TRACE_ID.try_with(|id| id.clone()).ok()
}

pub fn generate() -> String {
    Uuid::new_v4().simple().to_string()
}

fn incoming(req: &Request) -> Option<String> {
    req.headers()
        .get(TRACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_INCOMING_LEN)
        .map(str::to_owned)
}

/// Adopts the caller's `X-Trace-Id` or mints one, scopes it over the handler
/// and echoes it back on the response.
pub async fn propagate(req: Request, next: Next) -> Response {
    let trace_id = incoming(&req).unwrap_or_else(generate);
    tracing::Span::current().record("trace_id", tracing::field::display(&trace_id));

    let mut res = TRACE_ID.scope(trace_id.clone(), next.run(req)).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        res.headers_mut().insert(TRACE_HEADER, value);
    }
    res
}

#[cfg(test)]
pub(crate) async fn scoped<F: std::future::Future>(trace_id: &str, fut: F) -> F::Output {
    TRACE_ID.scope(trace_id.to_string(), fut).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_hex() {
        let id = generate();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn current_is_visible_inside_scope_only() {
        assert!(current().is_none());
        let seen = scoped("abc123", async { current() }).await;
        assert_eq!(seen.as_deref(), Some("abc123"));
    }
}
