use axum::body::HttpBody;
use axum::extract::Request;
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request metadata handed explicitly to handlers so every log line they
/// emit can be correlated with the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub method: Method,
    pub path: String,
}

impl RequestContext {
    fn from_request(req: &Request) -> Self {
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(generate_request_id);

        Self {
            request_id,
            method: req.method().clone(),
            path: req.uri().path().to_string(),
        }
    }
}

pub fn generate_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Response size from `Content-Length`, falling back to an exact body size
/// hint. `None` for streamed bodies of unknown length.
fn response_bytes(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .or_else(|| response.body().size_hint().exact())
}

pub async fn attach_request_context(mut req: Request, next: Next) -> Response {
    let ctx = RequestContext::from_request(&req);
    req.extensions_mut().insert(ctx.clone());

    tracing::info!(
        request_id = %ctx.request_id,
        method = %ctx.method,
        path = %ctx.path,
        "request started"
    );
    let started = Instant::now();

    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    tracing::info!(
        request_id = %ctx.request_id,
        method = %ctx.method,
        path = %ctx.path,
        status = response.status().as_u16(),
        bytes = response_bytes(&response),
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "request completed"
    );

    response
}
