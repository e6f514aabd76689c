use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

use llmgate::LLMGATE_REQUEST_ID_HEADER;

/// Correlation id assigned to every inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Assigns a fresh UUID v4 to the request and echoes it in `X-Request-ID`.
///
/// Any client-supplied `X-Request-ID` is ignored.
pub async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let id = uuid::Uuid::new_v4().to_string();
    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response
            .headers_mut()
            .insert(LLMGATE_REQUEST_ID_HEADER, value);
    }
    response
}
