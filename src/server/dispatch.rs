//! Bridge between axum requests and the mock engine

use axum::{
    body::{to_bytes, Body},
    extract::{Query, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::warn;

use super::state::AppState;
use crate::engine::MockResponse;
use crate::error::{MockError, MockResult};
use crate::routes::{HttpMethod, MockRequest};
use crate::{GENERATOR_NAME, VERSION};

/// Largest request body accepted
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Header advertising the generator unless branding is hidden
pub const BRANDING_HEADER: &str = "x-powered-by";

/// Fallback handler: every request not claimed by an operational endpoint
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let branding = state.branding();

    let mock_request = match into_mock_request(request).await {
        Ok(r) => r,
        Err(e) => return render(MockResponse::from_error(&e), branding),
    };

    let response = state.engine.handle(mock_request).await;
    render(response, branding)
}

async fn into_mock_request(request: Request) -> MockResult<MockRequest> {
    let (parts, body) = request.into_parts();

    let method = HttpMethod::from_http(&parts.method).map_err(|_| MockError::NotFound {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
    })?;

    let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map(|Query(q)| q)
        .unwrap_or_default();

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| MockError::InvalidBody(e.to_string()))?;

    Ok(MockRequest {
        method,
        path: parts.uri.path().to_string(),
        params: HashMap::new(),
        query,
        headers,
        body: parse_body(&parts.headers, &bytes)?,
    })
}

/// JSON bodies are parsed; anything else is passed through as a string
fn parse_body(headers: &HeaderMap, bytes: &[u8]) -> MockResult<Option<Value>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let declared_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("json"))
        .unwrap_or(false);

    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) if declared_json => Err(MockError::InvalidBody(e.to_string())),
        Err(_) => Ok(Some(Value::String(String::from_utf8_lossy(bytes).into_owned()))),
    }
}

fn render(response: MockResponse, branding: bool) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut http = match response.body {
        Some(body) if status != StatusCode::NO_CONTENT => {
            let body = if branding { with_meta(body) } else { body };
            (status, Json(body)).into_response()
        }
        _ => (status, Body::empty()).into_response(),
    };

    let headers = http.headers_mut();
    for (name, value) in &response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "Skipping invalid response header"),
        }
    }
    if branding {
        headers.insert(
            HeaderName::from_static(BRANDING_HEADER),
            HeaderValue::from_static(GENERATOR_NAME),
        );
    }

    http
}

fn with_meta(body: Value) -> Value {
    match body {
        Value::Object(mut map) => {
            map.insert(
                "_meta".to_string(),
                json!({ "generator": GENERATOR_NAME, "version": VERSION }),
            );
            Value::Object(map)
        }
        other => other,
    }
}
