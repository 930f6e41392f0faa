//! Request forwarding
//!
//! The single fallback handler of the proxy: resolve the Host header,
//! forward the request to the project's artifact root, and stream the
//! upstream response back unmodified. An unknown subdomain is a 404 with
//! no upstream call; an unreachable upstream is a 502.

use axum::{
    Json,
    body::Body,
    extract::{Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::ProxyState;
use crate::resolve;

/// Upper bound on a buffered request body (artifact sites only ever see
/// small bodies; anything larger is rejected rather than proxied)
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Handles every inbound request
pub async fn handle(State(state): State<ProxyState>, request: Request) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let Some(subdomain) = resolve::subdomain_from_host(host) else {
        return error_response(StatusCode::NOT_FOUND, "Request has no subdomain");
    };

    let project = match resolve::project_for_subdomain(&state.pool, subdomain).await {
        Ok(Some(project)) => project,
        Ok(None) => {
            tracing::debug!("No project for subdomain {}", subdomain);
            return error_response(
                StatusCode::NOT_FOUND,
                &format!("No project for subdomain {}", subdomain),
            );
        }
        Err(e) => {
            tracing::error!("Project lookup failed: {:?}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    forward(state, project, request).await
}

/// Forwards `request` to the project's artifact root
async fn forward(
    state: ProxyState,
    project: resolve::ResolvedProject,
    request: Request,
) -> Response {
    let root = resolve::artifact_root(&state.config.artifact_origin, project.id);
    let target = resolve::target_url(&root, request.uri().path(), request.uri().query());

    tracing::debug!("{} {} -> {}", request.method(), project.subdomain, target);

    let method = request.method().clone();
    let mut headers = request.headers().clone();

    // The upstream authority replaces the inbound one; everything else is
    // preserved.
    headers.remove(header::HOST);

    let body = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
    };

    let upstream = state
        .client
        .request(method, &target)
        .headers(headers)
        .body(body)
        .send()
        .await;

    match upstream {
        Ok(resp) => {
            let status = resp.status();
            let resp_headers = resp.headers().clone();

            let mut response = Response::new(Body::from_stream(resp.bytes_stream()));
            *response.status_mut() = status;
            *response.headers_mut() = resp_headers;

            response
        }
        Err(e) => {
            tracing::error!("Upstream request to {} failed: {}", target, e);
            error_response(StatusCode::BAD_GATEWAY, "Upstream unreachable")
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
