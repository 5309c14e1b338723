use crate::client::Visitor;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, LOCATION};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use billboard_redirector::{fallback_url, ClickRequest};
use tracing::debug;

pub async fn short_handler(
    State(state): State<AppState>,
    Path(short): Path<String>,
    headers: HeaderMap,
    visitor: Visitor,
) -> Response {
    let site = state.tenants.resolve(&headers);

    let click = ClickRequest {
        tenant: site.id,
        code: short,
        portal: site.portal.clone(),
        client: visitor.client,
        user_agent: visitor.user_agent,
        referrer: visitor.referrer,
    };
    let redirect = state.redirect.redirect(&click).await;
    debug!(tenant = %site.id, code = %click.code, location = %redirect.location(), "Redirecting");

    // A location that is not a valid header value cannot be sent; use the portal.
    let location = HeaderValue::from_str(redirect.location())
        .or_else(|_| HeaderValue::from_str(&fallback_url(&site.portal)))
        .unwrap_or_else(|_| HeaderValue::from_static("/"));

    (
        StatusCode::FOUND,
        [
            (LOCATION, location),
            (CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
    )
        .into_response()
}
