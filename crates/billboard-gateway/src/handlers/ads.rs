use crate::client::Visitor;
use crate::error::Result;
use crate::model::{AdItem, AdsQuery, AdsResponse};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use billboard_delivery::DeliveryRequest;
use std::collections::HashMap;
use tracing::info;

pub async fn ads_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    visitor: Visitor,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<AdsResponse>> {
    let site = state.tenants.resolve(&headers);
    let query = AdsQuery::from_params(&params);

    let request = DeliveryRequest {
        tenant: site.id,
        placement: query.placement,
        overrides: query.overrides,
        client: visitor.client,
        user_agent: visitor.user_agent,
        referrer: visitor.referrer,
    };
    let delivery = state.delivery.deliver(&request).await?;

    let ads: Vec<AdItem> = delivery.ads.iter().filter_map(AdItem::from_selected).collect();
    info!(
        tenant = %site.id,
        placement = %request.placement,
        served = ads.len(),
        "Served ads"
    );

    Ok(Json(AdsResponse {
        ads,
        redirect: site.ads_url.clone(),
        static_url: site.static_url.clone(),
    }))
}
