//! Client identity from proxy headers.

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{REFERER, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use billboard_core::ClientIdentity;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

const CF_CONNECTING_IP: &str = "cf-connecting-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Derives the raw and preferred client addresses.
///
/// The raw address is `CF-Connecting-IP`, else the first `X-Forwarded-For`
/// entry, else the peer. The preferred address is the first IPv4 entry of
/// `X-Forwarded-For`, else the raw address rendered as IPv4 when it is one,
/// else the raw address.
pub fn identify(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientIdentity {
    let forwarded_for = header_str(headers, X_FORWARDED_FOR);

    let raw_ip = header_str(headers, CF_CONNECTING_IP)
        .or_else(|| {
            forwarded_for
                .and_then(|xff| xff.split(',').next())
                .map(str::trim)
                .filter(|first| !first.is_empty())
        })
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_default();

    let preferred_ip = forwarded_for
        .into_iter()
        .flat_map(|xff| xff.split(','))
        .find_map(|entry| as_ipv4(entry.trim()))
        .or_else(|| as_ipv4(&raw_ip))
        .unwrap_or_else(|| raw_ip.clone());

    ClientIdentity {
        preferred_ip,
        raw_ip,
    }
}

/// Who is asking: identity plus the headers recorded with each event.
///
/// Extraction never fails. Without a `ConnectInfo` extension the peer
/// address is simply unknown.
#[derive(Debug, Clone)]
pub struct Visitor {
    pub client: ClientIdentity,
    pub user_agent: String,
    pub referrer: String,
}

impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let text = |name: &str| header_str(&parts.headers, name).unwrap_or_default().to_string();

        Ok(Self {
            client: identify(&parts.headers, peer),
            user_agent: text(USER_AGENT.as_str()),
            referrer: text(REFERER.as_str()),
        })
    }
}

fn as_ipv4(candidate: &str) -> Option<String> {
    match candidate.parse::<IpAddr>().ok()? {
        IpAddr::V4(v4) => Some(v4.to_string()),
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(|v4| v4.to_string()),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
