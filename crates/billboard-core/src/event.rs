use crate::error::Result;
use crate::tenant::TenantId;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// What happened to an ad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// The ad was delivered in an ad response.
    View,
    /// A shortlink pointing at the ad was followed.
    Click,
}

impl EventKind {
    /// Numeric code persisted in the event log.
    pub fn code(self) -> i8 {
        match self {
            EventKind::View => 1,
            EventKind::Click => 2,
        }
    }
}

/// Network identity of the client that triggered an event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// IPv4 address when one is available, otherwise the raw address.
    pub preferred_ip: String,
    /// Address exactly as reported by the edge or the socket.
    pub raw_ip: String,
}

/// A single view or click record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdEvent {
    pub ad_id: String,
    pub tenant: TenantId,
    pub kind: EventKind,
    pub client: ClientIdentity,
    pub user_agent: String,
    pub referrer: String,
    pub occurred_at: Timestamp,
}

/// Sink for view and click records.
///
/// Writes are best-effort from the caller's point of view: failures are
/// logged and never surfaced to the request.
#[async_trait]
pub trait EventLog: Send + Sync + 'static {
    async fn record(&self, event: &AdEvent) -> Result<()>;
}
