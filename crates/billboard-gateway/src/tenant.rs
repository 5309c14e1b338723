use crate::error::StartupError;
use axum::http::header::HOST;
use axum::http::HeaderMap;
use billboard_core::TenantId;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// A publisher site and the URLs its pages are served with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TenantSite {
    #[serde(default)]
    pub host: String,
    pub id: TenantId,
    /// Portal host, the target of failed shortlinks.
    pub portal: String,
    pub ads_url: String,
    pub static_url: String,
}

#[derive(Debug, Deserialize)]
struct DirectoryFile {
    default: TenantSite,
    #[serde(default)]
    tenants: Vec<TenantSite>,
}

/// Maps request hosts to tenants.
#[derive(Debug, Clone)]
pub struct TenantDirectory {
    default: Arc<TenantSite>,
    by_host: Arc<HashMap<String, Arc<TenantSite>>>,
}

impl TenantDirectory {
    pub fn new(default: TenantSite, sites: impl IntoIterator<Item = TenantSite>) -> Self {
        let by_host = sites
            .into_iter()
            .map(|site| (normalize_host(&site.host), Arc::new(site)))
            .collect();
        Self {
            default: Arc::new(default),
            by_host: Arc::new(by_host),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StartupError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StartupError::Config(format!("{}: {e}", path.display())))?;
        let file: DirectoryFile = serde_json::from_str(&raw)
            .map_err(|e| StartupError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self::new(file.default, file.tenants))
    }

    /// A single local tenant, used when no directory file is configured.
    pub fn local(listen_host: &str) -> Self {
        Self::new(
            TenantSite {
                host: listen_host.to_string(),
                id: TenantId::new(1),
                portal: listen_host.to_string(),
                ads_url: format!("http://{listen_host}"),
                static_url: format!("http://{listen_host}/static"),
            },
            [],
        )
    }

    pub fn default_site(&self) -> &TenantSite {
        &self.default
    }

    /// Resolves from `X-Forwarded-Host`, else `Host`. Unknown hosts get the
    /// default site.
    pub fn resolve(&self, headers: &HeaderMap) -> &TenantSite {
        let host = header_str(headers, X_FORWARDED_HOST)
            .or_else(|| header_str(headers, HOST.as_str()))
            .unwrap_or_default();
        self.lookup(host)
    }

    pub fn lookup(&self, host: &str) -> &TenantSite {
        let host = normalize_host(host);
        if let Some(site) = self.by_host.get(&host) {
            return site;
        }
        // Browsers send the port when it is not the scheme default.
        host.rsplit_once(':')
            .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
            .and_then(|(bare, _)| self.by_host.get(bare))
            .map_or(&self.default, |site| site)
    }

    /// Every distinct tenant id, default included, in ascending order.
    pub fn tenant_ids(&self) -> Vec<TenantId> {
        std::iter::once(self.default.id)
            .chain(self.by_host.values().map(|site| site.id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn normalize_host(host: &str) -> String {
    host.trim().to_ascii_lowercase()
}
