use crate::ad::AdCode;
use crate::error::CacheError;
use crate::tenant::TenantId;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt::Display;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Opaque per-user fingerprint used to key recency windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserKey(String);

impl UserKey {
    /// Derives a key from the client's address and user agent.
    pub fn fingerprint(ip: &str, user_agent: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(ip.trim().as_bytes());
        hasher.update(b"|");
        hasher.update(user_agent.trim().as_bytes());
        Self(URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }

    /// Wraps an already computed key.
    pub fn new_unchecked(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage key of a recency window.
pub fn recency_key(tenant: TenantId, user: &UserKey) -> String {
    format!("recent:{}:{}", tenant, user.as_str())
}

/// Remembers the last ad codes shown to each user of a tenant.
#[async_trait]
pub trait RecencyStore: Send + Sync + 'static {
    /// Returns up to `n` most recent codes, most recent first.
    async fn recent(&self, tenant: TenantId, user: &UserKey, n: usize) -> Result<Vec<AdCode>>;

    /// Prepends `codes` to the user's window and truncates it to `n`.
    ///
    /// After the call the window starts with `codes` in the given order,
    /// followed by the previous entries. Expiry is refreshed as part of the
    /// same step.
    async fn push(&self, tenant: TenantId, user: &UserKey, codes: &[AdCode], n: usize)
        -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_trimmed() {
        let a = UserKey::fingerprint("10.0.0.1", "Mozilla/5.0");
        let b = UserKey::fingerprint(" 10.0.0.1 ", "Mozilla/5.0 ");
        assert_eq!(a, b);
        // 32 bytes of SHA-256, base64url without padding
        assert_eq!(a.as_str().len(), 43);
        assert!(!a.as_str().contains('='));
    }

    #[test]
    fn fingerprint_differs_by_user_agent() {
        let a = UserKey::fingerprint("10.0.0.1", "curl/8.0");
        let b = UserKey::fingerprint("10.0.0.1", "Mozilla/5.0");
        assert_ne!(a, b);
    }

    #[test]
    fn key_format() {
        let key = recency_key(TenantId::new(2), &UserKey::new_unchecked("u1"));
        assert_eq!(key, "recent:2:u1");
    }
}
