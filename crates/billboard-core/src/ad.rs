use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Stable public code of an ad. Used for recency tracking and shortlinks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdCode(String);

impl AdCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AdCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl From<String> for AdCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl Display for AdCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an ad format (banner slot kind) that a request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdTypeId(u32);

impl AdTypeId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for AdTypeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for AdTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The asset an ad offers for one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeVariant {
    /// Asset file identifier, relative to the tenant's static base URL.
    pub file: String,
    /// Asset file extension (e.g. `png`).
    pub extension: String,
}

/// An active ad as returned by the repository.
///
/// `variants` is ordered by type id; selection relies on ascending
/// iteration to pick the type an ad is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ad {
    /// Public code, unique per tenant.
    pub code: AdCode,
    /// Repository identifier used when recording views and clicks.
    pub id: String,
    /// Where a click on the ad leads.
    pub target_url: String,
    /// Display breakpoint hint for the client.
    pub breakpoint: i32,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Offered assets keyed by type id.
    pub variants: BTreeMap<AdTypeId, TypeVariant>,
}

impl Ad {
    /// Returns the offered type ids in ascending order.
    pub fn type_ids(&self) -> impl Iterator<Item = AdTypeId> + '_ {
        self.variants.keys().copied()
    }

    /// Returns `true` if the ad offers a variant for the given type.
    pub fn offers(&self, ad_type: AdTypeId) -> bool {
        self.variants.contains_key(&ad_type)
    }

    /// Returns the variant for the given type, if offered.
    pub fn variant(&self, ad_type: AdTypeId) -> Option<&TypeVariant> {
        self.variants.get(&ad_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(file: &str) -> TypeVariant {
        TypeVariant {
            file: file.to_string(),
            extension: "png".to_string(),
        }
    }

    #[test]
    fn type_ids_are_ascending_regardless_of_insertion_order() {
        let mut variants = BTreeMap::new();
        variants.insert(AdTypeId::new(3), variant("c"));
        variants.insert(AdTypeId::new(1), variant("a"));
        variants.insert(AdTypeId::new(2), variant("b"));

        let ad = Ad {
            code: AdCode::from("x1"),
            id: "uuid-x1".to_string(),
            target_url: "https://example.com".to_string(),
            breakpoint: 0,
            description: None,
            variants,
        };

        let ids: Vec<u32> = ad.type_ids().map(AdTypeId::get).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(ad.offers(AdTypeId::new(2)));
        assert!(!ad.offers(AdTypeId::new(4)));
        assert_eq!(ad.variant(AdTypeId::new(1)).unwrap().file, "a");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&AdCode::from("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
        let json = serde_json::to_string(&AdTypeId::new(4)).unwrap();
        assert_eq!(json, "4");
    }
}
