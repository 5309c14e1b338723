use billboard_core::AdTypeId;
use billboard_delivery::SelectedAd;
use serde::Serialize;
use std::collections::HashMap;

const PLACEMENT_PARAM: &str = "type";
const OVERRIDE_PREFIX: &str = "ad_type_";

/// Query of `GET /`: `type=<placement>` plus optional `ad_type_<id>=<n>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdsQuery {
    pub placement: String,
    pub overrides: HashMap<AdTypeId, i64>,
}

impl AdsQuery {
    /// Unparseable override keys or values are ignored.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let placement = params
            .get(PLACEMENT_PARAM)
            .map(|value| value.trim().to_string())
            .unwrap_or_default();

        let overrides = params
            .iter()
            .filter_map(|(key, value)| {
                let id = key.strip_prefix(OVERRIDE_PREFIX)?.parse::<u32>().ok()?;
                let bound = value.trim().parse::<i64>().ok()?;
                Some((AdTypeId::new(id), bound))
            })
            .collect();

        Self {
            placement,
            overrides,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdItem {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub breakpoint: i32,
    #[serde(rename = "type")]
    pub ad_type: AdTypeId,
    pub file: String,
    pub extension: String,
    pub target_url: String,
}

impl AdItem {
    /// `None` when the ad has no asset for its attributed type.
    pub fn from_selected(selected: &SelectedAd) -> Option<Self> {
        let variant = selected.variant()?;
        Some(Self {
            code: selected.ad.code.as_str().to_string(),
            description: selected
                .ad
                .description
                .clone()
                .filter(|description| !description.is_empty()),
            breakpoint: selected.ad.breakpoint,
            ad_type: selected.ad_type,
            file: variant.file.clone(),
            extension: variant.extension.clone(),
            target_url: selected.ad.target_url.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AdsResponse {
    pub ads: Vec<AdItem>,
    /// Base URL shortlinks are served from.
    pub redirect: String,
    #[serde(rename = "static")]
    pub static_url: String,
}
