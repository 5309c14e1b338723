//! The selection pipeline.
//!
//! [`select`] runs four steps in order: [`filter_by_types`], [`avoid_recent`],
//! [`shuffle`], [`pick_by_quota`]. Every step is a plain function over owned
//! or borrowed data; nothing here performs I/O or can fail.

use crate::rules::{Quota, QuotaRules};
use billboard_core::{Ad, AdCode, AdTypeId, TypeVariant};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// An ad admitted into a response, attributed to one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedAd {
    pub ad: Ad,
    pub ad_type: AdTypeId,
}

impl SelectedAd {
    /// The asset for the attributed type.
    pub fn variant(&self) -> Option<&TypeVariant> {
        self.ad.variant(self.ad_type)
    }
}

/// Keeps ads offering at least one type the rules mention.
///
/// Empty rules keep everything.
pub fn filter_by_types(pool: &[Ad], rules: &QuotaRules) -> Vec<Ad> {
    if rules.is_empty() {
        return pool.to_vec();
    }

    pool.iter()
        .filter(|ad| ad.type_ids().any(|t| rules.contains_key(&t)))
        .cloned()
        .collect()
}

/// Drops recently shown ads, unless that would leave nothing.
pub fn avoid_recent(ads: Vec<Ad>, recent: &HashSet<AdCode>) -> Vec<Ad> {
    if recent.is_empty() {
        return ads;
    }

    let fresh: Vec<Ad> = ads
        .iter()
        .filter(|ad| !recent.contains(&ad.code))
        .cloned()
        .collect();

    if fresh.is_empty() {
        ads
    } else {
        fresh
    }
}

/// Uniform in-place permutation.
pub fn shuffle<R: Rng + ?Sized>(ads: &mut [Ad], rng: &mut R) {
    ads.shuffle(rng);
}

/// Admits ads in order while quota remains.
///
/// Each ad is tried under its offered types in ascending id order and
/// attributed to the first type that is unlimited or still has quota left.
/// Ads with no such type are dropped. A code is admitted at most once.
pub fn pick_by_quota(ads: Vec<Ad>, rules: &QuotaRules) -> Vec<SelectedAd> {
    let mut remaining = rules.clone();
    let mut seen: HashSet<AdCode> = HashSet::with_capacity(ads.len());
    let mut picked = Vec::new();

    for ad in ads {
        if seen.contains(&ad.code) {
            continue;
        }

        let chosen = if rules.is_empty() {
            ad.type_ids().next()
        } else {
            ad.type_ids().find(|t| match remaining.get_mut(t) {
                Some(Quota::Unlimited) => true,
                Some(Quota::Limited(left)) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            })
        };

        if let Some(ad_type) = chosen {
            seen.insert(ad.code.clone());
            picked.push(SelectedAd { ad, ad_type });
        }
    }

    picked
}

/// Runs the full pipeline over a tenant's pool.
pub fn select<R: Rng + ?Sized>(
    pool: &[Ad],
    rules: &QuotaRules,
    recent: &HashSet<AdCode>,
    rng: &mut R,
) -> Vec<SelectedAd> {
    let typed = filter_by_types(pool, rules);
    let mut candidates = avoid_recent(typed, recent);
    shuffle(&mut candidates, rng);
    pick_by_quota(candidates, rules)
}
