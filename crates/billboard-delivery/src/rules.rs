use billboard_core::AdTypeId;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// How many ads of a type one response may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Limited(u32),
    Unlimited,
}

impl Quota {
    /// Interprets a configured value; any negative number means unlimited.
    pub fn from_raw(value: i64) -> Self {
        if value < 0 {
            Quota::Unlimited
        } else {
            Quota::Limited(u32::try_from(value).unwrap_or(u32::MAX))
        }
    }
}

/// Quota per type id, iterated in ascending type-id order.
pub type QuotaRules = BTreeMap<AdTypeId, Quota>;

/// Quota rule sets keyed by placement name.
#[derive(Debug, Clone)]
pub struct PlacementRules {
    placements: HashMap<String, QuotaRules>,
}

impl PlacementRules {
    /// Creates an empty rule table.
    pub fn empty() -> Self {
        Self {
            placements: HashMap::new(),
        }
    }

    /// Adds or replaces a placement.
    pub fn with_placement<I>(mut self, name: impl Into<String>, rules: I) -> Self
    where
        I: IntoIterator<Item = (u32, Quota)>,
    {
        self.insert(name, rules);
        self
    }

    pub fn insert<I>(&mut self, name: impl Into<String>, rules: I)
    where
        I: IntoIterator<Item = (u32, Quota)>,
    {
        let rules = rules
            .into_iter()
            .map(|(id, quota)| (AdTypeId::new(id), quota))
            .collect();
        self.placements.insert(name.into(), rules);
    }

    /// Returns the rules for a placement with per-request overrides applied.
    ///
    /// An override replaces an `Unlimited` entry with `Limited(v)` when `v`
    /// is positive. `Limited` entries are never overridden. Overrides for
    /// types the placement does not list are ignored.
    pub fn resolve(
        &self,
        placement: &str,
        overrides: &HashMap<AdTypeId, i64>,
    ) -> Option<QuotaRules> {
        let base = self.placements.get(placement)?;

        Some(
            base.iter()
                .map(|(&ad_type, &quota)| {
                    let quota = match (quota, overrides.get(&ad_type)) {
                        (Quota::Unlimited, Some(&value)) if value > 0 => Quota::from_raw(value),
                        _ => quota,
                    };
                    (ad_type, quota)
                })
                .collect(),
        )
    }

    /// Every type id any placement mentions, ascending.
    ///
    /// This is the set the refresher fetches so one snapshot serves every
    /// placement.
    pub fn catalog(&self) -> Vec<AdTypeId> {
        self.placements
            .values()
            .flat_map(|rules| rules.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn placements(&self) -> impl Iterator<Item = &str> {
        self.placements.keys().map(String::as_str)
    }
}

impl Default for PlacementRules {
    /// The `news` and `home` placements.
    fn default() -> Self {
        Self::empty()
            .with_placement(
                "news",
                [
                    (1, Quota::Limited(1)),
                    (2, Quota::Limited(1)),
                    (3, Quota::Limited(2)),
                    (4, Quota::Unlimited),
                ],
            )
            .with_placement(
                "home",
                [
                    (1, Quota::Limited(1)),
                    (2, Quota::Limited(1)),
                    (3, Quota::Limited(1)),
                    (4, Quota::Unlimited),
                ],
            )
    }
}
