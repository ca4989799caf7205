use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarityTier {
    Common,
    Uncommon,
    Rare,
    Exotic,
    Legendary,
    Mythic,
}

impl RarityTier {
    pub const ALL: [RarityTier; 6] = [
        RarityTier::Common,
        RarityTier::Uncommon,
        RarityTier::Rare,
        RarityTier::Exotic,
        RarityTier::Legendary,
        RarityTier::Mythic,
    ];

    pub fn title(self) -> &'static str {
        match self {
            RarityTier::Common => "Common",
            RarityTier::Uncommon => "Uncommon",
            RarityTier::Rare => "Rare",
            RarityTier::Exotic => "Exotic",
            RarityTier::Legendary => "Legendary",
            RarityTier::Mythic => "Mythic",
        }
    }
}

/// Per-tier roll parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RarityRule {
    /// Selection weight when a template leaves rarity open.
    pub weight: f64,
    /// Budget multiplier applied to sampled damage/defense.
    pub budget: f64,
    /// Inclusive enchant-count range.
    pub affixes: [u32; 2],
    /// Multiplier applied to the computed value.
    #[serde(default = "one")]
    pub value: f64,
}

fn one() -> f64 {
    1.0
}

/// The six tiers in ascending order. Multipliers never decrease with tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RarityTable {
    rules: IndexMap<RarityTier, RarityRule>,
}

impl RarityTable {
    pub fn new(rules: IndexMap<RarityTier, RarityRule>) -> Result<Self, CatalogError> {
        let mut ordered = IndexMap::new();
        let mut prev: Option<RarityRule> = None;
        for tier in RarityTier::ALL {
            let rule = *rules.get(&tier).ok_or(CatalogError::MissingRarity(tier))?;
            if let Some(p) = prev {
                if rule.budget < p.budget {
                    return Err(CatalogError::NonMonotonicRarity {
                        tier,
                        what: "budget",
                        value: rule.budget,
                        previous: p.budget,
                    });
                }
                if rule.value < p.value {
                    return Err(CatalogError::NonMonotonicRarity {
                        tier,
                        what: "value",
                        value: rule.value,
                        previous: p.value,
                    });
                }
            }
            ordered.insert(tier, rule);
            prev = Some(rule);
        }
        Ok(Self { rules: ordered })
    }

    pub fn rule(&self, tier: RarityTier) -> RarityRule {
        // Construction guarantees every tier is present.
        self.rules.get(&tier).copied().unwrap_or(DEFAULT_RULES[tier as usize].1)
    }

    /// Weights after applying an additive bias (floored at zero).
    pub fn biased_weights(&self, bias: &IndexMap<RarityTier, f64>) -> Vec<(RarityTier, f64)> {
        self.rules
            .iter()
            .map(|(tier, rule)| {
                let delta = bias.get(tier).copied().unwrap_or(0.0);
                (*tier, (rule.weight + delta).max(0.0))
            })
            .collect()
    }
}

const DEFAULT_RULES: [(RarityTier, RarityRule); 6] = [
    (RarityTier::Common, RarityRule { weight: 60.0, budget: 1.0, affixes: [0, 0], value: 1.0 }),
    (RarityTier::Uncommon, RarityRule { weight: 25.0, budget: 1.1, affixes: [0, 1], value: 1.5 }),
    (RarityTier::Rare, RarityRule { weight: 10.0, budget: 1.25, affixes: [1, 1], value: 2.5 }),
    (RarityTier::Exotic, RarityRule { weight: 3.5, budget: 1.4, affixes: [1, 2], value: 4.0 }),
    (RarityTier::Legendary, RarityRule { weight: 1.0, budget: 1.6, affixes: [1, 2], value: 7.0 }),
    (RarityTier::Mythic, RarityRule { weight: 0.5, budget: 1.85, affixes: [2, 2], value: 12.0 }),
];

impl Default for RarityTable {
    fn default() -> Self {
        Self { rules: DEFAULT_RULES.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_monotonic() {
        let table = RarityTable::default();
        let rebuilt = RarityTable::new(table.rules.clone()).unwrap();
        assert_eq!(rebuilt, table);
        assert_eq!(table.rule(RarityTier::Common).affixes, [0, 0]);
        assert_eq!(table.rule(RarityTier::Mythic).affixes, [2, 2]);
    }

    #[test]
    fn decreasing_budget_is_rejected() {
        let mut rules: IndexMap<_, _> = DEFAULT_RULES.into_iter().collect();
        rules.get_mut(&RarityTier::Rare).unwrap().budget = 0.5;
        let err = RarityTable::new(rules).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::NonMonotonicRarity { tier: RarityTier::Rare, what: "budget", .. }
        ));
    }

    #[test]
    fn bias_is_floored_at_zero() {
        let table = RarityTable::default();
        let bias = IndexMap::from([(RarityTier::Common, -100.0), (RarityTier::Rare, 5.0)]);
        let weights = table.biased_weights(&bias);
        assert_eq!(weights[0], (RarityTier::Common, 0.0));
        assert_eq!(weights[2], (RarityTier::Rare, 15.0));
    }
}
