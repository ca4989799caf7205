use thiserror::Error;

use crate::rarity::RarityTier;

/// Problems found while turning catalog documents into a [`crate::Catalog`].
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse catalog YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("item #{index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("item #{index}: `{field}` has an unusable value")]
    InvalidField { index: usize, field: &'static str },
    #[error("rarity table has no entry for {0:?}")]
    MissingRarity(RarityTier),
    #[error("rarity {tier:?} lowers the {what} multiplier ({value} < {previous})")]
    NonMonotonicRarity {
        tier: RarityTier,
        what: &'static str,
        value: f64,
        previous: f64,
    },
    #[error("drop table `{0}` has no positive weights")]
    EmptyDropTable(String),
}

/// Reasons a combat action request is refused. Refusals never change session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("the encounter is already over")]
    SessionEnded,
    #[error("it is not the player's turn")]
    NotPlayersTurn,
    #[error("no target")]
    NoTarget,
    #[error("no one is open to a bribe")]
    NoBribeOpportunity,
    #[error("you need a wand or staff to focus your magic")]
    NoFocus,
}
