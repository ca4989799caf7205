use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::error::CatalogError;

pub fn builtin_catalogs() -> HashMap<&'static str, &'static str> {
    HashMap::from([("loot", include_str!("../content/loot.yaml"))])
}

pub fn builtin_encounters() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        (
            "goblin_ambush",
            include_str!("../content/encounters/goblin_ambush.yaml"),
        ),
        (
            "bandit_toll",
            include_str!("../content/encounters/bandit_toll.yaml"),
        ),
    ])
}

/// The catalog shipped with the engine.
pub fn builtin_catalog() -> Result<Catalog, CatalogError> {
    Catalog::from_yaml_str(include_str!("../content/loot.yaml"))
}
