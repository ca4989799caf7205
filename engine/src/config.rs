use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::progression::{default_classes, ClassGrowth};

/// Tunables shared by the loot roller and the combat engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct EngineConfig {
    pub world_seed: u64,
    /// Upper bound on non-player turns resolved per external call.
    pub autoplay_cap: u32,
    /// On-hit status chance when the weapon or focus specifies none.
    pub status_chance: f64,
    pub enemy_damage: [i32; 2],
    pub spell_damage: [i32; 2],
    pub default_xp_reward: u32,
    /// How many alias hops the resolver follows before giving up.
    pub max_alias_depth: u32,
    pub classes: IndexMap<String, ClassGrowth>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_seed: 0,
            autoplay_cap: 64,
            status_chance: 0.15,
            enemy_damage: [2, 5],
            spell_damage: [4, 8],
            default_xp_reward: 25,
            max_alias_depth: 1,
            classes: default_classes(),
        }
    }
}

impl EngineConfig {
    pub fn with_world_seed(world_seed: u64) -> Self {
        Self { world_seed, ..Self::default() }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Growth row for `class`, falling back to the `default` row.
    pub fn growth_for(&self, class: &str) -> ClassGrowth {
        self.classes
            .get(&class.to_lowercase())
            .or_else(|| self.classes.get("default"))
            .copied()
            .unwrap_or_default()
    }
}
