use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::combatant::Party;
use crate::config::EngineConfig;

/// Per-level stat gains for one class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassGrowth {
    pub vitality: i32,
    pub strength: i32,
    pub dexterity: i32,
    pub attack_min: i32,
    pub attack_max: i32,
}

pub fn default_classes() -> IndexMap<String, ClassGrowth> {
    let row = |vitality, strength, dexterity, attack_min, attack_max| ClassGrowth {
        vitality,
        strength,
        dexterity,
        attack_min,
        attack_max,
    };
    IndexMap::from([
        ("warrior".to_string(), row(2, 2, 0, 1, 2)),
        ("rogue".to_string(), row(1, 0, 2, 1, 1)),
        ("mage".to_string(), row(1, 0, 1, 0, 1)),
        ("default".to_string(), row(1, 1, 1, 1, 1)),
    ])
}

/// Total experience needed to leave `level`. Saturates at `u32::MAX`, which is never reached.
pub fn xp_threshold(level: u32) -> u32 {
    level.saturating_mul(100).max(50)
}

/// Credits `amount` experience to the party and applies every level-up it buys.
/// Returns the number of levels gained.
pub fn award_xp(party: &mut Party, amount: u32, cfg: &EngineConfig, mut log: impl FnMut(String)) -> u32 {
    if amount == 0 {
        return 0;
    }
    party.xp = party.xp.saturating_add(amount);
    log(format!(
        "[XP][{}] gains {} XP ({} total)",
        party.player.name, amount, party.xp
    ));

    let growth = cfg.growth_for(&party.class);
    let mut gained = 0;
    loop {
        let needed = xp_threshold(party.player.level);
        if needed == u32::MAX || party.xp < needed {
            break;
        }
        let player = &mut party.player;
        player.level += 1;
        let attrs = &mut player.attributes;
        attrs.vitality = attrs.vitality.saturating_add(growth.vitality);
        attrs.strength = attrs.strength.saturating_add(growth.strength);
        attrs.dexterity = attrs.dexterity.saturating_add(growth.dexterity);
        player.attack.min = player.attack.min.saturating_add(growth.attack_min);
        player.attack.max = player.attack.max.saturating_add(growth.attack_max);
        if player.attack.max < player.attack.min {
            player.attack.max = player.attack.min;
        }

        let old_max = player.max_hp();
        player.set_max_hp(player.attributes.vitality.saturating_mul(5));
        let gain = (player.max_hp() - old_max).max(0);
        player.set_hp(player.hp().saturating_add(gain));
        gained += 1;
        log(format!(
            "[LEVEL][{}] reaches level {} (HP {}/{}, attack {}-{})",
            player.name,
            player.level,
            player.hp(),
            player.max_hp(),
            player.attack.min,
            player.attack.max
        ));
    }
    gained
}
