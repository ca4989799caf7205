use serde::{Deserialize, Serialize};

use crate::Dice;
use crate::catalog::Element;
use crate::checks::{bribe_percent, flee_percent, roll_check, talk_percent};
use crate::combatant::{Combatant, Party};
use crate::config::EngineConfig;
use crate::mitigation::{apply_damage, mitigated_damage};

/// What the player chose to do on their turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    Attack,
    Cast,
    Flee,
    Talk,
    Bribe,
}

impl PlayerAction {
    pub fn parse(s: &str) -> Option<PlayerAction> {
        match s.trim().to_lowercase().as_str() {
            "attack" | "a" => Some(PlayerAction::Attack),
            "cast" | "spell" | "c" => Some(PlayerAction::Cast),
            "flee" | "run" | "f" => Some(PlayerAction::Flee),
            "talk" | "t" => Some(PlayerAction::Talk),
            "bribe" | "b" => Some(PlayerAction::Bribe),
            _ => None,
        }
    }
}

/// Base attack plus equipped weapon range; never below 1.
pub fn attack_roll(attacker: &Combatant, dice: &mut Dice) -> i32 {
    let weapon = attacker.weapon_range();
    let lo = attacker.attack.min + weapon.min;
    let hi = attacker.attack.max + weapon.max;
    dice.range(lo, hi).max(1)
}

pub fn spell_roll(cfg: &EngineConfig, dice: &mut Dice) -> i32 {
    dice.range(cfg.spell_damage[0], cfg.spell_damage[1]).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub dealt: i32,
    pub killed: bool,
}

/// Mitigates `raw` against the defender's gear and subtracts it from the tracked `hp`.
pub fn land_hit(
    attacker: &str,
    raw: i32,
    element: Element,
    defender: &Combatant,
    hp: &mut i32,
    max_hp: i32,
    mut log: impl FnMut(String),
) -> Hit {
    let dealt = mitigated_damage(raw, defender, element);
    if element == Element::Physical {
        log(format!("[HIT][{}] hits {} for {}", attacker, defender.name, dealt));
    } else {
        log(format!(
            "[HIT][{}] hits {} for {} ({:?})",
            attacker, defender.name, dealt, element
        ));
    }
    let killed = apply_damage(&defender.name, hp, max_hp, dealt, &mut log);
    Hit { dealt, killed }
}

pub fn attempt_flee(player: &Combatant, enemy: &Combatant, dice: &mut Dice, mut log: impl FnMut(String)) -> bool {
    let percent = flee_percent(player.stat("dexterity"), enemy.stat("dexterity"));
    let res = roll_check(dice, percent, &format!("{} flees {}", player.name, enemy.name), &mut log);
    if res.passed {
        log(format!("[FLEE][{}] slips away", player.name));
    } else {
        log(format!("[FLEE][{}] fails to get away", player.name));
    }
    res.passed
}

pub fn attempt_talk(
    player: &Combatant,
    enemy: &Combatant,
    romance_progress: u32,
    dice: &mut Dice,
    mut log: impl FnMut(String),
) -> bool {
    let percent = talk_percent(enemy.stat("will"), romance_progress);
    let res = roll_check(dice, percent, &format!("{} talks to {}", player.name, enemy.name), &mut log);
    if res.passed {
        log(format!("[TALK][{}] talks {} down; the hostility fades", player.name, enemy.name));
    } else {
        log(format!("[TALK][{}] wavers... maybe a bribe would help", enemy.name));
    }
    res.passed
}

/// Hands over the first bribe-worthy item (if any) and rolls against the enemy's greed.
pub fn attempt_bribe(party: &mut Party, enemy: &Combatant, dice: &mut Dice, mut log: impl FnMut(String)) -> bool {
    match party.take_bribe_goods() {
        Some(item) => log(format!("[BRIBE][{}] offers {}", party.player.name, item.name)),
        None => log(format!("[BRIBE][{}] offers future favors", party.player.name)),
    }
    let percent = bribe_percent(enemy.stat("greed"));
    let res = roll_check(dice, percent, &format!("{} bribes {}", party.player.name, enemy.name), &mut log);
    if res.passed {
        log(format!("[BRIBE][{}] takes the bribe and lets you pass", enemy.name));
    } else {
        log(format!("[BRIBE][{}] refuses; no deal", enemy.name));
    }
    res.passed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{CombatantKind, DamageRange};

    #[test]
    fn unarmed_attack_uses_base_range() {
        let hero = Combatant::new(CombatantKind::Player, "Hero", 20).with_attack(2, 4);
        assert_eq!(hero.weapon_range(), DamageRange { min: 0, max: 0 });
        let mut dice = Dice::from_scripted(vec![0.0, 0.99]);
        assert_eq!(attack_roll(&hero, &mut dice), 2);
        assert_eq!(attack_roll(&hero, &mut dice), 4);
    }

    #[test]
    fn zero_attack_is_clamped_to_one() {
        let weak = Combatant::new(CombatantKind::Ally, "Pip", 5).with_attack(0, 0);
        let mut dice = Dice::from_scripted(vec![0.5]);
        assert_eq!(attack_roll(&weak, &mut dice), 1);
    }

    #[test]
    fn parse_accepts_short_forms() {
        assert_eq!(PlayerAction::parse("A"), Some(PlayerAction::Attack));
        assert_eq!(PlayerAction::parse("spell"), Some(PlayerAction::Cast));
        assert_eq!(PlayerAction::parse("dance"), None);
    }
}
