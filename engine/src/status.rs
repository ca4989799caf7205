use crate::Dice;
use crate::combatant::Combatant;

const EDGED: &[&str] = &["sword", "dagger", "axe", "halberd", "spear", "shortsword"];
const BLUNT: &[&str] = &["mace", "club", "hammer", "greatclub"];
const CASTER: &[&str] = &["wand", "staff"];

/// Statuses an attack by `attacker` may inflict.
///
/// Authored statuses on the weapon win, then the element-derived hints from the roll,
/// then a pool inferred from the weapon type.
pub fn status_pool(attacker: &Combatant) -> Vec<String> {
    let Some(weapon) = attacker.weapon.as_ref() else {
        return inferred_pool("");
    };
    let pool = weapon.status_pool();
    if !pool.is_empty() {
        return pool;
    }
    inferred_pool(&weapon.item_type)
}

pub fn inferred_pool(item_type: &str) -> Vec<String> {
    let t = item_type.to_lowercase();
    let pool: &[&str] = if EDGED.contains(&t.as_str()) {
        &["bleed"]
    } else if BLUNT.contains(&t.as_str()) {
        &["stagger"]
    } else if CASTER.contains(&t.as_str()) {
        &["burn", "shock", "freeze"]
    } else {
        &["bleed", "burn", "shock", "freeze", "poison"]
    };
    pool.iter().map(|s| s.to_string()).collect()
}

/// Post-hit roll. On success appends one status from `pool` to the target.
/// Returns the status applied, if any.
pub fn maybe_apply_status(
    dice: &mut Dice,
    chance: f64,
    pool: &[String],
    target: &mut Combatant,
    mut log: impl FnMut(String),
) -> Option<String> {
    if pool.is_empty() || chance <= 0.0 {
        return None;
    }
    if dice.unit() >= chance.clamp(0.0, 1.0) {
        return None;
    }
    let status = pool[dice.index(pool.len())].clone();
    if target.add_status(&status) {
        log(format!("[STATUS][{}] is afflicted with {}", target.name, status));
        Some(status)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::CombatantKind;

    #[test]
    fn pools_follow_weapon_type() {
        assert_eq!(inferred_pool("Dagger"), vec!["bleed"]);
        assert_eq!(inferred_pool("mace"), vec!["stagger"]);
        assert_eq!(inferred_pool("staff").len(), 3);
        assert_eq!(inferred_pool("").len(), 5);
    }

    #[test]
    fn status_is_not_applied_twice() {
        let mut goblin = Combatant::new(CombatantKind::Enemy, "Goblin", 8);
        let pool = vec!["bleed".to_string()];
        let mut dice = Dice::from_scripted(vec![0.0]);
        let mut lines = Vec::new();
        assert_eq!(
            maybe_apply_status(&mut dice, 0.15, &pool, &mut goblin, |l| lines.push(l)),
            Some("bleed".to_string())
        );
        assert_eq!(maybe_apply_status(&mut dice, 0.15, &pool, &mut goblin, |l| lines.push(l)), None);
        assert_eq!(goblin.status(), ["bleed".to_string()]);
        assert_eq!(lines, vec!["[STATUS][Goblin] is afflicted with bleed"]);
    }

    #[test]
    fn missed_roll_changes_nothing() {
        let mut goblin = Combatant::new(CombatantKind::Enemy, "Goblin", 8);
        let pool = vec!["bleed".to_string()];
        let mut dice = Dice::from_scripted(vec![0.15]);
        assert_eq!(maybe_apply_status(&mut dice, 0.15, &pool, &mut goblin, |_| {}), None);
        assert!(goblin.status().is_empty());
    }
}
