use crate::catalog::Element;
use crate::combatant::Combatant;

/// Flat reduction from equipped gear against one hit of `element`.
///
/// Matching-element defense counts in full steps of 8; physical defense adds a
/// step per 16 points against non-physical hits.
pub fn mitigation(defender: &Combatant, element: Element) -> i32 {
    let matching = defender.gear_defense(element) as i32 / 8;
    let physical = if element == Element::Physical {
        0
    } else {
        defender.gear_defense(Element::Physical) as i32 / 16
    };
    matching + physical
}

/// Never lets a hit fall below 1.
pub fn mitigate(raw: i32, reduction: i32) -> i32 {
    (raw - reduction.max(0)).max(1)
}

pub fn mitigated_damage(raw: i32, defender: &Combatant, element: Element) -> i32 {
    mitigate(raw, mitigation(defender, element))
}

/// Subtract `dmg` from a tracked HP value. Returns true if this hit dropped it to 0.
pub fn apply_damage(name: &str, hp: &mut i32, max_hp: i32, dmg: i32, mut log: impl FnMut(String)) -> bool {
    if *hp <= 0 {
        return false;
    }
    let before = *hp;
    *hp = (*hp - dmg).clamp(0, max_hp);
    log(format!("[HP][{}] HP: {}/{}", name, *hp, max_hp));
    before > 0 && *hp == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_holds_for_huge_reduction() {
        assert_eq!(mitigate(3, 50), 1);
        assert_eq!(mitigate(9, 2), 7);
        assert_eq!(mitigate(4, -5), 4);
    }

    #[test]
    fn damage_reports_drop_to_zero_once() {
        let mut hp = 5;
        let mut lines = Vec::new();
        assert!(apply_damage("Goblin", &mut hp, 8, 7, |l| lines.push(l)));
        assert_eq!(hp, 0);
        assert!(!apply_damage("Goblin", &mut hp, 8, 2, |l| lines.push(l)));
        assert_eq!(lines, vec!["[HP][Goblin] HP: 0/8"]);
    }
}
