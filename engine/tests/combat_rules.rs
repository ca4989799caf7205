use engine::checks::{bribe_percent, flee_percent, roll_check, talk_percent};
use engine::combat::actions::land_hit;
use engine::combatant::InventoryItem;
use engine::content::builtin_catalog;
use engine::mitigation::{mitigate, mitigated_damage, mitigation};
use engine::progression::award_xp;
use engine::{Category, Combatant, CombatantKind, Dice, Element, EngineConfig, Party, Roller};
use proptest::prelude::*;

fn noop_log(_: String) {}

fn armoured(name: &str) -> Combatant {
    let catalog = builtin_catalog().unwrap();
    let roller = Roller::new(&catalog, 3);
    let mut c = Combatant::new(CombatantKind::Enemy, name, 30);
    // Padded Jerkin: physical 4..=7 plus a flat fire point, scaled up at level 20
    c.equip_gear(None, roller.roll(catalog.by_id("IT0000A002")[0], 20, "jerkin"));
    c
}

#[test]
fn gear_defense_reduces_matching_hits() {
    let knight = armoured("Knight");
    let phys = knight.gear_defense(Element::Physical) as i32;
    assert!(phys >= 8, "expected at least one step of physical defense, got {}", phys);
    assert_eq!(mitigation(&knight, Element::Physical), phys / 8);
    let fire = knight.gear_defense(Element::Fire) as i32;
    assert_eq!(mitigation(&knight, Element::Fire), fire / 8 + phys / 16);
    assert_eq!(mitigated_damage(1, &knight, Element::Physical), 1);
}

#[test]
fn unarmoured_defender_takes_raw_damage() {
    let goblin = Combatant::new(CombatantKind::Enemy, "Goblin", 8);
    let mut hp = 8;
    let mut lines = Vec::new();
    let hit = land_hit("Hero", 5, Element::Fire, &goblin, &mut hp, 8, |l| lines.push(l));
    assert_eq!(hit.dealt, 5);
    assert!(!hit.killed);
    assert_eq!(hp, 3);
    assert_eq!(lines, vec!["[HIT][Hero] hits Goblin for 5 (Fire)", "[HP][Goblin] HP: 3/8"]);
}

#[test]
fn check_line_reports_draw_and_threshold() {
    let mut dice = Dice::from_scripted(vec![0.5]);
    let mut line = String::new();
    let res = roll_check(&mut dice, 60, "Hero bribes Bandit", |l| line = l);
    assert!(res.passed);
    insta::assert_snapshot!(line, @"[CHECK] Hero bribes Bandit draw=0.500 vs 60% → SUCCESS");
}

#[test]
fn percentages_are_clamped() {
    assert_eq!(flee_percent(10, 4), 83);
    assert_eq!(flee_percent(-50, 50), 10);
    assert_eq!(talk_percent(-20, 0), 80);
    assert_eq!(talk_percent(6, 1), 45);
    assert_eq!(bribe_percent(8), 80);
}

#[test]
fn xp_carries_over_several_levels() {
    let cfg = EngineConfig::default();
    let mut party = Party::new(Combatant::new(CombatantKind::Player, "Hero", 20));
    party.class = "warrior".into();
    let gained = award_xp(&mut party, 250, &cfg, noop_log);
    assert_eq!(gained, 2);
    assert_eq!(party.player.level, 3);
    assert_eq!(party.xp, 250);
    // warrior: +2 vitality per level from 4
    assert_eq!(party.player.attributes.vitality, 8);
    assert_eq!(party.player.max_hp(), 40);
    assert_eq!(party.player.hp(), 40);
    assert_eq!(party.player.attack.min, 3);
    assert_eq!(party.player.attack.max, 7);

    assert_eq!(award_xp(&mut party, 0, &cfg, noop_log), 0);
    assert_eq!(award_xp(&mut party, 49, &cfg, noop_log), 0);
    assert_eq!(award_xp(&mut party, 1, &cfg, noop_log), 1);
}

#[test]
fn bribe_goods_skip_equipment() {
    let mut party = Party::new(Combatant::new(CombatantKind::Player, "Hero", 20));
    party.inventory = vec![
        InventoryItem { id: "w".into(), name: "Sword".into(), category: Category::Weapon },
        InventoryItem { id: "o".into(), name: "Iron Ore".into(), category: Category::Material },
    ];
    assert_eq!(party.take_bribe_goods().map(|i| i.name), Some("Iron Ore".to_string()));
    assert_eq!(party.take_bribe_goods(), None);
    assert_eq!(party.inventory.len(), 1);
}

proptest! {
    #[test]
    fn hits_never_fall_below_one(raw in -100i32..200, reduction in -50i32..500) {
        prop_assert!(mitigate(raw, reduction) >= 1);
    }

    #[test]
    fn tracked_hp_stays_in_bounds(start in 0i32..40, dmg in 1i32..60) {
        let goblin = Combatant::new(CombatantKind::Enemy, "Goblin", 40);
        let mut hp = start;
        let hit = land_hit("Hero", dmg, Element::Physical, &goblin, &mut hp, 40, noop_log);
        prop_assert!((0..=40).contains(&hp));
        prop_assert_eq!(hit.killed, start > 0 && hp == 0);
    }
}
