use engine::api::{
    load_catalog, normalize_catalog_text, roll_loot, simulate_encounter, simulate_encounter_many, Approach,
    EncounterConfig, LootRequest,
};
use engine::combat::{Outcome, PlayerAction};
use engine::{Category, LootReference};

fn goblins(seed: u64) -> EncounterConfig {
    EncounterConfig {
        encounter_id: Some("goblin_ambush".into()),
        seed,
        ..EncounterConfig::default()
    }
}

#[test]
fn encounter_with_builtins_runs() {
    let res = simulate_encounter(goblins(7)).unwrap();
    assert_eq!(res.encounter, "Goblin Ambush");
    assert!(res.decisions > 0 && res.decisions <= 200);
    assert!(res.outcome.is_some());
    assert!(res.log[0].starts_with("[TURN] order:"));
    if res.outcome == Some(Outcome::Victory) {
        assert!(res.survivors.is_empty());
        // scout drops one item, brute two; all references resolve
        assert_eq!(res.loot.len(), 3);
        assert!(res.log.iter().any(|l| l.starts_with("[LOOT]")));
    }
}

#[test]
fn encounter_is_reproducible_per_seed() {
    let a = simulate_encounter(goblins(99)).unwrap();
    let b = simulate_encounter(goblins(99)).unwrap();
    assert_eq!(a.log, b.log);
    assert_eq!(a.outcome, b.outcome);
    assert_eq!(a.loot, b.loot);
}

#[test]
fn peaceful_script_never_attacks() {
    let cfg = EncounterConfig {
        encounter_id: Some("bandit_toll".into()),
        seed: 3,
        actions: vec![PlayerAction::Talk, PlayerAction::Bribe],
        ..EncounterConfig::default()
    };
    let res = simulate_encounter(cfg).unwrap();
    assert!(!res.log.iter().any(|l| l.starts_with("[HIT][Hero]")));
    match res.outcome {
        Some(Outcome::TalkedDown) | Some(Outcome::Bribed) => {
            assert_eq!(res.survivors, vec!["Bandit Chief".to_string()]);
            assert!(res.loot.is_empty());
        }
        Some(Outcome::Defeat) | None => {}
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn encounter_many_summary_makes_sense() {
    let stats = simulate_encounter_many(goblins(1), 20).unwrap();
    assert_eq!(stats.samples, 20);
    let resolved: u32 = stats.outcomes.values().sum();
    assert_eq!(resolved + stats.unresolved, 20);
    assert!(stats.avg_decisions > 0.0);
}

#[test]
fn unknown_encounter_is_an_error() {
    let cfg = EncounterConfig { encounter_id: Some("dragon_lair".into()), ..EncounterConfig::default() };
    assert!(simulate_encounter(cfg).is_err());
}

#[test]
fn roll_loot_from_table() {
    let req = LootRequest {
        catalog_id: None,
        catalog_path: None,
        reference: LootReference::table("goblin"),
        level: 3,
        seed: 42,
        num: 5,
    };
    let items = roll_loot(req.clone()).unwrap();
    assert_eq!(items.len(), 5);
    for item in &items {
        assert_eq!(item.category, Category::Weapon);
        assert!(["dagger", "spear", "mace"].contains(&item.item_type.as_str()));
        assert_eq!(item.level, 3);
    }
    assert_eq!(roll_loot(req).unwrap(), items);
}

#[test]
fn unresolvable_reference_rolls_nothing() {
    let req = LootRequest {
        catalog_id: None,
        catalog_path: None,
        reference: LootReference::alias("loop_a"),
        level: 1,
        seed: 1,
        num: 3,
    };
    assert!(roll_loot(req).unwrap().is_empty());
}

#[test]
fn unknown_builtin_catalog_is_an_error() {
    assert!(load_catalog(Some("nope"), None).is_err());
}

#[test]
fn catalog_file_is_read_by_extension() {
    let path = std::env::temp_dir().join(format!("rpgen-catalog-{}.json", std::process::id()));
    std::fs::write(
        &path,
        "\u{feff}{\"items\": [{\"id\": \"F1\", \"type\": \"trinket\", \"name\": \"Feather\"}]}",
    )
    .unwrap();
    let catalog = load_catalog(None, path.to_str()).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(catalog.by_id("F1")[0].name.as_deref(), Some("Feather"));
}

#[test]
fn normalize_renders_canonical_fields() {
    let text = "\u{feff}items:\n  - { id: X1, Name: Shiv, Type: Weapon, SubType: Dagger, atk_min: 1, atk_max: 3 }\n";
    let out = normalize_catalog_text(text).unwrap();
    let items: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(items[0]["id"], "X1");
    assert_eq!(items[0]["name"], "Shiv");
    assert_eq!(items[0]["category"], "weapon");
    assert_eq!(items[0]["type"], "dagger");
}

fn temp_file(name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("rpgen-{}-{}", std::process::id(), name));
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn utf16_catalogs_load_for_rolling() {
    let yaml = "items:\n  - { id: U1, Name: Rusty Shiv, Type: Weapon, SubType: Dagger, atk_min: 1, atk_max: 3 }\n";
    let mut bytes = vec![0xFF, 0xFE];
    bytes.extend(yaml.encode_utf16().flat_map(u16::to_le_bytes));
    let path = temp_file("utf16.yaml", &bytes);

    let catalog = load_catalog(None, path.to_str());
    let items = roll_loot(LootRequest {
        catalog_id: None,
        catalog_path: path.to_str().map(String::from),
        reference: LootReference::parse("U1"),
        level: 1,
        seed: 9,
        num: 2,
    });
    std::fs::remove_file(&path).ok();

    assert_eq!(catalog.unwrap().by_id("U1")[0].name.as_deref(), Some("Rusty Shiv"));
    let items = items.unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.item_type == "dagger"));
}

#[test]
fn stalled_autoplay_reports_no_outcome() {
    let encounter = "\
name: Wolf Pack
party:
  player: { name: Hero, hp: 30, attributes: { dexterity: 4, insight: 0 } }
enemies:
  - { name: Wolf A, hp: 12, attributes: { dexterity: 40 } }
  - { name: Wolf B, hp: 12, attributes: { dexterity: 40 } }
  - { name: Wolf C, hp: 12, attributes: { dexterity: 40 } }
";
    let enc_path = temp_file("wolves.yaml", encounter.as_bytes());
    let cfg_path = temp_file("cap.yaml", b"autoplay_cap: 1\n");
    let res = simulate_encounter(EncounterConfig {
        encounter_path: enc_path.to_str().map(String::from),
        config_path: cfg_path.to_str().map(String::from),
        seed: 4,
        ..EncounterConfig::default()
    });
    std::fs::remove_file(&enc_path).ok();
    std::fs::remove_file(&cfg_path).ok();

    let res = res.unwrap();
    assert_eq!(res.outcome, None);
    assert_eq!(res.decisions, 0);
    assert_eq!(res.survivors.len(), 3);
    assert_eq!(res.log.last().map(String::as_str), Some("[TURN] auto-play stopped after 1 turns"));
}

fn bandits(seed: u64, approach: Approach) -> EncounterConfig {
    EncounterConfig {
        encounter_id: Some("bandit_toll".into()),
        seed,
        approach,
        ..EncounterConfig::default()
    }
}

#[test]
fn bypass_walks_around_unaware_enemies() {
    let res = simulate_encounter(bandits(1, Approach::Bypass)).unwrap();
    assert_eq!(res.outcome, Some(Outcome::Bypassed));
    assert_eq!(res.decisions, 0);
    assert_eq!(res.survivors, vec!["Bandit Chief".to_string()]);
    assert!(res.loot.is_empty());
    assert_eq!(res.log, ["[SNEAK][Hero] gives Bandit Toll a wide berth", "[END] bypassed"]);
}

#[test]
fn spotted_party_has_to_fight() {
    for approach in [Approach::Bypass, Approach::Sneak] {
        let cfg = EncounterConfig { approach, ..goblins(5) };
        let res = simulate_encounter(cfg).unwrap();
        assert_eq!(res.log[0], "[SNEAK][Hero] already spotted at Goblin Ambush; no way around");
        assert!(res.log[1].starts_with("[TURN] order:"));
        assert!(!matches!(res.outcome, Some(Outcome::Bypassed) | Some(Outcome::SnuckPast)));
    }
}

#[test]
fn sneaking_either_slips_past_or_starts_the_fight() {
    let mut slipped = 0;
    let mut caught = 0;
    for seed in 0..32 {
        let res = simulate_encounter(bandits(seed, Approach::Sneak)).unwrap();
        assert!(res.log[0].starts_with("[CHECK] Hero sneaks past Bandit Toll roll="));
        if res.outcome == Some(Outcome::SnuckPast) {
            slipped += 1;
            assert_eq!(res.decisions, 0);
            assert_eq!(res.survivors, vec!["Bandit Chief".to_string()]);
            assert_eq!(res.log[1], "[SNEAK][Hero] slips past unnoticed");
            assert_eq!(res.log.last().map(String::as_str), Some("[END] snuck_past"));
        } else {
            caught += 1;
            assert_eq!(res.log[1], "[SNEAK][Hero] stumbles and is spotted");
            assert!(res.log[2].starts_with("[TURN] order:"));
            assert!(res.decisions > 0);
        }
    }
    assert!(slipped > 0 && caught > 0, "slipped {} caught {}", slipped, caught);
    assert_eq!(
        simulate_encounter(bandits(7, Approach::Sneak)).unwrap().log,
        simulate_encounter(bandits(7, Approach::Sneak)).unwrap().log
    );
}

#[test]
fn approach_names_parse() {
    assert_eq!(Approach::parse(" Sneak "), Some(Approach::Sneak));
    assert_eq!(Approach::parse("avoid"), Some(Approach::Bypass));
    assert_eq!(Approach::parse("charge"), None);
}
