use engine::content::builtin_catalog;
use engine::loot::{InlineTemplate, ItemStats};
use engine::{Catalog, Category, Element, LootReference, RarityTier, Resolver, Roller};
use proptest::prelude::*;

const DAGGER: &str = r#"
items:
  - id: dagger_c
    type: dagger
    damage_range: { physical: [4, 8] }
    rarity: common
"#;

#[test]
fn common_dagger_keeps_its_authored_range() {
    let catalog = Catalog::from_yaml_str(DAGGER).unwrap();
    let template = catalog.by_id("dagger_c")[0];
    let roller = Roller::new(&catalog, 42);

    for i in 0..25 {
        let item = roller.roll(template, 1, &format!("dagger|{}", i));
        assert_eq!(item.rarity, RarityTier::Common);
        assert_eq!(item.category, Category::Weapon);
        assert_eq!(item.name, "Common Dagger");
        assert_eq!(item.level, 1);
        assert!(item.enchants.is_empty());

        let ItemStats::Weapon { damage, .. } = &item.stats else {
            panic!("expected weapon stats, got {:?}", item.stats);
        };
        assert_eq!(damage.len(), 1);
        let phys = damage[&Element::Physical];
        assert!((4..=8).contains(&phys), "physical {} out of range", phys);

        let range = item.damage_range().unwrap();
        let total = f64::from(phys);
        assert_eq!(range.min, ((0.55 * total).round() as i32).max(1));
        assert_eq!(range.max, ((0.95 * total).round() as i32).max(range.min + 1));
        assert_eq!(item.value, phys * 10);
        assert!((0.9..=1.1).contains(&item.weight));
        assert_eq!(item.provenance.template_id, "dagger_c");
    }
}

#[test]
fn ids_look_like_catalog_ids() {
    let catalog = builtin_catalog().unwrap();
    let roller = Roller::new(&catalog, 3);
    let item = roller.roll(&catalog.items()[0], 2, "ids");
    assert_eq!(item.id.len(), 10);
    assert!(item.id.starts_with("IT"));
    assert!(item.id[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
}

#[test]
fn open_rarity_spreads_over_tiers() {
    let catalog = builtin_catalog().unwrap();
    let template = catalog.by_id("IT0000S002")[0];
    assert_eq!(template.rarity, None);
    let roller = Roller::new(&catalog, 11);
    let tiers: std::collections::BTreeSet<RarityTier> = (0..200)
        .map(|i| roller.roll(template, 1, &format!("militia|{}", i)).rarity)
        .collect();
    assert!(tiers.contains(&RarityTier::Common));
    assert!(tiers.len() > 1);
}

#[test]
fn mythic_draws_distinct_enchants() {
    let catalog = builtin_catalog().unwrap();
    let resolver = Resolver::new(&catalog, 5);
    let reference = LootReference::Inline(InlineTemplate {
        base: Some("IT0000S001".into()),
        rarity: Some(RarityTier::Mythic),
        ..InlineTemplate::default()
    });
    let template = resolver.resolve(&reference, "mythic").unwrap();
    let roller = Roller::new(&catalog, 5);
    for i in 0..20 {
        let item = roller.roll(&template, 10, &format!("mythic|{}", i));
        assert_eq!(item.rarity, RarityTier::Mythic);
        assert_eq!(item.enchants.len(), 2);
        assert_ne!(item.enchants[0], item.enchants[1]);
        for id in &item.enchants {
            assert!(["flaming", "keen", "venomous"].contains(&id.as_str()), "{} is not a weapon enchant", id);
        }
    }
}

#[test]
fn gear_rolls_carry_slot_and_defense() {
    let catalog = builtin_catalog().unwrap();
    let roller = Roller::new(&catalog, 8);
    let boots = roller.roll(catalog.by_id("IT0000A003")[0], 4, "boots");
    match &boots.stats {
        ItemStats::Gear { slot, defense } => {
            assert_eq!(slot, "feet");
            assert!(defense[&Element::Ice] >= 3);
            assert!(defense.contains_key(&Element::Physical));
        }
        other => panic!("expected gear, got {:?}", other),
    }
    assert_eq!(boots.rarity, RarityTier::Uncommon);
    assert_eq!(boots.name, "Frostward Boots");
}

#[test]
fn plain_items_scale_value_by_rarity() {
    let catalog = builtin_catalog().unwrap();
    let roller = Roller::new(&catalog, 8);
    for i in 0..10 {
        let ore = roller.roll(catalog.by_id("IT0000M001")[0], 1, &format!("ore|{}", i));
        assert_eq!(ore.stats, ItemStats::Plain);
        let rule = catalog.rarity().rule(ore.rarity);
        assert_eq!(ore.value, (3.0 * rule.value).round() as u32);
    }
}

#[test]
fn element_hints_feed_the_status_pool() {
    let catalog = builtin_catalog().unwrap();
    let roller = Roller::new(&catalog, 1);
    let shiv = roller.roll(catalog.by_id("IT0000D001")[0], 1, "shiv");
    assert_eq!(shiv.status_pool(), vec!["bleed".to_string()]);

    let resolver = Resolver::new(&catalog, 1);
    let wand = resolver
        .resolve(
            &LootReference::Inline(InlineTemplate {
                base: Some("IT0000W001".into()),
                rarity: Some(RarityTier::Common),
                ..InlineTemplate::default()
            }),
            "wand",
        )
        .unwrap();
    let wand = roller.roll(&wand, 1, "wand");
    assert_eq!(wand.dominant_element(), Element::Lightning);
    assert_eq!(wand.status_pool(), vec!["shock".to_string()]);
    assert_eq!(wand.status_chance(), Some(0.3));
}

proptest! {
    #[test]
    fn same_context_rolls_same_item(seed in any::<u64>(), level in 0u32..40, ctx in "[a-z|0-9]{1,12}") {
        let catalog = builtin_catalog().unwrap();
        let roller = Roller::new(&catalog, seed);
        for template in catalog.items() {
            prop_assert_eq!(roller.roll(template, level, &ctx), roller.roll(template, level, &ctx));
        }
    }

    #[test]
    fn rolled_numbers_stay_sane(seed in any::<u64>(), level in 0u32..60) {
        let catalog = builtin_catalog().unwrap();
        let roller = Roller::new(&catalog, seed);
        for (i, template) in catalog.items().iter().enumerate() {
            let item = roller.roll(template, level, &format!("sane|{}", i));
            prop_assert!(item.weight >= 0.0 && item.weight.is_finite());
            if let Some(range) = item.damage_range() {
                prop_assert!(range.min >= 1);
                prop_assert!(range.max > range.min);
            }
            prop_assert_eq!(item.level, level);
        }
    }
}
