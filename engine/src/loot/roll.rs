use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Dice;
use crate::catalog::{
    Catalog, Category, EffectTarget, Element, EnchantDef, Envelope, ItemTemplate, TemplateKind,
};
use crate::combatant::DamageRange;
use crate::rarity::RarityTier;

/// Physical damage used when a weapon template carries no ranges at all.
const DEFAULT_FLAT_DAMAGE: f64 = 5.0;
/// Physical defense used when a gear template carries no ranges at all.
const DEFAULT_FLAT_DEFENSE: f64 = 2.0;
const LEVEL_SCALING: f64 = 0.06;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ItemStats {
    Weapon {
        damage: IndexMap<Element, u32>,
        status_chance: Option<f64>,
        statuses: Vec<String>,
        status_hints: Vec<String>,
    },
    Gear {
        slot: String,
        defense: IndexMap<Element, u32>,
    },
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub template_id: String,
    pub seed: String,
}

/// A concrete, fully statted item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolledItem {
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(rename = "type")]
    pub item_type: String,
    pub rarity: RarityTier,
    pub level: u32,
    pub stats: ItemStats,
    pub bonus: IndexMap<String, u32>,
    pub enchants: Vec<String>,
    pub value: u32,
    pub weight: f64,
    pub provenance: Provenance,
}

impl RolledItem {
    pub fn total_damage(&self) -> u32 {
        match &self.stats {
            ItemStats::Weapon { damage, .. } => damage.values().sum(),
            _ => 0,
        }
    }

    /// Combat range derived from summed elemental damage; `None` for non-weapons.
    pub fn damage_range(&self) -> Option<DamageRange> {
        let ItemStats::Weapon { .. } = &self.stats else {
            return None;
        };
        let total = f64::from(self.total_damage());
        let min = ((0.55 * total).round() as i32).max(1);
        let max = ((0.95 * total).round() as i32).max(min + 1);
        Some(DamageRange { min, max })
    }

    pub fn defense(&self, element: Element) -> u32 {
        match &self.stats {
            ItemStats::Gear { defense, .. } => defense.get(&element).copied().unwrap_or(0),
            _ => 0,
        }
    }

    /// Largest damage entry; physical on ties with physical or when there is none.
    pub fn dominant_element(&self) -> Element {
        match &self.stats {
            ItemStats::Weapon { damage, .. } => {
                let mut best = (Element::Physical, damage.get(&Element::Physical).copied().unwrap_or(0));
                for (el, v) in damage {
                    if *v > best.1 {
                        best = (*el, *v);
                    }
                }
                best.0
            }
            _ => Element::Physical,
        }
    }

    /// Authored statuses, else the element-derived hints.
    pub fn status_pool(&self) -> Vec<String> {
        match &self.stats {
            ItemStats::Weapon { statuses, .. } if !statuses.is_empty() => statuses.clone(),
            ItemStats::Weapon { status_hints, .. } => status_hints.clone(),
            _ => Vec::new(),
        }
    }

    /// Authored on-hit status chance. Zero counts as unset, so the engine default applies.
    pub fn status_chance(&self) -> Option<f64> {
        match &self.stats {
            ItemStats::Weapon { status_chance, .. } => status_chance.filter(|c| *c > 0.0),
            _ => None,
        }
    }
}

/// Produces finalized items from templates, deterministically per context seed.
pub struct Roller<'a> {
    catalog: &'a Catalog,
    world_seed: u64,
}

impl<'a> Roller<'a> {
    pub fn new(catalog: &'a Catalog, world_seed: u64) -> Self {
        Self { catalog, world_seed }
    }

    pub fn roll(&self, template: &ItemTemplate, level: u32, context_seed: &str) -> RolledItem {
        let mut dice = Dice::for_context(self.world_seed, context_seed);
        let table = self.catalog.rarity();

        let rarity = match template.rarity {
            Some(r) => r,
            None => {
                let weights = table.biased_weights(&template.rarity_bias);
                dice.weighted(weights.iter().map(|(t, w)| (t, *w)))
                    .copied()
                    .unwrap_or(RarityTier::Common)
            }
        };
        let rule = table.rule(rarity);
        let scale = (1.0 + LEVEL_SCALING * f64::from(level)) * rule.budget;

        let mut bonus: IndexMap<String, i64> =
            template.bonus.iter().map(|(k, v)| (k.clone(), i64::from(*v))).collect();

        let enchant_count = dice.range(rule.affixes[0] as i32, rule.affixes[1] as i32).max(0) as usize;
        let picks = draw_enchants(&mut dice, self.catalog.enchants_for(template), enchant_count);
        let enchants: Vec<String> = picks.iter().map(|e| e.id.clone()).collect();

        let (stats, value) = match &template.kind {
            TemplateKind::Weapon(spec) => {
                let mut damage = sample_scaled(&mut dice, &spec.damage, spec.flat, DEFAULT_FLAT_DAMAGE, scale);
                apply_enchants(&mut dice, &picks, level, &mut damage, &mut bonus, |t| match t {
                    EffectTarget::Damage(el) => Some(*el),
                    _ => None,
                });
                let damage = to_unsigned(damage);
                let status_hints = damage
                    .iter()
                    .filter(|(_, v)| **v > 0)
                    .filter_map(|(el, _)| el.status_hint())
                    .map(str::to_string)
                    .collect();
                let attack = bonus.get("attack").copied().unwrap_or(0).max(0) as f64;
                let total: u32 = damage.values().sum();
                let value = (f64::from(total) * 10.0 + attack * 25.0) * rule.value;
                let stats = ItemStats::Weapon {
                    damage,
                    status_chance: spec.status_chance,
                    statuses: spec.statuses.clone(),
                    status_hints,
                };
                (stats, value)
            }
            TemplateKind::Gear(spec) => {
                let mut defense = sample_scaled(&mut dice, &spec.defense, spec.flat, DEFAULT_FLAT_DEFENSE, scale);
                apply_enchants(&mut dice, &picks, level, &mut defense, &mut bonus, |t| match t {
                    EffectTarget::Defense(el) => Some(*el),
                    _ => None,
                });
                let defense = to_unsigned(defense);
                let positive: i64 = bonus.values().filter(|v| **v > 0).sum();
                let total: u32 = defense.values().sum();
                let value = (f64::from(total) * 8.0 + positive as f64 * 20.0) * rule.value;
                (ItemStats::Gear { slot: spec.slot.clone(), defense }, value)
            }
            TemplateKind::Plain => {
                let mut unused = IndexMap::new();
                apply_enchants(&mut dice, &picks, level, &mut unused, &mut bonus, |_| None);
                (ItemStats::Plain, f64::from(template.base_value) * rule.value)
            }
        };

        let jitter = 0.9 + 0.2 * dice.unit();
        let weight = ((template.weight * jitter).max(0.0) * 100.0).round() / 100.0;
        let id = format!("IT{:08X}", dice.next_u32());

        let name = template
            .name
            .clone()
            .unwrap_or_else(|| format!("{} {}", rarity.title(), title_case(&template.item_type)));

        let bonus = bonus
            .into_iter()
            .map(|(k, v)| (k, v.clamp(0, i64::from(u32::MAX)) as u32))
            .collect();

        debug!(template = %template.id, ?rarity, enchants = enchants.len(), context_seed, "rolled item");
        RolledItem {
            id,
            name,
            category: template.category,
            item_type: template.item_type.clone(),
            rarity,
            level,
            stats,
            bonus,
            enchants,
            value: value.round().clamp(0.0, f64::from(u32::MAX)) as u32,
            weight,
            provenance: Provenance {
                template_id: template.id.clone(),
                seed: context_seed.to_string(),
            },
        }
    }
}

fn sample_scaled(
    dice: &mut Dice,
    ranges: &IndexMap<Element, Envelope>,
    flat: Option<Envelope>,
    fallback: f64,
    scale: f64,
) -> IndexMap<Element, i64> {
    let mut sampled: IndexMap<Element, f64> = ranges
        .iter()
        .map(|(el, env)| (*el, f64::from(dice.range(env.min, env.max))))
        .collect();
    if sampled.is_empty() {
        let avg = flat.map(Envelope::average).unwrap_or(fallback);
        sampled.insert(Element::Physical, avg.round());
    }
    sampled
        .into_iter()
        .map(|(el, v)| (el, (v * scale).round().max(0.0) as i64))
        .collect()
}

/// Weighted draw without replacement.
fn draw_enchants<'c>(dice: &mut Dice, mut pool: Vec<&'c EnchantDef>, count: usize) -> Vec<&'c EnchantDef> {
    let mut chosen = Vec::new();
    while chosen.len() < count && !pool.is_empty() {
        let idx = {
            let indexed: Vec<usize> = (0..pool.len()).collect();
            match dice.weighted(indexed.iter().map(|i| (i, pool[*i].weight))) {
                Some(i) => *i,
                None => break,
            }
        };
        chosen.push(pool.remove(idx));
    }
    chosen
}

fn apply_enchants(
    dice: &mut Dice,
    picks: &[&EnchantDef],
    level: u32,
    primary: &mut IndexMap<Element, i64>,
    bonus: &mut IndexMap<String, i64>,
    element_of: impl Fn(&EffectTarget) -> Option<Element>,
) {
    for enchant in picks {
        for effect in &enchant.effects {
            let flat = dice.range(effect.flat_min, effect.flat_max.unwrap_or(effect.flat_min));
            let add = (f64::from(flat) + effect.per_level * f64::from(level)).round() as i64;
            if let Some(el) = element_of(&effect.target) {
                *primary.entry(el).or_insert(0) += add;
            } else if let EffectTarget::Bonus(key) = &effect.target {
                *bonus.entry(key.to_lowercase()).or_insert(0) += add;
            }
        }
    }
}

fn to_unsigned(map: IndexMap<Element, i64>) -> IndexMap<Element, u32> {
    map.into_iter()
        .map(|(el, v)| (el, v.clamp(0, i64::from(u32::MAX)) as u32))
        .collect()
}

fn title_case(s: &str) -> String {
    s.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
