use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::Dice;
use crate::catalog::{
    AliasEntry, Catalog, Category, Element, Envelope, ItemTemplate, TemplateKind, normalize_slot,
};
use crate::rarity::RarityTier;

/// Abstract loot pointer as authored on maps and enemies.
///
/// Data files may also spell a reference as a short string: `table:goblin`,
/// `alias:boss_drop`, `id:sword_01` or a bare id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "ReferenceRepr")]
pub enum LootReference {
    DirectId {
        id: String,
        #[serde(default)]
        hint: Option<SlotHint>,
    },
    Table(String),
    Alias(String),
    Inline(InlineTemplate),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReferenceRepr {
    Text(String),
    Tagged(TaggedReference),
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum TaggedReference {
    DirectId {
        id: String,
        #[serde(default)]
        hint: Option<SlotHint>,
    },
    Table(String),
    Alias(String),
    Inline(InlineTemplate),
}

impl From<ReferenceRepr> for LootReference {
    fn from(repr: ReferenceRepr) -> Self {
        match repr {
            ReferenceRepr::Text(text) => LootReference::parse(&text),
            ReferenceRepr::Tagged(TaggedReference::DirectId { id, hint }) => LootReference::DirectId { id, hint },
            ReferenceRepr::Tagged(TaggedReference::Table(name)) => LootReference::Table(name),
            ReferenceRepr::Tagged(TaggedReference::Alias(name)) => LootReference::Alias(name),
            ReferenceRepr::Tagged(TaggedReference::Inline(t)) => LootReference::Inline(t),
        }
    }
}

impl LootReference {
    /// Parses the short string form. Anything without a known prefix is an id.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.split_once(':') {
            Some(("table", name)) => LootReference::table(name.trim()),
            Some(("alias", name)) => LootReference::alias(name.trim()),
            Some(("id", id)) => LootReference::id(id.trim()),
            _ => LootReference::id(text),
        }
    }

    pub fn id(id: impl Into<String>) -> Self {
        LootReference::DirectId { id: id.into(), hint: None }
    }

    pub fn table(name: impl Into<String>) -> Self {
        LootReference::Table(name.into())
    }

    pub fn alias(name: impl Into<String>) -> Self {
        LootReference::Alias(name.into())
    }

    /// Short stable text used when building context seeds.
    pub fn signature(&self) -> String {
        match self {
            LootReference::DirectId { id, .. } => format!("id:{}", id),
            LootReference::Table(name) => format!("table:{}", name),
            LootReference::Alias(name) => format!("alias:{}", name),
            LootReference::Inline(t) => format!(
                "inline:{}",
                t.base.as_deref().or(t.item_type.as_deref()).unwrap_or("?")
            ),
        }
    }
}

/// Intended destination, used to disambiguate ids shared by several templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotHint {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
}

impl SlotHint {
    fn score(&self, t: &ItemTemplate) -> u32 {
        let mut score = 0;
        if self.category == Some(t.category) {
            score += 2;
        }
        if let (Some(want), Some(have)) = (self.slot.as_deref(), t.slot()) {
            if normalize_slot(want) == have {
                score += 2;
            }
        }
        if self.item_type.as_deref() == Some(t.item_type.as_str()) {
            score += 1;
        }
        score
    }
}

/// A template spelled out in place, optionally layered over a catalog id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineTemplate {
    pub base: Option<String>,
    pub name: Option<String>,
    pub category: Option<Category>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub slot: Option<String>,
    pub rarity: Option<RarityTier>,
    pub damage: IndexMap<Element, Envelope>,
    pub defense: IndexMap<Element, Envelope>,
    pub bonus: IndexMap<String, i32>,
    pub tags: Vec<String>,
    pub weight: Option<f64>,
    pub value: Option<u32>,
    pub status_chance: Option<f64>,
    pub status: Vec<String>,
}

impl InlineTemplate {
    fn apply_to(&self, mut t: ItemTemplate) -> ItemTemplate {
        if let Some(name) = &self.name {
            t.name = Some(name.clone());
        }
        if let Some(r) = self.rarity {
            t.rarity = Some(r);
        }
        t.bonus.extend(self.bonus.iter().map(|(k, v)| (k.to_lowercase(), *v)));
        t.tags.extend(self.tags.iter().cloned());
        if let Some(w) = self.weight {
            t.weight = w.max(0.0);
        }
        if let Some(v) = self.value {
            t.base_value = v;
        }
        match &mut t.kind {
            TemplateKind::Weapon(w) => {
                w.damage.extend(self.damage.iter().map(|(k, v)| (*k, *v)));
                if let Some(c) = self.status_chance {
                    w.status_chance = Some(c.clamp(0.0, 1.0));
                }
                if !self.status.is_empty() {
                    w.statuses = self.status.clone();
                }
            }
            TemplateKind::Gear(g) => {
                g.defense.extend(self.defense.iter().map(|(k, v)| (*k, *v)));
                if let Some(slot) = &self.slot {
                    g.slot = normalize_slot(slot);
                }
            }
            TemplateKind::Plain => {}
        }
        t
    }
}

/// Turns loot references into base templates.
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    world_seed: u64,
    max_alias_depth: u32,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog, world_seed: u64) -> Self {
        Self { catalog, world_seed, max_alias_depth: 1 }
    }

    pub fn with_max_alias_depth(mut self, depth: u32) -> Self {
        self.max_alias_depth = depth;
        self
    }

    /// `None` means nothing dropped; unresolvable references are never an error.
    pub fn resolve(&self, reference: &LootReference, context_seed: &str) -> Option<ItemTemplate> {
        let mut dice = Dice::for_context(self.world_seed, &format!("{}#resolve", context_seed));
        let out = self.resolve_at(reference, &mut dice, 0);
        match &out {
            Some(t) => debug!(reference = %reference.signature(), template = %t.id, "resolved loot"),
            None => info!(reference = %reference.signature(), "loot reference resolved to nothing"),
        }
        out
    }

    fn resolve_at(&self, reference: &LootReference, dice: &mut Dice, depth: u32) -> Option<ItemTemplate> {
        match reference {
            LootReference::DirectId { id, hint } => self.direct(id, hint.as_ref()),
            LootReference::Table(name) => self.table(name, dice),
            LootReference::Alias(name) => {
                let entry = self.catalog.alias(name)?;
                self.alias(entry, dice, depth)
            }
            LootReference::Inline(inline) => {
                let base = match &inline.base {
                    Some(id) => {
                        let hint = SlotHint {
                            category: inline.category,
                            slot: inline.slot.clone(),
                            item_type: inline.item_type.clone(),
                        };
                        self.direct(id, Some(&hint))?
                    }
                    None => {
                        let category = inline.category?;
                        let item_type = inline
                            .item_type
                            .clone()
                            .unwrap_or_else(|| format!("{:?}", category).to_lowercase());
                        let mut t = ItemTemplate::blank("inline", category, &item_type);
                        if let (TemplateKind::Gear(g), Some(slot)) = (&mut t.kind, &inline.slot) {
                            g.slot = normalize_slot(slot);
                        }
                        t
                    }
                };
                Some(inline.apply_to(base))
            }
        }
    }

    fn direct(&self, id: &str, hint: Option<&SlotHint>) -> Option<ItemTemplate> {
        let candidates = self.catalog.by_id(id);
        let first = *candidates.first()?;
        let Some(hint) = hint else {
            return Some(first.clone());
        };
        let mut best = first;
        let mut best_score = hint.score(first);
        for t in candidates.iter().skip(1) {
            let s = hint.score(t);
            if s > best_score {
                best = *t;
                best_score = s;
            }
        }
        Some(best.clone())
    }

    fn table(&self, name: &str, dice: &mut Dice) -> Option<ItemTemplate> {
        let table = self.catalog.drop_table(name)?;
        let weapon_type = dice.weighted(table.weapons.iter().map(|(k, w)| (k, *w)))?;
        let mut template = match self.catalog.base_for_type(weapon_type) {
            Some(base) => base.clone(),
            None => {
                warn!(table = name, weapon_type = %weapon_type, "no archetype for weapon type; picking any weapon");
                self.random_of(Category::Weapon, None, dice)?
            }
        };
        if template.rarity.is_none() {
            template.rarity_bias = table.rarity_bias.clone();
        }
        Some(template)
    }

    fn alias(&self, entry: &AliasEntry, dice: &mut Dice, depth: u32) -> Option<ItemTemplate> {
        let mut template = if let Some(next) = &entry.alias {
            if depth >= self.max_alias_depth {
                info!(alias = %next, depth, "alias nesting too deep");
                return None;
            }
            let next = self.catalog.alias(next)?;
            self.alias(next, dice, depth + 1)?
        } else if let Some(id) = &entry.id {
            let hint = SlotHint { category: entry.category, ..SlotHint::default() };
            self.direct(id, Some(&hint))?
        } else if let Some(table) = &entry.table {
            self.table(table, dice)?
        } else if let Some(category) = entry.category {
            self.random_of(category, entry.rarity, dice)?
        } else {
            return None;
        };
        if let Some(r) = entry.rarity {
            template.rarity = Some(r);
        }
        Some(template)
    }

    fn random_of(&self, category: Category, rarity: Option<RarityTier>, dice: &mut Dice) -> Option<ItemTemplate> {
        let pool = self.catalog.of_category(category);
        let preferred: Vec<&ItemTemplate> = match rarity {
            Some(r) => pool.iter().copied().filter(|t| t.rarity == Some(r)).collect(),
            None => Vec::new(),
        };
        let pool = if preferred.is_empty() { pool } else { preferred };
        if pool.is_empty() {
            return None;
        }
        Some(pool[dice.index(pool.len())].clone())
    }
}
