//! Static loot data: item templates, weapon archetypes, enchants, drop tables and aliases.
//!
//! Item documents are loosely keyed (`Name`, `display_name`, `atk_min`, ...). They are
//! normalized once here so nothing downstream has to guess field names.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CatalogError;
use crate::rarity::{RarityRule, RarityTable, RarityTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Physical,
    Fire,
    Ice,
    Lightning,
    Poison,
    Bleed,
    Holy,
    Shadow,
}

impl Element {
    pub fn parse(s: &str) -> Option<Element> {
        use Element::*;
        match s.trim().to_lowercase().as_str() {
            "physical" | "slashing" | "piercing" | "bludgeoning" => Some(Physical),
            "fire" | "burn" => Some(Fire),
            "ice" | "cold" | "frost" => Some(Ice),
            "lightning" | "shock" | "electric" => Some(Lightning),
            "poison" => Some(Poison),
            "bleed" => Some(Bleed),
            "holy" | "radiant" => Some(Holy),
            "shadow" | "necrotic" => Some(Shadow),
            _ => None,
        }
    }

    /// Status a weapon carrying this element tends to inflict.
    pub fn status_hint(self) -> Option<&'static str> {
        match self {
            Element::Fire => Some("burn"),
            Element::Ice => Some("freeze"),
            Element::Lightning => Some("shock"),
            Element::Bleed => Some("bleed"),
            Element::Poison => Some("poison"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Weapon,
    #[serde(alias = "armor")]
    Armour,
    Clothing,
    Accessory,
    Trinket,
    #[serde(alias = "materials")]
    Material,
    Quest,
    Consumable,
    #[serde(other)]
    Other,
}

impl Category {
    pub fn parse(s: &str) -> Category {
        match s.trim().to_lowercase().as_str() {
            "weapon" | "weapons" => Category::Weapon,
            // bare weapon types seen in place of a category
            "sword" | "shortsword" | "longsword" | "dagger" | "axe" | "halberd" | "spear" | "mace"
            | "club" | "greatclub" | "hammer" | "bow" | "crossbow" | "staff" | "wand" => Category::Weapon,
            "armour" | "armor" | "armours" | "armors" => Category::Armour,
            "helm" | "helmet" | "boots" | "gloves" | "gauntlets" | "shield" | "cuirass" | "greaves" => {
                Category::Armour
            }
            "ring" | "amulet" | "necklace" | "pendant" => Category::Accessory,
            "clothing" => Category::Clothing,
            "accessory" | "accessories" => Category::Accessory,
            "trinket" | "trinkets" => Category::Trinket,
            "material" | "materials" => Category::Material,
            "quest" | "quest_item" | "quest_items" => Category::Quest,
            "consumable" | "consumables" | "potion" => Category::Consumable,
            _ => Category::Other,
        }
    }

    pub fn is_gear(self) -> bool {
        matches!(self, Category::Armour | Category::Clothing | Category::Accessory)
    }

    /// Categories an enemy will accept as a bribe.
    pub fn is_bribe_goods(self) -> bool {
        matches!(self, Category::Trinket | Category::Material | Category::Accessory)
    }
}

/// Inclusive integer range as authored in data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EnvelopeRepr")]
pub struct Envelope {
    pub min: i32,
    pub max: i32,
}

impl Envelope {
    pub fn new(a: i32, b: i32) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    pub fn average(self) -> f64 {
        f64::from(self.min + self.max) / 2.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EnvelopeRepr {
    Map { min: i32, max: Option<i32> },
    Pair([i32; 2]),
    Flat(i32),
}

impl From<EnvelopeRepr> for Envelope {
    fn from(repr: EnvelopeRepr) -> Self {
        match repr {
            EnvelopeRepr::Map { min, max } => Envelope::new(min, max.unwrap_or(min)),
            EnvelopeRepr::Pair([a, b]) => Envelope::new(a, b),
            EnvelopeRepr::Flat(v) => Envelope::new(v, v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeaponSpec {
    pub damage: IndexMap<Element, Envelope>,
    /// Legacy flat `min`/`max` damage, used when no elemental ranges exist.
    pub flat: Option<Envelope>,
    pub status_chance: Option<f64>,
    pub statuses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GearSpec {
    pub slot: String,
    pub defense: IndexMap<Element, Envelope>,
    pub flat: Option<Envelope>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Weapon(WeaponSpec),
    Gear(GearSpec),
    Plain,
}

/// Immutable base description of an item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemTemplate {
    pub id: String,
    pub name: Option<String>,
    pub category: Category,
    #[serde(rename = "type")]
    pub item_type: String,
    pub desc: Option<String>,
    /// `None` lets the roller pick a tier from the rarity table.
    pub rarity: Option<RarityTier>,
    pub rarity_bias: IndexMap<RarityTier, f64>,
    pub bonus: IndexMap<String, i32>,
    pub tags: BTreeSet<String>,
    pub weight: f64,
    pub base_value: u32,
    pub kind: TemplateKind,
}

impl ItemTemplate {
    /// Builds an empty template of the right shape for `category`.
    pub fn blank(id: &str, category: Category, item_type: &str) -> Self {
        let kind = kind_for(category, item_type, None);
        Self {
            id: id.to_string(),
            name: None,
            category,
            item_type: item_type.to_string(),
            desc: None,
            rarity: None,
            rarity_bias: IndexMap::new(),
            bonus: IndexMap::new(),
            tags: BTreeSet::new(),
            weight: 1.0,
            base_value: 0,
            kind,
        }
    }

    pub fn slot(&self) -> Option<&str> {
        match &self.kind {
            TemplateKind::Gear(g) => Some(&g.slot),
            _ => None,
        }
    }
}

fn kind_for(category: Category, item_type: &str, slot: Option<&str>) -> TemplateKind {
    match category {
        Category::Weapon => TemplateKind::Weapon(WeaponSpec {
            damage: IndexMap::new(),
            flat: None,
            status_chance: None,
            statuses: Vec::new(),
        }),
        c if c.is_gear() => TemplateKind::Gear(GearSpec {
            slot: gear_slot(c, item_type, slot),
            defense: IndexMap::new(),
            flat: None,
        }),
        _ => TemplateKind::Plain,
    }
}

const KNOWN_SLOTS: &[&str] = &[
    "head", "body", "legs", "feet", "hands", "ring", "neck", "focus", "offhand", "back",
];

/// Maps the many authored slot spellings onto one canonical name.
pub fn normalize_slot(raw: &str) -> String {
    let key = raw.trim().to_lowercase().replace([' ', '-'], "_");
    let slot = match key.as_str() {
        "head" | "helm" | "helmet" | "hat" | "hood" | "cap" => "head",
        "body" | "chest" | "torso" | "armour" | "armor" | "robe" | "shirt" | "tunic" | "cuirass" => {
            "body"
        }
        "legs" | "pants" | "trousers" | "greaves" | "leggings" => "legs",
        "feet" | "boots" | "shoes" | "slippers" | "sandals" => "feet",
        "hands" | "gloves" | "gauntlets" | "bracers" => "hands",
        "ring" | "rings" | "finger" => "ring",
        "neck" | "amulet" | "necklace" | "pendant" => "neck",
        "focus" | "wand" | "staff" | "orb" | "tome" => "focus",
        "offhand" | "off_hand" | "shield" | "buckler" => "offhand",
        "back" | "cloak" | "cape" => "back",
        other => return other.to_string(),
    };
    slot.to_string()
}

fn gear_slot(category: Category, item_type: &str, slot: Option<&str>) -> String {
    if let Some(s) = slot {
        return normalize_slot(s);
    }
    let from_type = normalize_slot(item_type);
    if KNOWN_SLOTS.contains(&from_type.as_str()) {
        return from_type;
    }
    match category {
        Category::Accessory => "neck".to_string(),
        _ => "body".to_string(),
    }
}

/// What an enchant effect adds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTarget {
    Damage(Element),
    Defense(Element),
    Bonus(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnchantEffect {
    pub target: EffectTarget,
    #[serde(default)]
    pub flat_min: i32,
    #[serde(default)]
    pub flat_max: Option<i32>,
    #[serde(default)]
    pub per_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnchantDef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub applies_to: Vec<Category>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub tags_any: Vec<String>,
    #[serde(default = "unit_weight")]
    pub weight: f64,
    #[serde(default)]
    pub effects: Vec<EnchantEffect>,
}

impl EnchantDef {
    pub fn allows(&self, template: &ItemTemplate) -> bool {
        if !self.applies_to.is_empty() && !self.applies_to.contains(&template.category) {
            return false;
        }
        if !self.types.is_empty() && !self.types.iter().any(|t| t == &template.item_type) {
            return false;
        }
        if !self.tags_any.is_empty() && !self.tags_any.iter().any(|t| template.tags.contains(t)) {
            return false;
        }
        true
    }
}

fn unit_weight() -> f64 {
    1.0
}

/// Weighted weapon-type buckets for one drop source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropTable {
    pub weapons: IndexMap<String, f64>,
    #[serde(default)]
    pub rarity_bias: IndexMap<RarityTier, f64>,
}

/// Named shortcut to a table, an id, or a category pick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasEntry {
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub rarity: Option<RarityTier>,
}

/// Archetype a drop-table weapon type maps onto.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeaponBase {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub base_damage: IndexMap<Element, Envelope>,
    #[serde(default = "unit_weight")]
    pub weight: f64,
    #[serde(default)]
    pub value: u32,
    #[serde(default)]
    pub bonus: IndexMap<String, i32>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub status_chance: Option<f64>,
    #[serde(default)]
    pub status: Vec<String>,
}

impl WeaponBase {
    fn into_template(self) -> ItemTemplate {
        let mut t = ItemTemplate::blank(&format!("base:{}", self.item_type), Category::Weapon, &self.item_type);
        t.name = self.name;
        t.weight = self.weight.max(0.0);
        t.base_value = self.value;
        t.bonus = self.bonus;
        t.tags = self.tags;
        t.kind = TemplateKind::Weapon(WeaponSpec {
            damage: self.base_damage,
            flat: None,
            status_chance: self.status_chance.map(|c| c.clamp(0.0, 1.0)),
            statuses: self.status,
        });
        t
    }
}

/// One catalog file as authored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub rarity: IndexMap<RarityTier, RarityRule>,
    #[serde(default)]
    pub weapon_bases: Vec<WeaponBase>,
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub enchants: Vec<EnchantDef>,
    #[serde(default)]
    pub drop_tables: IndexMap<String, DropTable>,
    #[serde(default)]
    pub aliases: IndexMap<String, AliasEntry>,
}

/// Read-only loot data, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<ItemTemplate>,
    index: HashMap<String, Vec<usize>>,
    bases: IndexMap<String, ItemTemplate>,
    enchants: Vec<EnchantDef>,
    drop_tables: IndexMap<String, DropTable>,
    aliases: IndexMap<String, AliasEntry>,
    rarity: RarityTable,
}

impl Catalog {
    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_yaml::from_str(text)?;
        Self::from_document(doc)
    }

    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(text)?;
        Self::from_document(doc)
    }

    pub fn from_document(doc: CatalogDocument) -> Result<Self, CatalogError> {
        let rarity = if doc.rarity.is_empty() {
            RarityTable::default()
        } else {
            RarityTable::new(doc.rarity)?
        };

        let items = normalize_items(&doc.items)?;
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, item) in items.iter().enumerate() {
            index.entry(item.id.clone()).or_default().push(i);
        }

        let bases = doc
            .weapon_bases
            .into_iter()
            .map(|b| (b.item_type.clone(), b.into_template()))
            .collect();

        for (name, table) in &doc.drop_tables {
            if !table.weapons.values().any(|w| *w > 0.0) {
                return Err(CatalogError::EmptyDropTable(name.clone()));
            }
        }

        debug!(items = items.len(), enchants = doc.enchants.len(), "catalog built");
        Ok(Self {
            items,
            index,
            bases,
            enchants: doc.enchants,
            drop_tables: doc.drop_tables,
            aliases: doc.aliases,
            rarity,
        })
    }

    pub fn items(&self) -> &[ItemTemplate] {
        &self.items
    }

    /// Every template registered under `id`, in catalog order.
    pub fn by_id(&self, id: &str) -> Vec<&ItemTemplate> {
        self.index
            .get(id)
            .map(|idxs| idxs.iter().map(|&i| &self.items[i]).collect())
            .unwrap_or_default()
    }

    pub fn base_for_type(&self, item_type: &str) -> Option<&ItemTemplate> {
        self.bases.get(item_type)
    }

    pub fn of_category(&self, category: Category) -> Vec<&ItemTemplate> {
        self.items.iter().filter(|t| t.category == category).collect()
    }

    pub fn enchants_for(&self, template: &ItemTemplate) -> Vec<&EnchantDef> {
        self.enchants.iter().filter(|e| e.allows(template)).collect()
    }

    pub fn drop_table(&self, name: &str) -> Option<&DropTable> {
        self.drop_tables.get(name)
    }

    pub fn alias(&self, name: &str) -> Option<&AliasEntry> {
        self.aliases.get(name)
    }

    pub fn rarity(&self) -> &RarityTable {
        &self.rarity
    }
}

pub fn normalize_items(raw: &[Value]) -> Result<Vec<ItemTemplate>, CatalogError> {
    raw.iter()
        .enumerate()
        .map(|(i, v)| match v {
            Value::Object(map) => normalize_item(i, map),
            _ => Err(CatalogError::InvalidField { index: i, field: "item" }),
        })
        .collect()
}

fn coalesce<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null() && v.as_str() != Some(""))
}

fn text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    coalesce(map, keys).and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

fn float(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn envelope(v: &Value) -> Option<Envelope> {
    match v {
        Value::Object(m) => {
            let lo = m.get("min").and_then(int)?;
            let hi = m.get("max").and_then(int).unwrap_or(lo);
            Some(Envelope::new(clamp_i32(lo), clamp_i32(hi)))
        }
        Value::Array(a) if a.len() == 2 => {
            let lo = int(&a[0])?;
            let hi = int(&a[1])?;
            Some(Envelope::new(clamp_i32(lo), clamp_i32(hi)))
        }
        other => int(other).map(|n| Envelope::new(clamp_i32(n), clamp_i32(n))),
    }
}

fn element_map(v: Option<&Value>) -> IndexMap<Element, Envelope> {
    let mut out = IndexMap::new();
    match v {
        Some(Value::Object(m)) => {
            for (k, raw) in m {
                if let (Some(el), Some(env)) = (Element::parse(k), envelope(raw)) {
                    out.insert(el, env);
                }
            }
        }
        Some(other) => {
            if let Some(env) = envelope(other) {
                out.insert(Element::Physical, env);
            }
        }
        None => {}
    }
    out
}

fn string_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::String(s)) => vec![s.to_lowercase()],
        Some(Value::Array(a)) => a.iter().filter_map(|x| x.as_str()).map(str::to_lowercase).collect(),
        _ => Vec::new(),
    }
}

/// Normalize one loosely keyed item document.
pub fn normalize_item(index: usize, map: &Map<String, Value>) -> Result<ItemTemplate, CatalogError> {
    let id = text(map, &["id", "ID", "item_id"]).ok_or(CatalogError::MissingField { index, field: "id" })?;

    let category_raw = text(map, &["category", "type", "Type", "slot", "item_type"])
        .ok_or(CatalogError::MissingField { index, field: "category" })?
        .to_lowercase();
    let category = Category::parse(&category_raw);

    let item_type = text(map, &["subtype", "SubType", "weapon_type", "class", "category2"])
        .or_else(|| text(map, &["type", "Type"]).filter(|t| t.to_lowercase() != category_raw))
        .unwrap_or_else(|| category_raw.clone())
        .to_lowercase();

    let slot = text(map, &["equip_slot", "slot"]).filter(|s| s.to_lowercase() != category_raw);
    let mut template = ItemTemplate::blank(&id, category, &item_type);
    template.kind = kind_for(category, &item_type, slot.as_deref());
    template.name = text(map, &["name", "Name", "display_name", "title", "label"]);
    template.desc = text(map, &["desc", "description", "flavor"]);

    template.rarity = match text(map, &["rarity"]).map(|r| r.to_lowercase()) {
        None => None,
        Some(r) if r == "random" => None,
        Some(r) => Some(
            serde_json::from_value(Value::String(r))
                .map_err(|_| CatalogError::InvalidField { index, field: "rarity" })?,
        ),
    };

    if let Some(Value::Object(b)) = coalesce(map, &["bonus", "bonuses"]) {
        for (k, v) in b {
            if let Some(n) = int(v) {
                template.bonus.insert(k.to_lowercase(), clamp_i32(n));
            }
        }
    }
    template.tags = string_list(map.get("tags")).into_iter().collect();
    template.weight = coalesce(map, &["weight"]).and_then(float).unwrap_or(1.0).max(0.0);
    template.base_value = coalesce(map, &["value", "price"])
        .and_then(int)
        .map(|v| v.clamp(0, i64::from(u32::MAX)) as u32)
        .unwrap_or(0);

    let flat = {
        let lo = coalesce(map, &["min", "min_damage", "damage_min", "atk_min"]).and_then(int);
        let hi = coalesce(map, &["max", "max_damage", "damage_max", "atk_max"]).and_then(int);
        match (lo, hi) {
            (None, None) => None,
            (lo, hi) => {
                let lo = lo.or(hi).unwrap_or(0);
                Some(Envelope::new(clamp_i32(lo), clamp_i32(hi.unwrap_or(lo))))
            }
        }
    };

    match &mut template.kind {
        TemplateKind::Weapon(w) => {
            w.damage = element_map(coalesce(map, &["damage", "damage_range", "damage_type", "base_damage"]));
            w.flat = flat;
            w.status_chance = coalesce(map, &["status_chance", "statusChance"])
                .and_then(float)
                .map(|c| c.clamp(0.0, 1.0));
            w.statuses = string_list(coalesce(map, &["status", "statuses"]));
        }
        TemplateKind::Gear(g) => {
            g.defense = element_map(coalesce(map, &["defense", "defence", "armour", "armor"]));
            g.flat = flat;
        }
        TemplateKind::Plain => {}
    }

    Ok(template)
}
