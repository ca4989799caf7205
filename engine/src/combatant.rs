use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::catalog::{Category, Element, normalize_slot};
use crate::loot::{ItemStats, RolledItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatantKind {
    Player,
    Ally,
    Enemy,
}

/// The eight core attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    pub strength: i32,
    pub dexterity: i32,
    pub vitality: i32,
    pub intelligence: i32,
    pub insight: i32,
    pub will: i32,
    pub charisma: i32,
    pub greed: i32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 4,
            dexterity: 4,
            vitality: 4,
            intelligence: 4,
            insight: 4,
            will: 4,
            charisma: 4,
            greed: 4,
        }
    }
}

impl Attributes {
    /// Looks up an attribute by name or common abbreviation.
    pub fn get(&self, key: &str) -> Option<i32> {
        let v = match key.trim().to_lowercase().as_str() {
            "strength" | "str" => self.strength,
            "dexterity" | "dex" => self.dexterity,
            "vitality" | "vit" | "con" => self.vitality,
            "intelligence" | "int" => self.intelligence,
            "insight" | "ins" | "wis" => self.insight,
            "will" | "wil" => self.will,
            "charisma" | "cha" => self.charisma,
            "greed" => self.greed,
            _ => return None,
        };
        Some(v)
    }
}

/// Inclusive damage range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRange {
    pub min: i32,
    pub max: i32,
}

impl DamageRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min: min.min(max), max: min.max(max) }
    }
}

impl Default for DamageRange {
    fn default() -> Self {
        Self { min: 1, max: 3 }
    }
}

fn default_xp_reward() -> u32 {
    25
}

/// Uniform view over the player, allies and enemies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CombatantRepr")]
pub struct Combatant {
    pub kind: CombatantKind,
    pub name: String,
    pub race: String,
    pub level: u32,
    hp: i32,
    max_hp: i32,
    pub attributes: Attributes,
    pub attack: DamageRange,
    pub weapon: Option<RolledItem>,
    gear: IndexMap<String, RolledItem>,
    status: Vec<String>,
    /// Experience handed to the player when this combatant is defeated.
    pub xp_reward: u32,
    pub hostile: bool,
}

fn one() -> u32 {
    1
}

/// Stored shape of a combatant. HP is clamped on the way in; a missing `hp` means full health.
#[derive(Deserialize)]
struct CombatantRepr {
    kind: CombatantKind,
    name: String,
    #[serde(default)]
    race: String,
    #[serde(default = "one")]
    level: u32,
    #[serde(default)]
    hp: Option<i32>,
    max_hp: i32,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    attack: DamageRange,
    #[serde(default)]
    weapon: Option<RolledItem>,
    #[serde(default)]
    gear: IndexMap<String, RolledItem>,
    #[serde(default)]
    status: Vec<String>,
    #[serde(default = "default_xp_reward")]
    xp_reward: u32,
    #[serde(default)]
    hostile: Option<bool>,
}

impl From<CombatantRepr> for Combatant {
    fn from(repr: CombatantRepr) -> Self {
        let mut c = Combatant::new(repr.kind, repr.name, repr.max_hp);
        c.set_hp(repr.hp.unwrap_or(c.max_hp));
        c.race = repr.race;
        c.level = repr.level;
        c.attributes = repr.attributes;
        c.attack = DamageRange::new(repr.attack.min, repr.attack.max);
        c.weapon = repr.weapon;
        c.xp_reward = repr.xp_reward;
        c.hostile = repr.hostile.unwrap_or(c.hostile);
        for (slot, item) in repr.gear {
            c.equip_gear(Some(&slot), item);
        }
        for status in &repr.status {
            c.add_status(status);
        }
        c
    }
}

impl Combatant {
    pub fn new(kind: CombatantKind, name: impl Into<String>, max_hp: i32) -> Self {
        let max_hp = max_hp.max(1);
        Self {
            kind,
            name: name.into(),
            race: String::new(),
            level: 1,
            hp: max_hp,
            max_hp,
            attributes: Attributes::default(),
            attack: DamageRange::default(),
            weapon: None,
            gear: IndexMap::new(),
            status: Vec::new(),
            xp_reward: default_xp_reward(),
            hostile: kind == CombatantKind::Enemy,
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_attack(mut self, min: i32, max: i32) -> Self {
        self.attack = DamageRange::new(min, max);
        self
    }

    pub fn stat(&self, key: &str) -> i32 {
        self.attributes.get(key).unwrap_or(0)
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    /// Sets HP, clamped into `0..=max_hp`.
    pub fn set_hp(&mut self, hp: i32) {
        self.hp = hp.clamp(0, self.max_hp);
    }

    /// Sets max HP (at least 1) and clamps current HP under it.
    pub fn set_max_hp(&mut self, max_hp: i32) {
        self.max_hp = max_hp.max(1);
        self.hp = self.hp.clamp(0, self.max_hp);
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn status(&self) -> &[String] {
        &self.status
    }

    /// Appends a status unless already present. Returns true when it was new.
    pub fn add_status(&mut self, status: &str) -> bool {
        if self.status.iter().any(|s| s == status) {
            return false;
        }
        self.status.push(status.to_string());
        true
    }

    pub fn equip_weapon(&mut self, item: RolledItem) -> Option<RolledItem> {
        self.weapon.replace(item)
    }

    /// Equips into the slot named by the item itself, or `slot` when given.
    pub fn equip_gear(&mut self, slot: Option<&str>, item: RolledItem) -> Option<RolledItem> {
        let slot = match (slot, &item.stats) {
            (Some(s), _) => normalize_slot(s),
            (None, ItemStats::Gear { slot, .. }) => slot.clone(),
            (None, _) => normalize_slot(&item.item_type),
        };
        self.gear.insert(slot, item)
    }

    pub fn gear(&self) -> &IndexMap<String, RolledItem> {
        &self.gear
    }

    /// Summed defense against `element` across all equipped gear.
    pub fn gear_defense(&self, element: Element) -> u32 {
        self.gear.values().map(|g| g.defense(element)).sum()
    }

    /// Weapon damage range, zero when unarmed.
    pub fn weapon_range(&self) -> DamageRange {
        self.weapon
            .as_ref()
            .and_then(RolledItem::damage_range)
            .unwrap_or(DamageRange { min: 0, max: 0 })
    }

    pub fn attack_element(&self) -> Element {
        self.weapon
            .as_ref()
            .map(RolledItem::dominant_element)
            .unwrap_or(Element::Physical)
    }

    /// A wand/staff weapon or anything in the `focus` slot.
    pub fn focus(&self) -> Option<&RolledItem> {
        self.weapon
            .as_ref()
            .filter(|w| matches!(w.item_type.as_str(), "wand" | "staff"))
            .or_else(|| self.gear.get("focus"))
    }
}

/// Something the player carries that is not equipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub category: Category,
}

impl From<&RolledItem> for InventoryItem {
    fn from(item: &RolledItem) -> Self {
        Self { id: item.id.clone(), name: item.name.clone(), category: item.category }
    }
}

/// Player-side state owned by the world layer and lent to a combat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub player: Combatant,
    #[serde(default)]
    pub allies: Vec<Combatant>,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub romance_progress: u32,
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
    #[serde(default)]
    pub known_spells: Vec<String>,
}

impl Party {
    pub fn new(player: Combatant) -> Self {
        Self {
            player,
            allies: Vec::new(),
            class: "default".to_string(),
            xp: 0,
            romance_progress: 0,
            inventory: Vec::new(),
            known_spells: Vec::new(),
        }
    }

    pub fn living_allies(&self) -> impl Iterator<Item = (usize, &Combatant)> {
        self.allies.iter().enumerate().filter(|(_, a)| a.is_alive())
    }

    /// Removes and returns the first item an enemy would take as a bribe.
    pub fn take_bribe_goods(&mut self) -> Option<InventoryItem> {
        let idx = self.inventory.iter().position(|i| i.category.is_bribe_goods())?;
        Some(self.inventory.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hp_is_clamped() {
        let mut c = Combatant::new(CombatantKind::Enemy, "Grukk", 16);
        c.set_hp(40);
        assert_eq!(c.hp(), 16);
        c.set_hp(-3);
        assert_eq!(c.hp(), 0);
        assert!(!c.is_alive());
    }

    #[test]
    fn status_is_deduplicated() {
        let mut c = Combatant::new(CombatantKind::Enemy, "Grukk", 16);
        assert!(c.add_status("burn"));
        assert!(!c.add_status("burn"));
        assert_eq!(c.status(), ["burn".to_string()]);
    }

    #[test]
    fn stat_accepts_abbreviations() {
        let c = Combatant::new(CombatantKind::Player, "Hero", 20).with_attributes(Attributes {
            dexterity: 9,
            ..Attributes::default()
        });
        assert_eq!(c.stat("dex"), 9);
        assert_eq!(c.stat("Dexterity"), 9);
        assert_eq!(c.stat("luck"), 0);
    }

    #[test]
    fn stored_hp_is_clamped_on_load() {
        let ogre: Combatant = serde_yaml::from_str("kind: enemy\nname: Ogre\nhp: 50\nmax_hp: 10\n").unwrap();
        assert_eq!((ogre.hp(), ogre.max_hp()), (10, 10));

        let ghost: Combatant = serde_yaml::from_str("kind: enemy\nname: Ghost\nhp: -4\nmax_hp: 0\n").unwrap();
        assert_eq!((ghost.hp(), ghost.max_hp()), (0, 1));
        assert!(!ghost.is_alive());

        let fresh: Combatant = serde_yaml::from_str("kind: ally\nname: Pip\nmax_hp: 12\nstatus: [burn, burn]\n").unwrap();
        assert_eq!(fresh.hp(), 12);
        assert_eq!(fresh.status(), ["burn".to_string()]);
        assert!(!fresh.hostile);
        assert!(ogre.hostile);
    }

    #[test]
    fn load_round_trips_a_wounded_combatant() {
        let mut c = Combatant::new(CombatantKind::Enemy, "Grukk", 16).with_attack(2, 5);
        c.set_hp(7);
        c.add_status("bleed");
        let back: Combatant = serde_json::from_str(&serde_json::to_string(&c).unwrap()).unwrap();
        assert_eq!(back, c);
    }
}
