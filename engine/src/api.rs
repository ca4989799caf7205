use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::Encoding;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogDocument, Category, normalize_items};
use crate::checks::sneak_check;
use crate::combat::{ActionReport, CombatSession, Outcome, Phase, PlayerAction};
use crate::combatant::{Attributes, Combatant, CombatantKind, InventoryItem, Party};
use crate::config::EngineConfig;
use crate::content::{builtin_catalogs, builtin_encounters};
use crate::loot::{LootReference, Resolver, RolledItem, Roller};
use crate::Dice;

const DEFAULT_MAX_DECISIONS: u32 = 200;

fn one() -> u32 {
    1
}

fn default_num() -> u32 {
    1
}

fn default_class() -> String {
    "default".to_string()
}

fn default_max_decisions() -> u32 {
    DEFAULT_MAX_DECISIONS
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LootRequest {
    /// Built-in catalog name; ignored when `catalog_path` is set.
    #[serde(default)]
    pub catalog_id: Option<String>,
    #[serde(default)]
    pub catalog_path: Option<String>,
    pub reference: LootReference,
    #[serde(default = "one")]
    pub level: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_num")]
    pub num: u32,
}

/// Rolls `num` items for one reference. References that resolve to nothing are skipped.
pub fn roll_loot(req: LootRequest) -> Result<Vec<RolledItem>> {
    let catalog = load_catalog(req.catalog_id.as_deref(), req.catalog_path.as_deref())?;
    let resolver = Resolver::new(&catalog, req.seed);
    let roller = Roller::new(&catalog, req.seed);
    let signature = req.reference.signature();

    let items: Vec<RolledItem> = (0..req.num)
        .filter_map(|i| {
            let ctx = format!("{}|{}|{}|{}", req.seed, req.level, signature, i);
            roll_reference(&resolver, &roller, &req.reference, req.level, &ctx)
        })
        .collect();
    info!(reference = %signature, requested = req.num, rolled = items.len(), "loot rolled");
    Ok(items)
}

fn roll_reference(
    resolver: &Resolver<'_>,
    roller: &Roller<'_>,
    reference: &LootReference,
    level: u32,
    context_seed: &str,
) -> Option<RolledItem> {
    let template = resolver.resolve(reference, context_seed)?;
    Some(roller.roll(&template, level, context_seed))
}

/// How the player meets the encounter before any blows are traded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Approach {
    #[default]
    Fight,
    /// Sneak check against unaware enemies; failure starts the fight.
    Sneak,
    /// Walk around unaware enemies, no roll.
    Bypass,
}

impl Approach {
    pub fn parse(s: &str) -> Option<Approach> {
        match s.trim().to_lowercase().as_str() {
            "fight" => Some(Approach::Fight),
            "sneak" => Some(Approach::Sneak),
            "bypass" | "avoid" => Some(Approach::Bypass),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EncounterConfig {
    #[serde(default)]
    pub encounter_id: Option<String>,
    #[serde(default)]
    pub encounter_path: Option<String>,
    #[serde(default)]
    pub catalog_id: Option<String>,
    #[serde(default)]
    pub catalog_path: Option<String>,
    /// Optional YAML file with [`EngineConfig`] overrides.
    #[serde(default)]
    pub config_path: Option<String>,
    /// World seed for loot and combat.
    #[serde(default)]
    pub seed: u64,
    /// Player decisions, cycled. Empty means always attack.
    #[serde(default)]
    pub actions: Vec<PlayerAction>,
    #[serde(default = "default_max_decisions")]
    pub max_decisions: u32,
    #[serde(default)]
    pub approach: Approach,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            encounter_id: None,
            encounter_path: None,
            catalog_id: None,
            catalog_path: None,
            config_path: None,
            seed: 0,
            actions: Vec::new(),
            max_decisions: DEFAULT_MAX_DECISIONS,
            approach: Approach::Fight,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EncounterResult {
    pub encounter: String,
    /// `None` when the decision budget ran out or auto-play stalled.
    pub outcome: Option<Outcome>,
    pub decisions: u32,
    pub player_hp: i32,
    pub player_max_hp: i32,
    pub player_level: u32,
    pub xp: u32,
    pub survivors: Vec<String>,
    pub loot: Vec<RolledItem>,
    pub log: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ActorSpec {
    name: String,
    #[serde(default)]
    race: String,
    #[serde(default = "one")]
    level: u32,
    hp: i32,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    attack: Option<[i32; 2]>,
    #[serde(default)]
    weapon: Option<LootReference>,
    #[serde(default)]
    gear: Vec<LootReference>,
    #[serde(default)]
    xp_reward: Option<u32>,
    #[serde(default)]
    drops: Vec<LootReference>,
}

#[derive(Debug, Clone, Deserialize)]
struct PartySpec {
    player: ActorSpec,
    #[serde(default)]
    allies: Vec<ActorSpec>,
    #[serde(default = "default_class")]
    class: String,
    #[serde(default)]
    romance_progress: u32,
    #[serde(default)]
    known_spells: Vec<String>,
    #[serde(default)]
    inventory: Vec<LootReference>,
}

#[derive(Debug, Clone, Deserialize)]
struct EncounterFile {
    name: String,
    #[serde(default = "one")]
    level: u32,
    /// Enemies already aware of the player cannot be sneaked past or bypassed.
    #[serde(default)]
    spotted: bool,
    party: PartySpec,
    enemies: Vec<ActorSpec>,
}

struct Loadout<'c> {
    resolver: Resolver<'c>,
    roller: Roller<'c>,
    cfg: &'c EngineConfig,
}

impl Loadout<'_> {
    fn roll(&self, reference: &LootReference, level: u32, ctx: &str) -> Option<RolledItem> {
        roll_reference(&self.resolver, &self.roller, reference, level, ctx)
    }

    fn combatant(&self, spec: &ActorSpec, kind: CombatantKind, ctx: &str) -> Combatant {
        let mut c = Combatant::new(kind, spec.name.clone(), spec.hp).with_attributes(spec.attributes);
        c.race = spec.race.clone();
        c.level = spec.level;
        if let Some([lo, hi]) = spec.attack {
            c = c.with_attack(lo, hi);
        }
        c.xp_reward = spec.xp_reward.unwrap_or(self.cfg.default_xp_reward);

        if let Some(reference) = &spec.weapon {
            if let Some(item) = self.roll(reference, spec.level, &format!("{}|weapon", ctx)) {
                if item.category == Category::Weapon {
                    c.equip_weapon(item);
                } else {
                    c.equip_gear(None, item);
                }
            }
        }
        for (j, reference) in spec.gear.iter().enumerate() {
            if let Some(item) = self.roll(reference, spec.level, &format!("{}|gear{}", ctx, j)) {
                c.equip_gear(None, item);
            }
        }
        c
    }
}

/// Runs one encounter to completion with a scripted player.
pub fn simulate_encounter(cfg: EncounterConfig) -> Result<EncounterResult> {
    let catalog = load_catalog(cfg.catalog_id.as_deref(), cfg.catalog_path.as_deref())?;
    let file = load_encounter(&cfg)?;
    let mut engine_cfg = load_engine_config(cfg.config_path.as_deref())?;
    engine_cfg.world_seed = cfg.seed;
    run_encounter(&catalog, &file, &engine_cfg, &cfg)
}

/// Settles the encounter without combat when the approach allows it. `None` means fight.
fn try_avoid(
    approach: Approach,
    file: &EncounterFile,
    player: &str,
    dice: &mut Dice,
    log: &mut Vec<String>,
) -> Option<Outcome> {
    match approach {
        Approach::Fight => None,
        Approach::Sneak | Approach::Bypass if file.spotted => {
            log.push(format!("[SNEAK][{}] already spotted at {}; no way around", player, file.name));
            None
        }
        Approach::Bypass => {
            log.push(format!("[SNEAK][{}] gives {} a wide berth", player, file.name));
            Some(Outcome::Bypassed)
        }
        Approach::Sneak => {
            let label = format!("{} sneaks past {}", player, file.name);
            if sneak_check(dice, &label, |l| log.push(l)).passed {
                log.push(format!("[SNEAK][{}] slips past unnoticed", player));
                Some(Outcome::SnuckPast)
            } else {
                log.push(format!("[SNEAK][{}] stumbles and is spotted", player));
                None
            }
        }
    }
}

fn run_encounter(
    catalog: &Catalog,
    file: &EncounterFile,
    engine_cfg: &EngineConfig,
    cfg: &EncounterConfig,
) -> Result<EncounterResult> {
    if file.enemies.is_empty() {
        bail!("encounter '{}' has no enemies", file.name);
    }
    let world_seed = engine_cfg.world_seed;
    let loadout = Loadout {
        resolver: Resolver::new(catalog, world_seed).with_max_alias_depth(engine_cfg.max_alias_depth),
        roller: Roller::new(catalog, world_seed),
        cfg: engine_cfg,
    };

    let spec = &file.party;
    let mut party = Party::new(loadout.combatant(&spec.player, CombatantKind::Player, &format!("{}|player", file.name)));
    party.class = spec.class.clone();
    party.romance_progress = spec.romance_progress;
    party.known_spells = spec.known_spells.clone();
    party.allies = spec
        .allies
        .iter()
        .enumerate()
        .map(|(i, a)| loadout.combatant(a, CombatantKind::Ally, &format!("{}|ally{}", file.name, i)))
        .collect();
    party.inventory = spec
        .inventory
        .iter()
        .enumerate()
        .filter_map(|(i, r)| loadout.roll(r, file.level, &format!("{}|pack{}", file.name, i)))
        .map(|item| InventoryItem::from(&item))
        .collect();

    let enemies: Vec<Combatant> = file
        .enemies
        .iter()
        .enumerate()
        .map(|(i, e)| loadout.combatant(e, CombatantKind::Enemy, &format!("{}|enemy{}", file.name, i)))
        .collect();

    let mut dice = Dice::for_context(world_seed, &format!("{}|combat", file.name));
    let mut log = Vec::new();
    if let Some(outcome) = try_avoid(cfg.approach, file, &party.player.name, &mut dice, &mut log) {
        log.push(format!("[END] {}", outcome.label()));
        return Ok(EncounterResult {
            encounter: file.name.clone(),
            outcome: Some(outcome),
            decisions: 0,
            player_hp: party.player.hp(),
            player_max_hp: party.player.max_hp(),
            player_level: party.player.level,
            xp: party.xp,
            survivors: enemies.into_iter().map(|e| e.name).collect(),
            loot: Vec::new(),
            log,
        });
    }
    let mut session = CombatSession::engage(enemies, &mut party, &mut dice, engine_cfg);

    let script: &[PlayerAction] = if cfg.actions.is_empty() { &[PlayerAction::Attack] } else { cfg.actions.as_slice() };
    let mut decisions = 0u32;
    while session.phase() == Phase::AwaitingPlayerInput && decisions < cfg.max_decisions {
        let action = script[decisions as usize % script.len()];
        decisions += 1;
        if let ActionReport::Rejected(err) = session.act(action, &mut party, &mut dice, engine_cfg) {
            debug!(?action, %err, "scripted action refused; attacking instead");
            if let ActionReport::Rejected(_) = session.act(PlayerAction::Attack, &mut party, &mut dice, engine_cfg) {
                break;
            }
        }
    }

    let outcome = session.outcome();
    log.extend(session.take_log());
    let mut loot = Vec::new();
    if outcome == Some(Outcome::Victory) {
        for (i, enemy) in file.enemies.iter().enumerate() {
            for (j, reference) in enemy.drops.iter().enumerate() {
                let ctx = format!("{}|drop{}|{}|{}", file.name, i, reference.signature(), j);
                if let Some(item) = loadout.roll(reference, file.level, &ctx) {
                    log.push(format!("[LOOT] {} ({})", item.name, item.rarity.title()));
                    loot.push(item);
                }
            }
        }
    }

    let survivors = session.into_enemies().into_iter().map(|e| e.name).collect();
    Ok(EncounterResult {
        encounter: file.name.clone(),
        outcome,
        decisions,
        player_hp: party.player.hp(),
        player_max_hp: party.player.max_hp(),
        player_level: party.player.level,
        xp: party.xp,
        survivors,
        loot,
        log,
    })
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EncounterStats {
    pub samples: u32,
    pub outcomes: IndexMap<String, u32>,
    pub unresolved: u32,
    pub avg_decisions: f64,
    pub avg_player_hp_end: f64,
}

/// Runs the same encounter over seeds `seed, seed + 1, ...` and tallies outcomes.
pub fn simulate_encounter_many(cfg: EncounterConfig, samples: u32) -> Result<EncounterStats> {
    let catalog = load_catalog(cfg.catalog_id.as_deref(), cfg.catalog_path.as_deref())?;
    let file = load_encounter(&cfg)?;
    let base_cfg = load_engine_config(cfg.config_path.as_deref())?;

    let mut stats = EncounterStats { samples, ..EncounterStats::default() };
    let mut total_decisions = 0u64;
    let mut total_hp = 0i64;
    for i in 0..samples {
        let engine_cfg = EngineConfig { world_seed: cfg.seed.wrapping_add(u64::from(i)), ..base_cfg.clone() };
        let res = run_encounter(&catalog, &file, &engine_cfg, &cfg)?;
        match res.outcome {
            Some(o) => *stats.outcomes.entry(o.label().to_string()).or_insert(0) += 1,
            None => stats.unresolved += 1,
        }
        total_decisions += u64::from(res.decisions);
        total_hp += i64::from(res.player_hp);
    }
    if samples > 0 {
        stats.avg_decisions = total_decisions as f64 / f64::from(samples);
        stats.avg_player_hp_end = total_hp as f64 / f64::from(samples);
    }
    Ok(stats)
}

/// Normalizes the `items` of a catalog document (YAML or JSON) and renders them as JSON.
pub fn normalize_catalog_text(text: &str) -> Result<String> {
    let text = text.trim_start_matches('\u{feff}');
    let doc: CatalogDocument = serde_yaml::from_str(text).context("failed to parse catalog document")?;
    let items = normalize_items(&doc.items)?;
    Ok(serde_json::to_string_pretty(&items)?)
}

fn read_data_file(path: &str, what: &str) -> Result<String> {
    read_text_auto(Path::new(path)).with_context(|| format!("failed to read {}: {}", what, path))
}

/// Reads a text file, decoding by its BOM (UTF-8 or UTF-16) and assuming UTF-8 otherwise.
pub fn read_text_auto(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    match Encoding::for_bom(&bytes) {
        Some((enc, bom_len)) => {
            let (text, _, had_errors) = enc.decode(&bytes[bom_len..]);
            if had_errors {
                warn!(path = %path.display(), encoding = enc.name(), "replaced undecodable bytes");
            }
            Ok(text.into_owned())
        }
        None => Ok(String::from_utf8(bytes)?),
    }
}

pub fn load_catalog(catalog_id: Option<&str>, catalog_path: Option<&str>) -> Result<Catalog> {
    if let Some(path) = catalog_path {
        let text = read_data_file(path, "catalog")?;
        let is_json = Path::new(path)
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let catalog = if is_json { Catalog::from_json_str(&text) } else { Catalog::from_yaml_str(&text) };
        return catalog.with_context(|| format!("failed to load catalog: {}", path));
    }
    let id = catalog_id.unwrap_or("loot");
    let builtins = builtin_catalogs();
    let text = builtins
        .get(id)
        .ok_or_else(|| anyhow!("unknown built-in catalog '{}'", id))?;
    Catalog::from_yaml_str(text).with_context(|| format!("failed to load built-in catalog '{}'", id))
}

fn load_encounter(cfg: &EncounterConfig) -> Result<EncounterFile> {
    if let Some(path) = &cfg.encounter_path {
        let text = read_data_file(path, "encounter")?;
        return serde_yaml::from_str(&text).with_context(|| format!("failed to parse encounter: {}", path));
    }
    let id = cfg.encounter_id.as_deref().unwrap_or("goblin_ambush");
    let builtins = builtin_encounters();
    let text = builtins
        .get(id)
        .ok_or_else(|| anyhow!("unknown built-in encounter '{}'", id))?;
    serde_yaml::from_str(text).with_context(|| format!("failed to parse built-in encounter '{}'", id))
}

fn load_engine_config(path: Option<&str>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let text = read_data_file(path, "engine config")?;
            EngineConfig::from_yaml_str(&text).with_context(|| format!("failed to parse engine config: {}", path))
        }
        None => Ok(EngineConfig::default()),
    }
}
