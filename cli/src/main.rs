use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use engine::api::{
    normalize_catalog_text, read_text_auto, roll_loot, simulate_encounter, simulate_encounter_many, Approach,
    EncounterConfig, LootRequest,
};
use engine::combat::PlayerAction;
use engine::loot::ItemStats;
use engine::{LootReference, RolledItem};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Subcommand)]
enum Cmd {
    /// Resolve a loot reference and roll items from it
    Roll {
        /// Reference: `table:NAME`, `alias:NAME`, `id:ID` or a bare id
        #[arg(long = "ref")]
        reference: String,
        /// Character level the items are rolled for
        #[arg(long, default_value_t = 1)]
        level: u32,
        /// World seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Number of items
        #[arg(long, default_value_t = 1)]
        num: u32,
        /// Catalog file (YAML or JSON); defaults to the built-in catalog
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Print items as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Play one encounter with a scripted player and print the combat log
    Fight {
        /// Built-in encounter id
        #[arg(long, default_value = "goblin_ambush")]
        encounter: String,
        /// Encounter YAML file (overrides --encounter)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Catalog file (YAML or JSON)
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Engine config YAML
        #[arg(long)]
        config: Option<PathBuf>,
        /// World seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Comma-separated player actions, cycled (attack, cast, flee, talk, bribe)
        #[arg(long, value_delimiter = ',')]
        actions: Vec<String>,
        /// How to meet the enemies: fight, sneak or bypass
        #[arg(long, default_value = "fight")]
        approach: String,
        /// Print the full result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run an encounter over many seeds and summarize outcomes
    Sim {
        #[arg(long, default_value = "goblin_ambush")]
        encounter: String,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// First seed; sample i uses seed + i
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long, default_value_t = 100)]
        samples: u32,
        #[arg(long, value_delimiter = ',')]
        actions: Vec<String>,
        #[arg(long, default_value = "fight")]
        approach: String,
    },
    /// Print a catalog's items normalized to canonical fields (JSON)
    Normalize {
        /// Catalog file; UTF-8 or UTF-16 with BOM
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Parser)]
#[command(name = "rpgen")]
#[command(about = "Loot and combat simulation harness")]
struct Cli {
    /// Log engine diagnostics at debug level
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Serialize)]
struct SimSummary<'a> {
    encounter: &'a str,
    seed: u64,
    #[serde(flatten)]
    stats: engine::api::EncounterStats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Cmd::Roll {
            reference,
            level,
            seed,
            num,
            catalog,
            json,
        } => {
            let items = roll_loot(LootRequest {
                catalog_id: None,
                catalog_path: catalog.map(path_string),
                reference: LootReference::parse(&reference),
                level,
                seed,
                num,
            })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("nothing dropped");
            } else {
                for item in &items {
                    println!("{}", describe(item));
                }
            }
        }
        Cmd::Fight {
            encounter,
            file,
            catalog,
            config,
            seed,
            actions,
            approach,
            json,
        } => {
            let cfg = EncounterConfig {
                encounter_id: Some(encounter),
                encounter_path: file.map(path_string),
                catalog_path: catalog.map(path_string),
                config_path: config.map(path_string),
                seed,
                actions: parse_actions(&actions)?,
                approach: parse_approach(&approach)?,
                ..EncounterConfig::default()
            };
            let res = simulate_encounter(cfg)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&res)?);
            } else {
                for line in &res.log {
                    println!("{}", line);
                }
                let outcome = res.outcome.map(|o| o.label()).unwrap_or("unresolved");
                println!(
                    "outcome={} decisions={} hp={}/{} level={} xp={}",
                    outcome, res.decisions, res.player_hp, res.player_max_hp, res.player_level, res.xp
                );
                for item in &res.loot {
                    println!("loot: {}", describe(item));
                }
            }
        }
        Cmd::Sim {
            encounter,
            file,
            catalog,
            config,
            seed,
            samples,
            actions,
            approach,
        } => {
            if samples == 0 {
                bail!("--samples must be at least 1");
            }
            let cfg = EncounterConfig {
                encounter_id: Some(encounter.clone()),
                encounter_path: file.map(path_string),
                catalog_path: catalog.map(path_string),
                config_path: config.map(path_string),
                seed,
                actions: parse_actions(&actions)?,
                approach: parse_approach(&approach)?,
                ..EncounterConfig::default()
            };
            let stats = simulate_encounter_many(cfg, samples)?;
            let summary = SimSummary {
                encounter: &encounter,
                seed,
                stats,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Cmd::Normalize { file } => {
            let text = read_text_auto(&file).with_context(|| format!("failed to read {}", file.display()))?;
            let out = normalize_catalog_text(&text)
                .with_context(|| format!("failed to normalize {}", file.display()))?;
            println!("{}", out);
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn path_string(p: PathBuf) -> String {
    p.to_string_lossy().into_owned()
}

fn parse_actions(raw: &[String]) -> anyhow::Result<Vec<PlayerAction>> {
    raw.iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| PlayerAction::parse(s).with_context(|| format!("unknown action '{}'", s)))
        .collect()
}

fn parse_approach(raw: &str) -> anyhow::Result<Approach> {
    Approach::parse(raw).with_context(|| format!("unknown approach '{}'", raw))
}

fn describe(item: &RolledItem) -> String {
    let stats = match &item.stats {
        ItemStats::Weapon { damage, .. } => {
            let range = item
                .damage_range()
                .map(|r| format!("{}-{}", r.min, r.max))
                .unwrap_or_default();
            format!("dmg {} [{}]", range, join_map(damage.iter().map(|(k, v)| (format!("{:?}", k), *v))))
        }
        ItemStats::Gear { slot, defense } => format!(
            "{} def [{}]",
            slot,
            join_map(defense.iter().map(|(k, v)| (format!("{:?}", k), *v)))
        ),
        ItemStats::Plain => String::new(),
    };
    let enchants = if item.enchants.is_empty() {
        String::new()
    } else {
        format!(" +{}", item.enchants.join("+"))
    };
    format!(
        "{} {} ({}) {}{} value={} weight={:.2}",
        item.id,
        item.name,
        item.rarity.title(),
        stats,
        enchants,
        item.value,
        item.weight
    )
}

fn join_map(entries: impl Iterator<Item = (String, u32)>) -> String {
    entries
        .map(|(k, v)| format!("{}:{}", k.to_lowercase(), v))
        .collect::<Vec<_>>()
        .join(" ")
}
