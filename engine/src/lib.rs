use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

pub mod api;
pub mod catalog;
pub mod checks;
pub mod combat;
pub mod combatant;
pub mod config;
pub mod content;
pub mod error;
pub mod loot;
pub mod mitigation;
pub mod progression;
pub mod rarity;
pub mod status;

pub use catalog::{Catalog, Category, Element, ItemTemplate};
pub use combatant::{Attributes, Combatant, CombatantKind, DamageRange, Party};
pub use config::EngineConfig;
pub use error::{ActionError, CatalogError};
pub use loot::{LootReference, Resolver, RolledItem, Roller};
pub use rarity::RarityTier;

enum Source {
    Seeded(ChaCha8Rng),
    Scripted { values: Vec<f64>, cursor: usize },
}

/// Randomness for one roll or one combat call chain.
pub struct Dice {
    source: Source,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { source: Source::Seeded(ChaCha8Rng::seed_from_u64(seed)) }
    }

    /// Seeded from `"{world_seed}:{context_seed}"`.
    pub fn for_context(world_seed: u64, context_seed: &str) -> Self {
        Self::from_seed(seed_for(world_seed, context_seed))
    }

    /// Replays unit draws in order, cycling when exhausted. Values are clamped into [0, 1).
    pub fn from_scripted(values: Vec<f64>) -> Self {
        let values = if values.is_empty() { vec![0.0] } else { values };
        Self { source: Source::Scripted { values, cursor: 0 } }
    }

    /// Uniform draw in [0, 1).
    pub fn unit(&mut self) -> f64 {
        match &mut self.source {
            Source::Seeded(rng) => rng.gen_range(0.0..1.0),
            Source::Scripted { values, cursor } => {
                let v = values[*cursor % values.len()];
                *cursor += 1;
                v.clamp(0.0, 1.0 - f64::EPSILON)
            }
        }
    }

    /// Inclusive integer range; bounds may be given in either order.
    pub fn range(&mut self, lo: i32, hi: i32) -> i32 {
        let (lo, hi) = if hi < lo { (hi, lo) } else { (lo, hi) };
        if let Source::Seeded(rng) = &mut self.source {
            return rng.gen_range(lo..=hi);
        }
        let span = (hi - lo + 1) as f64;
        let offset = (self.unit() * span).floor() as i32;
        (lo + offset).min(hi)
    }

    /// Index into a non-empty collection of `len` elements.
    pub fn index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        if let Source::Seeded(rng) = &mut self.source {
            return rng.gen_range(0..len);
        }
        ((self.unit() * len as f64) as usize).min(len - 1)
    }

    /// Succeeds when the unit draw falls strictly below `percent / 100`.
    pub fn chance(&mut self, percent: u32) -> ChanceResult {
        let draw = self.unit();
        let threshold = f64::from(percent) / 100.0;
        ChanceResult { draw, percent, passed: draw < threshold }
    }

    pub fn next_u32(&mut self) -> u32 {
        if let Source::Seeded(rng) = &mut self.source {
            return rng.next_u32();
        }
        (self.unit() * f64::from(u32::MAX)) as u32
    }

    /// Weighted pick over `(key, weight)` pairs. Non-positive weights never win.
    pub fn weighted<'a, K>(&mut self, pairs: impl IntoIterator<Item = (&'a K, f64)>) -> Option<&'a K>
    where
        K: ?Sized + 'a,
    {
        let pairs: Vec<(&K, f64)> = pairs.into_iter().filter(|(_, w)| *w > 0.0).collect();
        let total: f64 = pairs.iter().map(|(_, w)| w).sum();
        if pairs.is_empty() || total <= 0.0 {
            return None;
        }
        let r = self.unit() * total;
        let mut upto = 0.0;
        for (key, w) in &pairs {
            upto += w;
            if r < upto {
                return Some(*key);
            }
        }
        pairs.last().map(|(k, _)| *k)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChanceResult {
    pub draw: f64,
    pub percent: u32,
    pub passed: bool,
}

/// Stable 64-bit seed for a loot or combat occasion.
pub fn seed_for(world_seed: u64, context_seed: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", world_seed, context_seed).as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
