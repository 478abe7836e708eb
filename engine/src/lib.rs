pub mod api;
pub mod character;
pub mod combat;
pub mod derived;
pub mod stats;
pub mod store;
pub mod tiers;

pub use character::{
    Character, CharacterKind, DamageOutcome, EnemyDetails, EquipError, HealOutcome, Item, ItemSlot,
};
pub use combat::{AttackInput, AttackOutcome, Combatant, CounterInput, CounterOutcome, Lane, Side};
pub use derived::{DerivedStats, compute_derived};
pub use stats::{Conductivity, StatBlock, Tags};
pub use store::{EntityType, Store};
pub use tiers::{Stat, Tier, TierError, parse_tier_value, tier_value};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Resolution-scoped random source. Every attack resolution and tier
/// parse gets its own `Dice`, so two resolutions never observe each
/// other's randomness.
pub struct Dice {
    rng: ChaCha8Rng,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    pub fn from_entropy() -> Self {
        Self { rng: ChaCha8Rng::from_entropy() }
    }

    pub fn d20(&mut self) -> i64 {
        self.rng.gen_range(1..=20)
    }

    /// Fair coin, used for the tier-blend rounding tie-break.
    pub fn coin(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }
}

/// Stat modifier = floor((score - 10) / 2) for integer scores.
pub fn stat_modifier(score: i64) -> i64 {
    // `div_euclid` with positive divisor matches mathematical floor division.
    (score - 10).div_euclid(2)
}
