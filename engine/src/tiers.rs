//! Tier descriptor parsing used during character authoring: maps labels
//! like `HIGH`, `FF+`, or `EX++` to per-stat integers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Dice;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TierError {
    #[error("unknown stat tier: {0}")]
    InvalidTierToken(String),
}

/// Column of the tier table a descriptor is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stat {
    Phy,
    Fin,
    Com,
    Mgk,
    Cap,
    Opt,
    Rr,
}

impl Stat {
    fn column(self) -> usize {
        match self {
            Stat::Phy => 0,
            Stat::Fin => 1,
            Stat::Com => 2,
            Stat::Mgk => 3,
            Stat::Cap => 4,
            Stat::Opt => 5,
            Stat::Rr => 6,
        }
    }
}

/// The ten quality tiers, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Abysmal,
    VeryLow,
    Low,
    MidLow,
    Mediocre,
    MidHigh,
    High,
    VeryHigh,
    Ex,
    ExPlus,
}

const TIERS: [Tier; 10] = [
    Tier::Abysmal,
    Tier::VeryLow,
    Tier::Low,
    Tier::MidLow,
    Tier::Mediocre,
    Tier::MidHigh,
    Tier::High,
    Tier::VeryHigh,
    Tier::Ex,
    Tier::ExPlus,
];

// Rows follow TIERS; columns are PHY FIN COM MGK CAP OPT RR.
#[rustfmt::skip]
const TIER_TABLE: [[i64; 7]; 10] = [
    [ 1,  1,  1,  1,  2,  1,  1], // ABYSMAL
    [ 3,  3,  3,  5,  3,  2,  3], // VERY LOW
    [ 6,  6,  6,  7,  4,  3,  3], // LOW
    [ 9,  9,  9, 10,  5,  4,  4], // MID LOW
    [12, 11, 12, 15,  6,  6,  6], // MEDIOCRE
    [15, 15, 15, 18,  7,  7,  7], // MID HIGH
    [18, 18, 18, 24,  8,  8,  8], // HIGH
    [20, 20, 20, 27, 10, 10, 10], // VERY HIGH
    [30, 30, 30, 45, 16, 16, 16], // EX
    [50, 50, 50, 87, 30, 30, 30], // EX+
];

/// Table value for one tier/stat pair.
pub fn tier_value(tier: Tier, stat: Stat) -> i64 {
    TIER_TABLE[tier as usize][stat.column()]
}

fn alias(token: &str) -> Option<Tier> {
    Some(match token {
        "ABYSMAL" | "T" | "FFF" => Tier::Abysmal,
        "VERY LOW" | "VL" | "FF" => Tier::VeryLow,
        "LOW" | "L" | "F" => Tier::Low,
        "MID LOW" | "ML" | "D" => Tier::MidLow,
        "MEDIOCRE" | "M" | "C" => Tier::Mediocre,
        "MID HIGH" | "MH" | "B" => Tier::MidHigh,
        "HIGH" | "H" | "A" => Tier::High,
        "VERY HIGH" | "VH" | "S" => Tier::VeryHigh,
        "EX" | "E" | "SS" => Tier::Ex,
        "EX+" | "X" | "SSS" => Tier::ExPlus,
        _ => return None,
    })
}

const ABYSMAL_ALIASES: [&str; 3] = ["ABYSMAL", "T", "FFF"];
const EX_ALIASES: [&str; 3] = ["EX", "E", "SS"];
const EX_PLUS_ALIASES: [&str; 3] = ["EX+", "X", "SSS"];

fn has_suffixed_alias(token: &str, aliases: &[&str], suffix: char) -> bool {
    aliases
        .iter()
        .any(|a| token.len() == a.len() + 1 && token.starts_with(a) && token.ends_with(suffix))
}

/// Mean of two tier values. A whole mean is returned as-is; a fractional
/// mean floors or rounds-half-up on a fair coin. The coin is intentional
/// game-design flavor (stat variety between otherwise identical
/// characters), not a rounding bug.
fn blend(a: i64, b: i64, dice: &mut Dice) -> i64 {
    let mean = (a + b) as f64 / 2.0;
    let picked = if dice.coin() { mean.floor() } else { mean.round() };
    picked as i64
}

/// Resolve a stat descriptor to an integer: a plain number passes
/// through, otherwise the token is looked up in the tier/alias tables,
/// honoring `+`/`-` blending toward the adjacent tier (clamped at the
/// table edges) and the ABYSMAL/EX/EX+ special cases.
pub fn parse_tier_value(token: &str, stat: Stat, dice: &mut Dice) -> Result<i64, TierError> {
    let raw = token.trim().to_uppercase();

    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        // All-digit tokens can't overflow plausibly; treat failure as invalid.
        return raw
            .parse::<i64>()
            .map_err(|_| TierError::InvalidTierToken(raw.clone()));
    }

    // Special cases come before generic blending.
    // A `-` on the bottom tier floors to zero.
    if has_suffixed_alias(&raw, &ABYSMAL_ALIASES, '-') {
        return Ok(0);
    }
    // A `+` past the top tier is a flat 30% boost instead of a blend.
    if has_suffixed_alias(&raw, &EX_PLUS_ALIASES, '+') || raw == "EX++" {
        let base = tier_value(Tier::ExPlus, stat);
        return Ok((base as f64 * 1.3).round() as i64);
    }
    // Bare EX+ never blends upward.
    if EX_PLUS_ALIASES.contains(&raw.as_str()) {
        return Ok(tier_value(Tier::ExPlus, stat));
    }
    // `EX+` itself is already consumed above, so this only matches E+/SS+.
    if has_suffixed_alias(&raw, &EX_ALIASES, '+') {
        return Ok(blend(tier_value(Tier::Ex, stat), tier_value(Tier::ExPlus, stat), dice));
    }

    let (name, shift) = if let Some(stripped) = raw.strip_suffix('+') {
        (stripped, 1i64)
    } else if let Some(stripped) = raw.strip_suffix('-') {
        (stripped, -1i64)
    } else {
        (raw.as_str(), 0i64)
    };

    let tier = alias(name).ok_or_else(|| TierError::InvalidTierToken(name.to_string()))?;
    let base = tier_value(tier, stat);
    if shift == 0 {
        return Ok(base);
    }

    // Adjacent index clamps at the edges: no wraparound, no error.
    let idx = tier as i64;
    let adjacent = TIERS[(idx + shift).clamp(0, TIERS.len() as i64 - 1) as usize];
    Ok(blend(base, tier_value(adjacent, stat), dice))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_tokens_pass_through() {
        let mut dice = Dice::from_seed(0);
        assert_eq!(parse_tier_value("12", Stat::Phy, &mut dice), Ok(12));
        assert_eq!(parse_tier_value(" 7 ", Stat::Rr, &mut dice), Ok(7));
    }

    #[test]
    fn plain_tiers_and_aliases_resolve() {
        let mut dice = Dice::from_seed(0);
        assert_eq!(parse_tier_value("LOW", Stat::Phy, &mut dice), Ok(6));
        assert_eq!(parse_tier_value("f", Stat::Phy, &mut dice), Ok(6));
        assert_eq!(parse_tier_value("MID LOW", Stat::Mgk, &mut dice), Ok(10));
        assert_eq!(parse_tier_value("vh", Stat::Cap, &mut dice), Ok(10));
        assert_eq!(parse_tier_value("A", Stat::Fin, &mut dice), Ok(18));
    }

    #[test]
    fn unknown_tokens_are_rejected_by_name() {
        let mut dice = Dice::from_seed(0);
        assert_eq!(
            parse_tier_value("ZZZ", Stat::Phy, &mut dice),
            Err(TierError::InvalidTierToken("ZZZ".into()))
        );
        // The suffix is stripped before the lookup fails.
        assert_eq!(
            parse_tier_value("ZZZ+", Stat::Phy, &mut dice),
            Err(TierError::InvalidTierToken("ZZZ".into()))
        );
    }

    #[test]
    fn abysmal_minus_floors_to_zero() {
        let mut dice = Dice::from_seed(0);
        for token in ["T-", "FFF-", "ABYSMAL-"] {
            assert_eq!(parse_tier_value(token, Stat::Phy, &mut dice), Ok(0));
        }
    }

    #[test]
    fn ex_plus_boost_is_deterministic() {
        let mut dice = Dice::from_seed(0);
        // EX+ PHY = 50, boosted by 1.3 and rounded.
        for token in ["X+", "SSS+", "EX++"] {
            assert_eq!(parse_tier_value(token, Stat::Phy, &mut dice), Ok(65));
        }
        assert_eq!(parse_tier_value("X+", Stat::Mgk, &mut dice), Ok(113));
    }

    #[test]
    fn bare_ex_plus_never_blends_upward() {
        let mut dice = Dice::from_seed(0);
        for token in ["EX+", "X", "SSS"] {
            assert_eq!(parse_tier_value(token, Stat::Phy, &mut dice), Ok(50));
        }
    }

    #[test]
    fn ex_plus_suffix_blends_toward_the_top() {
        // EX 30 and EX+ 50 average to a whole 40 for PHY.
        let mut dice = Dice::from_seed(0);
        assert_eq!(parse_tier_value("E+", Stat::Phy, &mut dice), Ok(40));
        assert_eq!(parse_tier_value("SS+", Stat::Phy, &mut dice), Ok(40));
    }

    #[test]
    fn abysmal_plus_blends_upward_normally() {
        // ABYSMAL 1 and VERY LOW 3 mean 2 exactly.
        let mut dice = Dice::from_seed(0);
        assert_eq!(parse_tier_value("T+", Stat::Phy, &mut dice), Ok(2));
    }

    #[test]
    fn blend_splits_between_floor_and_round() {
        // LOW=6, MID LOW=9 for PHY: mean 7.5 floors to 7 or rounds to 8.
        let mut dice = Dice::from_seed(42);
        let mut counts = [0u32; 2];
        for _ in 0..2000 {
            match parse_tier_value("L+", Stat::Phy, &mut dice).unwrap() {
                7 => counts[0] += 1,
                8 => counts[1] += 1,
                v => panic!("unexpected blend value {v}"),
            }
        }
        // Fair coin: both sides well away from the extremes.
        assert!(counts[0] > 800 && counts[1] > 800, "counts {counts:?}");
    }

    #[test]
    fn blend_clamps_at_the_bottom_edge() {
        // VERY LOW - blends toward ABYSMAL: (3+1)/2 = 2 for PHY.
        let mut dice = Dice::from_seed(0);
        assert_eq!(parse_tier_value("VL-", Stat::Phy, &mut dice), Ok(2));
    }
}
