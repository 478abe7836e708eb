//! Derived-stat formulas: pure functions of base stats and level.

use serde::{Deserialize, Serialize};

use crate::stat_modifier;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    pub mmax: i64,
    pub chn: i64,
    pub reg: i64,
    /// Max HP; may be fractional and is deliberately not rounded.
    pub hp: f64,
}

/// Compute MMAX/CHN/REG/HP from base stats and level. Callers pass 0 for
/// any base stat the combatant does not have.
pub fn compute_derived(phy: i64, cap: i64, opt: i64, rr: i64, level: i64) -> DerivedStats {
    let mmax = (((cap * level) as f64).sqrt() * 10.0).round() as i64;
    let chn = (((opt * level) as f64).sqrt() * 5.0).round() as i64;
    let reg = (((rr * level) as f64).sqrt() * 3.0).round() as i64;
    let hp = ((stat_modifier(phy) + 10) * 10) as f64 + mmax as f64 / 2.0;
    DerivedStats { mmax, chn, reg, hp }
}
