//! The stat record shared by combatants and equipment, and the additive
//! modifier algebra used for equip/unequip/buff.

use serde::{Deserialize, Serialize};

/// A weapon's conductivity: either a single multiplier or three lanes
/// (Low/Mid/High) the attacker picks from when spending mana. No other
/// shape is representable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Conductivity {
    Scalar(f64),
    Lanes([f64; 3]),
}

impl Conductivity {
    /// Broadcast to three lanes; a scalar `s` becomes `(s, s, s)`.
    pub fn lanes(self) -> [f64; 3] {
        match self {
            Conductivity::Scalar(s) => [s, s, s],
            Conductivity::Lanes(l) => l,
        }
    }

    fn add(self, other: Conductivity) -> Conductivity {
        match (self, other) {
            (Conductivity::Scalar(a), Conductivity::Scalar(b)) => Conductivity::Scalar(a + b),
            (a, b) => {
                let (a, b) = (a.lanes(), b.lanes());
                Conductivity::Lanes([a[0] + b[0], a[1] + b[1], a[2] + b[2]])
            }
        }
    }

    /// Element-wise subtraction; collapses back to a scalar when all
    /// three lanes come out equal.
    fn sub(self, other: Conductivity) -> Conductivity {
        match (self, other) {
            (Conductivity::Scalar(a), Conductivity::Scalar(b)) => Conductivity::Scalar(a - b),
            (a, b) => {
                let (a, b) = (a.lanes(), b.lanes());
                let out = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
                if out[0] == out[1] && out[1] == out[2] {
                    Conductivity::Scalar(out[0])
                } else {
                    Conductivity::Lanes(out)
                }
            }
        }
    }
}

/// A free-text attribute that may hold one value or several
/// (damage types, homebrew "Other" notes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tags {
    One(String),
    Many(Vec<String>),
}

/// Numeric and attribute state for one combatant or item. Every field is
/// individually optional: `None` means "not applicable", which is distinct
/// from zero. Field names in the serialized form match the sheet
/// vocabulary (PHY, ACC_mod, ...). Unknown fields in stored JSON are
/// dropped at deserialization, which is the modifier engine's
/// ignore-and-continue branch made explicit in the data model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    // Core base stats
    #[serde(rename = "PHY", skip_serializing_if = "Option::is_none")]
    pub phy: Option<i64>,
    #[serde(rename = "FIN", skip_serializing_if = "Option::is_none")]
    pub fin: Option<i64>,
    #[serde(rename = "COM", skip_serializing_if = "Option::is_none")]
    pub com: Option<i64>,
    #[serde(rename = "MGK", skip_serializing_if = "Option::is_none")]
    pub mgk: Option<i64>,

    // Mana substats; by convention CAP+OPT+RR = MGK+3 (advisory only)
    #[serde(rename = "CAP", skip_serializing_if = "Option::is_none")]
    pub cap: Option<i64>,
    #[serde(rename = "OPT", skip_serializing_if = "Option::is_none")]
    pub opt: Option<i64>,
    #[serde(rename = "RR", skip_serializing_if = "Option::is_none")]
    pub rr: Option<i64>,

    // Derived stats; recomputed for combatants, never authored directly
    #[serde(rename = "HP", skip_serializing_if = "Option::is_none")]
    pub hp: Option<f64>,
    #[serde(rename = "MMAX", skip_serializing_if = "Option::is_none")]
    pub mmax: Option<i64>,
    #[serde(rename = "CHN", skip_serializing_if = "Option::is_none")]
    pub chn: Option<i64>,
    #[serde(rename = "REG", skip_serializing_if = "Option::is_none")]
    pub reg: Option<i64>,

    // Combat-only; usually computed per-resolution
    #[serde(rename = "ACC", skip_serializing_if = "Option::is_none")]
    pub acc: Option<i64>,
    #[serde(rename = "EVA", skip_serializing_if = "Option::is_none")]
    pub eva: Option<i64>,

    // Equipment attributes
    #[serde(rename = "PHY_mod", skip_serializing_if = "Option::is_none")]
    pub phy_mod: Option<i64>,
    #[serde(rename = "ACC_mod", skip_serializing_if = "Option::is_none")]
    pub acc_mod: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reach: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conductivity: Option<Conductivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_type: Option<Tags>,
    #[serde(rename = "ATKM", skip_serializing_if = "Option::is_none")]
    pub atkm: Option<i64>,

    // Resource pools; floored at 0 on decrease, never auto-clamped on increase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hp_current: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mana_current: Option<f64>,

    // Homebrew stats not otherwise modeled
    #[serde(rename = "Other", skip_serializing_if = "Option::is_none")]
    pub other: Option<Tags>,
}

fn apply_int(cur: &mut Option<i64>, delta: Option<i64>) {
    if let Some(d) = delta {
        *cur = Some(match *cur {
            Some(c) => c + d,
            None => d,
        });
    }
}

fn remove_int(cur: &mut Option<i64>, delta: Option<i64>) {
    if let Some(d) = delta
        && let Some(c) = *cur
    {
        *cur = Some(c - d);
    }
}

fn apply_float(cur: &mut Option<f64>, delta: Option<f64>) {
    if let Some(d) = delta {
        *cur = Some(match *cur {
            Some(c) => c + d,
            None => d,
        });
    }
}

fn remove_float(cur: &mut Option<f64>, delta: Option<f64>) {
    if let Some(d) = delta
        && let Some(c) = *cur
    {
        *cur = Some(c - d);
    }
}

// Free text has no additive meaning: the delta overwrites on apply and
// clears on remove. Kept exactly as the permissive fallback policy.
fn apply_text(cur: &mut Option<String>, delta: &Option<String>) {
    if delta.is_some() {
        *cur = delta.clone();
    }
}

fn remove_text(cur: &mut Option<String>, delta: &Option<String>) {
    if delta.is_some() {
        *cur = None;
    }
}

fn apply_cond(cur: &mut Option<Conductivity>, delta: Option<Conductivity>) {
    if let Some(d) = delta {
        *cur = Some(match *cur {
            Some(c) => c.add(d),
            None => d,
        });
    }
}

fn remove_cond(cur: &mut Option<Conductivity>, delta: Option<Conductivity>) {
    if let Some(d) = delta
        && let Some(c) = *cur
    {
        *cur = Some(c.sub(d));
    }
}

fn apply_tags(cur: &mut Option<Tags>, delta: &Option<Tags>) {
    let Some(d) = delta else { return };
    *cur = Some(match (cur.take(), d) {
        (Some(Tags::Many(mut have)), Tags::Many(add)) => {
            have.extend(add.iter().cloned());
            Tags::Many(have)
        }
        // Single values and shape mismatches fall back to overwrite.
        (_, d) => d.clone(),
    });
}

fn remove_tags(cur: &mut Option<Tags>, delta: &Option<Tags>) {
    let Some(d) = delta else { return };
    match (cur.take(), d) {
        // Nothing to subtract from.
        (None, _) => {}
        (Some(Tags::Many(mut have)), Tags::Many(take)) => {
            // One matching occurrence per delta item; absent items are not an error.
            for item in take {
                if let Some(pos) = have.iter().position(|t| t == item) {
                    have.remove(pos);
                }
            }
            *cur = Some(Tags::Many(have));
        }
        // Shape mismatch clears the field.
        (Some(_), _) => {}
    }
}

impl StatBlock {
    /// Add `delta` into this block, field by field. Absent delta fields
    /// are no-ops; an unset field adopts the delta as its value.
    pub fn apply_modifier(&mut self, delta: &StatBlock) {
        apply_int(&mut self.phy, delta.phy);
        apply_int(&mut self.fin, delta.fin);
        apply_int(&mut self.com, delta.com);
        apply_int(&mut self.mgk, delta.mgk);
        apply_int(&mut self.cap, delta.cap);
        apply_int(&mut self.opt, delta.opt);
        apply_int(&mut self.rr, delta.rr);
        apply_float(&mut self.hp, delta.hp);
        apply_int(&mut self.mmax, delta.mmax);
        apply_int(&mut self.chn, delta.chn);
        apply_int(&mut self.reg, delta.reg);
        apply_int(&mut self.acc, delta.acc);
        apply_int(&mut self.eva, delta.eva);
        apply_int(&mut self.phy_mod, delta.phy_mod);
        apply_int(&mut self.acc_mod, delta.acc_mod);
        apply_int(&mut self.reach, delta.reach);
        apply_text(&mut self.weight, &delta.weight);
        apply_cond(&mut self.conductivity, delta.conductivity);
        apply_int(&mut self.control, delta.control);
        apply_tags(&mut self.damage_type, &delta.damage_type);
        apply_int(&mut self.atkm, delta.atkm);
        apply_float(&mut self.hp_current, delta.hp_current);
        apply_float(&mut self.mana_current, delta.mana_current);
        apply_tags(&mut self.other, &delta.other);
    }

    /// Inverse of [`apply_modifier`] for numeric fields; mismatched
    /// shapes clear to `None` and removing from an unset field is a no-op.
    ///
    /// [`apply_modifier`]: StatBlock::apply_modifier
    pub fn remove_modifier(&mut self, delta: &StatBlock) {
        remove_int(&mut self.phy, delta.phy);
        remove_int(&mut self.fin, delta.fin);
        remove_int(&mut self.com, delta.com);
        remove_int(&mut self.mgk, delta.mgk);
        remove_int(&mut self.cap, delta.cap);
        remove_int(&mut self.opt, delta.opt);
        remove_int(&mut self.rr, delta.rr);
        remove_float(&mut self.hp, delta.hp);
        remove_int(&mut self.mmax, delta.mmax);
        remove_int(&mut self.chn, delta.chn);
        remove_int(&mut self.reg, delta.reg);
        remove_int(&mut self.acc, delta.acc);
        remove_int(&mut self.eva, delta.eva);
        remove_int(&mut self.phy_mod, delta.phy_mod);
        remove_int(&mut self.acc_mod, delta.acc_mod);
        remove_int(&mut self.reach, delta.reach);
        remove_text(&mut self.weight, &delta.weight);
        remove_cond(&mut self.conductivity, delta.conductivity);
        remove_int(&mut self.control, delta.control);
        remove_tags(&mut self.damage_type, &delta.damage_type);
        remove_int(&mut self.atkm, delta.atkm);
        remove_float(&mut self.hp_current, delta.hp_current);
        remove_float(&mut self.mana_current, delta.mana_current);
        remove_tags(&mut self.other, &delta.other);
    }

    /// CAP+OPT+RR is expected to equal MGK+3. Violations are worth a
    /// warning during authoring but are never rejected.
    pub fn mana_substat_imbalance(&self) -> Option<(i64, i64)> {
        let sum = self.cap.unwrap_or(0) + self.opt.unwrap_or(0) + self.rr.unwrap_or(0);
        let expected = self.mgk.unwrap_or(0) + 3;
        if sum != expected { Some((sum, expected)) } else { None }
    }
}
