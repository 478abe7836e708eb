//! Combatants (players and enemies) and the equipment that modifies them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::derived::compute_derived;
use crate::stats::StatBlock;

pub const ACCESSORY_SLOTS: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EquipError {
    #[error("accessory slot {0} is out of range (0-3)")]
    SlotOutOfRange(usize),
}

/// Descriptive fields enemies carry beyond the shared combat profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnemyDetails {
    pub species: String,
    pub faction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Players and enemies share one combat profile; an enemy is not a
/// subtype of a player, just a character with extra descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CharacterKind {
    Player,
    Enemy(EnemyDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub level: i64,
    #[serde(flatten)]
    pub kind: CharacterKind,
    pub stats: StatBlock,
    /// Equipment slots hold names resolved through the store; the
    /// character owns only its own stats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outfit: Option<String>,
    #[serde(default)]
    pub accessories: [Option<String>; ACCESSORY_SLOTS],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DamageOutcome {
    pub before: f64,
    pub after: f64,
    pub dead: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealOutcome {
    pub before: f64,
    pub after: f64,
    pub healed: f64,
}

/// Borrowed view of whatever is currently equipped, for `refresh`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EquippedGear<'a> {
    pub weapon: Option<&'a Item>,
    pub outfit: Option<&'a Item>,
    pub accessories: [Option<&'a Item>; ACCESSORY_SLOTS],
}

impl Character {
    /// Build a character from authored base stats and compute the rest.
    pub fn new(name: impl Into<String>, level: i64, kind: CharacterKind, stats: StatBlock) -> Self {
        let mut character = Self {
            name: name.into(),
            level,
            kind,
            stats,
            weapon: None,
            outfit: None,
            accessories: Default::default(),
        };
        character.recompute_derived();
        character
    }

    pub fn is_enemy(&self) -> bool {
        matches!(self.kind, CharacterKind::Enemy(_))
    }

    /// Recompute MMAX/CHN/REG/HP from base stats and level, then fill the
    /// resource pools to the new maxima.
    pub fn recompute_derived(&mut self) {
        let d = compute_derived(
            self.stats.phy.unwrap_or(0),
            self.stats.cap.unwrap_or(0),
            self.stats.opt.unwrap_or(0),
            self.stats.rr.unwrap_or(0),
            self.level,
        );
        self.stats.mmax = Some(d.mmax);
        self.stats.chn = Some(d.chn);
        self.stats.reg = Some(d.reg);
        self.stats.hp = Some(d.hp);
        self.stats.hp_current = Some(d.hp);
        self.stats.mana_current = Some(d.mmax as f64);
    }

    pub fn equip_weapon(&mut self, item: &Item) {
        self.weapon = Some(item.name.clone());
        self.stats.apply_modifier(&item.stats);
    }

    pub fn unequip_weapon(&mut self, item: &Item) {
        if self.weapon.take().is_some() {
            self.stats.remove_modifier(&item.stats);
        }
    }

    pub fn equip_outfit(&mut self, item: &Item) {
        self.outfit = Some(item.name.clone());
        self.stats.apply_modifier(&item.stats);
    }

    pub fn unequip_outfit(&mut self, item: &Item) {
        if self.outfit.take().is_some() {
            self.stats.remove_modifier(&item.stats);
        }
    }

    pub fn equip_accessory(&mut self, slot: usize, item: &Item) -> Result<(), EquipError> {
        if slot >= ACCESSORY_SLOTS {
            return Err(EquipError::SlotOutOfRange(slot));
        }
        self.accessories[slot] = Some(item.name.clone());
        self.stats.apply_modifier(&item.stats);
        Ok(())
    }

    pub fn unequip_accessory(&mut self, slot: usize, item: &Item) -> Result<(), EquipError> {
        if slot >= ACCESSORY_SLOTS {
            return Err(EquipError::SlotOutOfRange(slot));
        }
        if self.accessories[slot].take().is_some() {
            self.stats.remove_modifier(&item.stats);
        }
        Ok(())
    }

    /// Arbitrary buff/debuff straight onto the stats.
    pub fn apply_effect(&mut self, delta: &StatBlock) {
        self.stats.apply_modifier(delta);
    }

    /// Strip the equipped deltas, recompute derived stats from the
    /// now-unmodified base, reset the pools, then reapply equipment in
    /// the fixed order weapon, outfit, accessories 0-3.
    pub fn refresh(&mut self, gear: EquippedGear<'_>) {
        for item in gear.accessories.iter().rev().flatten() {
            self.stats.remove_modifier(&item.stats);
        }
        if let Some(item) = gear.outfit {
            self.stats.remove_modifier(&item.stats);
        }
        if let Some(item) = gear.weapon {
            self.stats.remove_modifier(&item.stats);
        }

        self.recompute_derived();

        if let Some(item) = gear.weapon {
            self.stats.apply_modifier(&item.stats);
        }
        if let Some(item) = gear.outfit {
            self.stats.apply_modifier(&item.stats);
        }
        for item in gear.accessories.iter().flatten() {
            self.stats.apply_modifier(&item.stats);
        }
    }

    /// Fill both resource pools back to their maxima.
    pub fn rest(&mut self) {
        self.stats.hp_current = self.stats.hp;
        self.stats.mana_current = Some(self.stats.mmax.unwrap_or(0) as f64);
    }

    /// Decrement the HP pool, floored at 0. Death is a reported fact, not
    /// an error.
    pub fn apply_damage(&mut self, amount: f64) -> DamageOutcome {
        let before = self.stats.hp_current.unwrap_or(0.0);
        let after = (before - amount).max(0.0);
        self.stats.hp_current = Some(after);
        DamageOutcome { before, after, dead: after <= 0.0 }
    }

    /// Raise the HP pool, capped at max HP.
    pub fn heal(&mut self, amount: f64) -> HealOutcome {
        let before = self.stats.hp_current.unwrap_or(0.0);
        let max = self.stats.hp.unwrap_or(before);
        let after = (before + amount).min(max).max(before);
        self.stats.hp_current = Some(after);
        HealOutcome { before, after, healed: after - before }
    }

    /// One-line roster entry.
    pub fn summary(&self) -> String {
        match &self.kind {
            CharacterKind::Player => format!(
                "{} (LV {}) | HP {}/{} | PHY {} | MMAX {} | CHN {} | REG {}",
                self.name,
                self.level,
                fmt_f64(self.stats.hp_current),
                fmt_f64(self.stats.hp),
                fmt_i64(self.stats.phy),
                fmt_i64(self.stats.mmax),
                fmt_i64(self.stats.chn),
                fmt_i64(self.stats.reg),
            ),
            CharacterKind::Enemy(details) => {
                let mut line = format!("LV {} {} of {}", self.level, details.species, details.faction);
                match &details.position {
                    Some(position) => line.push_str(&format!(", {} {}", position, self.name)),
                    None => line.push_str(&format!(", {}", self.name)),
                }
                if let Some(note) = &details.note {
                    line.push_str(&format!(": {note}"));
                }
                line
            }
        }
    }

    /// Full character sheet.
    pub fn sheet(&self) -> String {
        let mut lines = vec![
            format!("{} - Level {}", self.name, self.level),
            format!(
                "HP: {}/{} | PHY: {} | FIN: {} | COM: {} | MGK: {}",
                fmt_f64(self.stats.hp_current),
                fmt_f64(self.stats.hp),
                fmt_i64(self.stats.phy),
                fmt_i64(self.stats.fin),
                fmt_i64(self.stats.com),
                fmt_i64(self.stats.mgk),
            ),
            format!(
                "CAP: {} | OPT: {} | RR: {}",
                fmt_i64(self.stats.cap),
                fmt_i64(self.stats.opt),
                fmt_i64(self.stats.rr),
            ),
            format!(
                "MMAX: {} | CHN: {} | REG: {}",
                fmt_i64(self.stats.mmax),
                fmt_i64(self.stats.chn),
                fmt_i64(self.stats.reg),
            ),
        ];
        if let CharacterKind::Enemy(details) = &self.kind {
            lines.push(format!("Species: {} | Faction: {}", details.species, details.faction));
        }
        lines.push(format!("Weapon: {}", self.weapon.as_deref().unwrap_or("None")));
        lines.push(format!("Outfit: {}", self.outfit.as_deref().unwrap_or("None")));
        let accessories: Vec<&str> = self
            .accessories
            .iter()
            .map(|a| a.as_deref().unwrap_or("None"))
            .collect();
        lines.push(format!("Accessories: {}", accessories.join(", ")));
        lines.join("\n")
    }
}

fn fmt_i64(v: Option<i64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn fmt_f64(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| {
        if v.fract() == 0.0 { format!("{v:.0}") } else { format!("{v}") }
    })
}

/// Which kind of equipment slot an item occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSlot {
    Weapon,
    Outfit,
    Accessory,
}

/// A piece of equipment: its stats are the modifier delta applied on
/// equip and removed on unequip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub slot: ItemSlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    pub stats: StatBlock,
}

impl Item {
    pub fn new(name: impl Into<String>, slot: ItemSlot, stats: StatBlock) -> Self {
        Self { name: name.into(), slot, item_type: None, rarity: None, stats }
    }

    /// Weapons default to reach 1 when the author leaves it unset.
    pub fn weapon(name: impl Into<String>, mut stats: StatBlock) -> Self {
        stats.reach.get_or_insert(1);
        Self::new(name, ItemSlot::Weapon, stats)
    }

    pub fn describe(&self) -> String {
        let kind = self.item_type.as_deref().unwrap_or("item");
        let rarity = self.rarity.as_deref().unwrap_or("Common");
        format!("{} [{}] (Rarity: {})", self.name, kind, rarity)
    }
}
