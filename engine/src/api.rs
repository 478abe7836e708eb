//! Orchestration over the store: load both sides, snapshot, resolve,
//! and commit damage once a final number is known. Reports carry
//! human-readable log lines alongside the structured outcome.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::character::{Character, EquippedGear, Item, ItemSlot, ACCESSORY_SLOTS};
use crate::combat::{self, AttackInput, AttackOutcome, Combatant, CounterInput, CounterOutcome, Side};
use crate::store::{EntityType, Store};
use crate::Dice;

#[derive(Debug, Clone, Default)]
pub struct AttackConfig {
    pub attacker: String,
    pub target: String,
    pub input: AttackInput,
    /// Apply the resolved damage to the target's pool and persist it.
    pub commit_damage: bool,
    /// Fixed seed for reproducible rolls; entropy otherwise.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttackReport {
    pub outcome: AttackOutcome,
    pub log: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CounterConfig {
    pub attacker: String,
    pub target: String,
    pub input: AttackInput,
    pub counter: CounterInput,
    pub commit_damage: bool,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CounterReport {
    pub outcome: CounterOutcome,
    pub log: Vec<String>,
}

fn dice_for(seed: Option<u64>) -> Dice {
    match seed {
        Some(seed) => Dice::from_seed(seed),
        None => Dice::from_entropy(),
    }
}

fn locate(store: &mut Store, name: &str) -> Result<(EntityType, String)> {
    store
        .find_character(name)?
        .ok_or_else(|| anyhow!("no player or enemy named '{name}'"))
}

fn snapshot(store: &mut Store, ty: EntityType, name: &str) -> Result<Combatant> {
    let character = store
        .character(ty, name)?
        .ok_or_else(|| anyhow!("'{name}' vanished from the store"))?;
    Ok(Combatant::snapshot(character))
}

/// Commit `damage` to one character's HP pool and mark it dirty.
/// Returns whether the target died.
fn commit_damage(store: &mut Store, ty: EntityType, name: &str, damage: i64) -> Result<bool> {
    let character = store
        .character(ty, name)?
        .ok_or_else(|| anyhow!("'{name}' vanished from the store"))?;
    let out = character.apply_damage(damage as f64);
    store.mark_dirty(ty, name);
    info!(character = name, damage, after = out.after, "damage committed");
    Ok(out.dead)
}

/// Resolve a standard attack between two named combatants.
pub fn attack(store: &mut Store, cfg: &AttackConfig) -> Result<AttackReport> {
    let (atk_ty, atk_name) = locate(store, &cfg.attacker)?;
    let (dfn_ty, dfn_name) = locate(store, &cfg.target)?;
    let attacker = snapshot(store, atk_ty, &atk_name)?;
    let defender = snapshot(store, dfn_ty, &dfn_name)?;

    let mut dice = dice_for(cfg.seed);
    let mut outcome = combat::resolve_attack(&mut dice, &attacker, &defender, &cfg.input);

    let mut log = Vec::new();
    if outcome.hit {
        log.push(format!(
            "{} hit {} and deals {} damage (ACC roll: {})",
            atk_name, dfn_name, outcome.damage, outcome.roll
        ));
        log.push(format!(
            "damage potential: ({:.3} / {:.3})",
            outcome.scaling, outcome.scaling_at_14
        ));
    } else {
        log.push(format!(
            "{} missed {} (ACC roll: {})",
            atk_name, dfn_name, outcome.roll
        ));
        log.push(format!("miss index: {:.3}", outcome.miss_index));
    }
    log.push(format!("environmental damage (raw): {:.2}", outcome.environmental));

    if cfg.commit_damage && outcome.hit && outcome.damage > 0 {
        outcome.target_died = commit_damage(store, dfn_ty, &dfn_name, outcome.damage)?;
        if outcome.target_died {
            log.push(format!("{dfn_name} should be dead"));
        }
    }

    Ok(AttackReport { outcome, log })
}

/// Resolve a counter opportunity between two named combatants.
pub fn counter(store: &mut Store, cfg: &CounterConfig) -> Result<CounterReport> {
    let (atk_ty, atk_name) = locate(store, &cfg.attacker)?;
    let (dfn_ty, dfn_name) = locate(store, &cfg.target)?;
    let attacker = snapshot(store, atk_ty, &atk_name)?;
    let defender = snapshot(store, dfn_ty, &dfn_name)?;

    let mut dice = dice_for(cfg.seed);
    let mut outcome =
        combat::resolve_counter(&mut dice, &attacker, &defender, &cfg.input, &cfg.counter);

    let mut log = Vec::new();
    match (outcome.success, outcome.strike.as_mut()) {
        (true, Some(strike)) => {
            log.push(format!(
                "{} countered {}'s attack and deals {} damage (ACC roll: {}, COM roll: {})",
                dfn_name, atk_name, strike.damage, outcome.roll, outcome.com_roll
            ));
            log.push(format!("environmental damage (raw): {:.2}", strike.environmental));
        }
        (true, None) => {
            log.push(format!("{dfn_name} countered {atk_name} successfully"));
        }
        (false, strike) => {
            let damage = strike.as_ref().map_or(0, |s| s.damage);
            log.push(format!(
                "{} failed to counter {}'s attack and takes {} damage (ACC roll: {}, COM roll: {})",
                dfn_name, atk_name, damage, outcome.roll, outcome.com_roll
            ));
            log.push(format!("fail index: {:.3}", outcome.fail_index));
            if let Some(strike) = strike {
                log.push(format!("environmental damage (raw): {:.2}", strike.environmental));
            }
        }
    }

    let strike_damage = outcome.strike.as_ref().map_or(0, |s| s.damage);
    if cfg.commit_damage
        && strike_damage > 0
        && let Some(struck) = outcome.struck
    {
        let (ty, name) = match struck {
            Side::Attacker => (atk_ty, atk_name.as_str()),
            Side::Defender => (dfn_ty, dfn_name.as_str()),
        };
        let died = commit_damage(store, ty, name, strike_damage)?;
        if let Some(strike) = outcome.strike.as_mut() {
            strike.target_died = died;
        }
        if died {
            log.push(format!("{name} should be dead"));
        }
    }

    Ok(CounterReport { outcome, log })
}

/// Gather whatever a character currently has equipped, cloned out of the
/// store so the character can be mutated afterwards.
fn equipped_items(store: &mut Store, character: &Character) -> Result<EquippedItems> {
    let mut gear = EquippedItems::default();
    if let Some(name) = &character.weapon {
        gear.weapon = store.item(EntityType::Weapon, name)?.cloned();
    }
    if let Some(name) = &character.outfit {
        gear.outfit = store.item(EntityType::Outfit, name)?.cloned();
    }
    for (slot, entry) in character.accessories.iter().enumerate() {
        if let Some(name) = entry {
            gear.accessories[slot] = store.item(EntityType::Accessory, name)?.cloned();
        }
    }
    Ok(gear)
}

#[derive(Debug, Clone, Default)]
struct EquippedItems {
    weapon: Option<Item>,
    outfit: Option<Item>,
    accessories: [Option<Item>; ACCESSORY_SLOTS],
}

impl EquippedItems {
    fn as_gear(&self) -> EquippedGear<'_> {
        let mut accessories: [Option<&Item>; ACCESSORY_SLOTS] = Default::default();
        for (slot, item) in self.accessories.iter().enumerate() {
            accessories[slot] = item.as_ref();
        }
        EquippedGear {
            weapon: self.weapon.as_ref(),
            outfit: self.outfit.as_ref(),
            accessories,
        }
    }
}

/// Recompute a character's derived stats and reapply their equipment.
pub fn refresh(store: &mut Store, name: &str) -> Result<String> {
    let (ty, key) = locate(store, name)?;
    let character = store
        .character(ty, &key)?
        .ok_or_else(|| anyhow!("'{key}' vanished from the store"))?
        .clone();
    let items = equipped_items(store, &character)?;

    let character = store
        .character(ty, &key)?
        .ok_or_else(|| anyhow!("'{key}' vanished from the store"))?;
    character.refresh(items.as_gear());
    let line = character.summary();
    store.mark_dirty(ty, &key);
    Ok(line)
}

/// Refill resource pools for one character, or for everyone when `name`
/// is `None`. Returns the names rested.
pub fn rest(store: &mut Store, name: Option<&str>) -> Result<Vec<String>> {
    let mut rested = Vec::new();
    match name {
        Some(name) => {
            let (ty, key) = locate(store, name)?;
            let character = store
                .character(ty, &key)?
                .ok_or_else(|| anyhow!("'{key}' vanished from the store"))?;
            character.rest();
            store.mark_dirty(ty, &key);
            rested.push(key);
        }
        None => {
            for ty in [EntityType::Player, EntityType::Enemy] {
                for key in store.list(ty)? {
                    if let Some(character) = store.character(ty, &key)? {
                        character.rest();
                        store.mark_dirty(ty, &key);
                        rested.push(key);
                    }
                }
            }
        }
    }
    Ok(rested)
}

/// Deal raw damage to a named character. Returns the outcome plus a
/// display line.
pub fn damage(store: &mut Store, name: &str, amount: f64) -> Result<Vec<String>> {
    let (ty, key) = locate(store, name)?;
    let character = store
        .character(ty, &key)?
        .ok_or_else(|| anyhow!("'{key}' vanished from the store"))?;
    let out = character.apply_damage(amount);
    store.mark_dirty(ty, &key);
    let mut lines = vec![format!(
        "{} took {} damage. HP: {} -> {}",
        key, amount, out.before, out.after
    )];
    if out.dead {
        lines.push(format!("{key} should be dead"));
    }
    Ok(lines)
}

/// Heal a named character, capped at max HP.
pub fn heal(store: &mut Store, name: &str, amount: f64) -> Result<String> {
    let (ty, key) = locate(store, name)?;
    let character = store
        .character(ty, &key)?
        .ok_or_else(|| anyhow!("'{key}' vanished from the store"))?;
    let out = character.heal(amount);
    store.mark_dirty(ty, &key);
    Ok(format!(
        "{} healed {}. HP: {} -> {}",
        key, out.healed, out.before, out.after
    ))
}

/// Equip a stored item onto a character; `slot` only matters for
/// accessories.
pub fn equip(store: &mut Store, character: &str, item: &str, slot: Option<usize>) -> Result<String> {
    let (ty, key) = locate(store, character)?;

    let weapon = store.item(EntityType::Weapon, item)?.cloned();
    let outfit = store.item(EntityType::Outfit, item)?.cloned();
    let accessory = store.item(EntityType::Accessory, item)?.cloned();
    let found = weapon
        .or(outfit)
        .or(accessory)
        .ok_or_else(|| anyhow!("no item named '{item}'"))?;

    let target = store
        .character(ty, &key)?
        .ok_or_else(|| anyhow!("'{key}' vanished from the store"))?;
    let line = match found.slot {
        ItemSlot::Weapon => {
            target.equip_weapon(&found);
            format!("{} equips weapon {}", key, found.name)
        }
        ItemSlot::Outfit => {
            target.equip_outfit(&found);
            format!("{} equips outfit {}", key, found.name)
        }
        ItemSlot::Accessory => {
            let slot = slot.unwrap_or_else(|| {
                target.accessories.iter().position(|a| a.is_none()).unwrap_or(0)
            });
            target
                .equip_accessory(slot, &found)
                .with_context(|| format!("cannot equip '{}'", found.name))?;
            format!("{} equips accessory {} in slot {}", key, found.name, slot)
        }
    };
    store.mark_dirty(ty, &key);
    Ok(line)
}

/// Remove whatever occupies one of a character's slots.
pub fn unequip(store: &mut Store, character: &str, slot: ItemSlot, index: Option<usize>) -> Result<String> {
    let (ty, key) = locate(store, character)?;
    let target = store
        .character(ty, &key)?
        .ok_or_else(|| anyhow!("'{key}' vanished from the store"))?
        .clone();

    let line = match slot {
        ItemSlot::Weapon => {
            let Some(name) = target.weapon.clone() else {
                return Ok(format!("{key} has no weapon equipped"));
            };
            let item = store
                .item(EntityType::Weapon, &name)?
                .cloned()
                .ok_or_else(|| anyhow!("equipped weapon '{name}' is missing from the store"))?;
            let target = store
                .character(ty, &key)?
                .ok_or_else(|| anyhow!("'{key}' vanished from the store"))?;
            target.unequip_weapon(&item);
            format!("{key} unequips {name}")
        }
        ItemSlot::Outfit => {
            let Some(name) = target.outfit.clone() else {
                return Ok(format!("{key} has no outfit equipped"));
            };
            let item = store
                .item(EntityType::Outfit, &name)?
                .cloned()
                .ok_or_else(|| anyhow!("equipped outfit '{name}' is missing from the store"))?;
            let target = store
                .character(ty, &key)?
                .ok_or_else(|| anyhow!("'{key}' vanished from the store"))?;
            target.unequip_outfit(&item);
            format!("{key} unequips {name}")
        }
        ItemSlot::Accessory => {
            let index = index.ok_or_else(|| anyhow!("accessory slot index required"))?;
            let entry = target
                .accessories
                .get(index)
                .ok_or_else(|| anyhow!("accessory slot {index} is out of range (0-3)"))?;
            let Some(name) = entry.clone() else {
                return Ok(format!("{key} has nothing in accessory slot {index}"));
            };
            let item = store
                .item(EntityType::Accessory, &name)?
                .cloned()
                .ok_or_else(|| anyhow!("equipped accessory '{name}' is missing from the store"))?;
            let target = store
                .character(ty, &key)?
                .ok_or_else(|| anyhow!("'{key}' vanished from the store"))?;
            target.unequip_accessory(index, &item)?;
            format!("{key} unequips {name} from slot {index}")
        }
    };
    store.mark_dirty(ty, &key);
    Ok(line)
}
