use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use engine::api::{self, AttackConfig, CounterConfig};
use engine::character::{Character, CharacterKind, EnemyDetails, Item, ItemSlot};
use engine::combat::{AttackInput, CounterInput, Lane};
use engine::stats::{Conductivity, StatBlock, Tags};
use engine::store::{EntityType, Store};
use engine::tiers::{parse_tier_value, Stat};
use engine::{compute_derived, Dice};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, ValueEnum)]
enum StatCol {
    Phy,
    Fin,
    Com,
    Mgk,
    Cap,
    Opt,
    Rr,
}

impl From<StatCol> for Stat {
    fn from(s: StatCol) -> Self {
        match s {
            StatCol::Phy => Stat::Phy,
            StatCol::Fin => Stat::Fin,
            StatCol::Com => Stat::Com,
            StatCol::Mgk => Stat::Mgk,
            StatCol::Cap => Stat::Cap,
            StatCol::Opt => Stat::Opt,
            StatCol::Rr => Stat::Rr,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum LaneArg {
    Low,
    Mid,
    High,
}

impl From<LaneArg> for Lane {
    fn from(l: LaneArg) -> Self {
        match l {
            LaneArg::Low => Lane::Low,
            LaneArg::Mid => Lane::Mid,
            LaneArg::High => Lane::High,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum SlotArg {
    Weapon,
    Outfit,
    Accessory,
}

#[derive(Copy, Clone, ValueEnum)]
enum TypeArg {
    Players,
    Enemies,
    Weapons,
    Outfits,
    Accessories,
}

impl From<TypeArg> for EntityType {
    fn from(t: TypeArg) -> Self {
        match t {
            TypeArg::Players => EntityType::Player,
            TypeArg::Enemies => EntityType::Enemy,
            TypeArg::Weapons => EntityType::Weapon,
            TypeArg::Outfits => EntityType::Outfit,
            TypeArg::Accessories => EntityType::Accessory,
        }
    }
}

/// Combat stat deltas shared by the item authoring commands.
#[derive(clap::Args, Default)]
struct ItemStatArgs {
    #[arg(long)]
    phy: Option<i64>,
    #[arg(long)]
    fin: Option<i64>,
    #[arg(long)]
    com: Option<i64>,
    #[arg(long)]
    acc: Option<i64>,
    #[arg(long)]
    eva: Option<i64>,
    #[arg(long)]
    phy_mod: Option<i64>,
    #[arg(long)]
    acc_mod: Option<i64>,
    #[arg(long)]
    atkm: Option<i64>,
    #[arg(long)]
    reach: Option<i64>,
    #[arg(long)]
    control: Option<i64>,
    #[arg(long)]
    weight: Option<String>,
    /// One value, or three comma-separated lane values (low,mid,high)
    #[arg(long)]
    conductivity: Option<String>,
    /// Comma-separated damage types
    #[arg(long)]
    damage_type: Option<String>,
    /// Comma-separated freeform tags
    #[arg(long)]
    other: Option<String>,
}

impl ItemStatArgs {
    fn into_stats(self) -> Result<StatBlock> {
        Ok(StatBlock {
            phy: self.phy,
            fin: self.fin,
            com: self.com,
            acc: self.acc,
            eva: self.eva,
            phy_mod: self.phy_mod,
            acc_mod: self.acc_mod,
            atkm: self.atkm,
            reach: self.reach,
            control: self.control,
            weight: self.weight,
            conductivity: self.conductivity.as_deref().map(parse_conductivity).transpose()?,
            damage_type: self.damage_type.as_deref().map(parse_tags),
            other: self.other.as_deref().map(parse_tags),
            ..Default::default()
        })
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Resolve a tier descriptor (e.g. "L+", "X", "17") to a stat value
    Tier {
        /// Column to resolve against
        #[arg(long, value_enum)]
        stat: StatCol,
        /// Tier token, alias, or bare number
        token: String,
        /// RNG seed for the blend tie-break
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Compute derived stats (MMAX/CHN/REG/HP) from base scores
    Derive {
        #[arg(long, default_value_t = 0)]
        phy: i64,
        #[arg(long, default_value_t = 0)]
        cap: i64,
        #[arg(long, default_value_t = 0)]
        opt: i64,
        #[arg(long, default_value_t = 0)]
        rr: i64,
        #[arg(long, default_value_t = 1)]
        level: i64,
    },
    /// Create a player from tier descriptors (or bare numbers)
    MakePlayer {
        name: String,
        #[arg(long, default_value_t = 1)]
        level: i64,
        #[arg(long)]
        phy: String,
        #[arg(long)]
        fin: String,
        #[arg(long)]
        com: String,
        /// Defaults to CAP + OPT + RR - 3 when omitted
        #[arg(long)]
        mgk: Option<String>,
        #[arg(long)]
        cap: String,
        #[arg(long)]
        opt: String,
        #[arg(long)]
        rr: String,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Create an enemy from tier descriptors plus descriptive fields
    MakeEnemy {
        name: String,
        #[arg(long, default_value_t = 1)]
        level: i64,
        #[arg(long)]
        phy: String,
        #[arg(long)]
        fin: String,
        #[arg(long)]
        com: String,
        /// Defaults to CAP + OPT + RR - 3 when omitted
        #[arg(long)]
        mgk: Option<String>,
        #[arg(long)]
        cap: String,
        #[arg(long)]
        opt: String,
        #[arg(long)]
        rr: String,
        #[arg(long)]
        species: String,
        #[arg(long)]
        faction: String,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        age: Option<i64>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Create a weapon (reach defaults to 1)
    MakeWeapon {
        name: String,
        #[arg(long)]
        item_type: Option<String>,
        #[arg(long)]
        rarity: Option<String>,
        #[command(flatten)]
        stats: ItemStatArgs,
    },
    /// Create an outfit
    MakeOutfit {
        name: String,
        #[arg(long)]
        item_type: Option<String>,
        #[arg(long)]
        rarity: Option<String>,
        #[command(flatten)]
        stats: ItemStatArgs,
    },
    /// Create an accessory
    MakeAccessory {
        name: String,
        #[arg(long)]
        item_type: Option<String>,
        #[arg(long)]
        rarity: Option<String>,
        #[command(flatten)]
        stats: ItemStatArgs,
    },
    /// Equip a stored item onto a character
    Equip {
        character: String,
        item: String,
        /// Accessory slot (0-3); first free slot when omitted
        #[arg(long)]
        slot: Option<usize>,
    },
    /// Remove whatever occupies one of a character's slots
    Unequip {
        character: String,
        #[arg(long, value_enum)]
        slot: SlotArg,
        /// Accessory slot index (0-3)
        #[arg(long)]
        index: Option<usize>,
    },
    /// Recompute derived stats and reapply equipment
    Refresh { name: String },
    /// Resolve an attack between two characters
    Attack {
        attacker: String,
        target: String,
        /// Mana spent on the attack
        #[arg(long, default_value_t = 0.0)]
        mana: f64,
        #[arg(long, value_enum, default_value_t = LaneArg::Mid)]
        lane: LaneArg,
        /// Suppress the attacker's physical component
        #[arg(long)]
        no_physical: bool,
        /// Conductivity used when the attacker carries none
        #[arg(long)]
        conductivity: Option<f64>,
        #[arg(long, default_value_t = 0.0)]
        extra_atkm: f64,
        #[arg(long, default_value_t = 0.0)]
        extra_phy: f64,
        #[arg(long, default_value_t = 0.0)]
        extra_reach: f64,
        #[arg(long, default_value_t = 0.0)]
        distance: f64,
        /// Fixed accuracy roll instead of a d20
        #[arg(long)]
        roll: Option<f64>,
        /// Comma-separated extra damage multipliers
        #[arg(long)]
        scalings: Option<String>,
        /// Apply the resolved damage to the target and persist it
        #[arg(long)]
        commit: bool,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Resolve a counter opportunity against an incoming attack
    Counter {
        attacker: String,
        target: String,
        #[arg(long, default_value_t = 0.0)]
        mana: f64,
        #[arg(long, value_enum, default_value_t = LaneArg::Mid)]
        lane: LaneArg,
        #[arg(long)]
        no_physical: bool,
        #[arg(long)]
        conductivity: Option<f64>,
        #[arg(long, default_value_t = 0.0)]
        extra_atkm: f64,
        #[arg(long, default_value_t = 0.0)]
        extra_phy: f64,
        #[arg(long, default_value_t = 0.0)]
        extra_reach: f64,
        #[arg(long, default_value_t = 0.0)]
        distance: f64,
        #[arg(long)]
        roll: Option<f64>,
        #[arg(long)]
        scalings: Option<String>,
        /// Defender's COM roll instead of a d20
        #[arg(long)]
        com_roll: Option<f64>,
        /// Parry without striking back (+5 to the counter check)
        #[arg(long)]
        decline: bool,
        #[arg(long)]
        commit: bool,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Deal raw damage to a character
    Damage {
        name: String,
        amount: f64,
    },
    /// Heal a character (capped at max HP)
    Heal {
        name: String,
        amount: f64,
    },
    /// Refill resource pools for one character, or everyone
    Rest { name: Option<String> },
    /// Print a character sheet, or an item description
    Show {
        name: String,
        /// Emit the stored record as pretty JSON instead
        #[arg(long)]
        json: bool,
    },
    /// List stored entities of one type
    List {
        #[arg(value_enum)]
        ty: TypeArg,
    },
    /// Roll a d20 multiple times
    Roll {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 5)]
        rolls: u32,
    },
}

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Combat tracker: characters, gear, tiers, and attack resolution")]
struct Cli {
    /// Directory holding the JSON entity store
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,
    #[command(subcommand)]
    cmd: Cmd,
}

fn dice_for(seed: Option<u64>) -> Dice {
    match seed {
        Some(seed) => Dice::from_seed(seed),
        None => Dice::from_entropy(),
    }
}

fn parse_scalings(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().with_context(|| format!("bad scaling '{s}'")))
        .collect()
}

fn parse_conductivity(raw: &str) -> Result<Conductivity> {
    let values: Vec<f64> = raw
        .split(',')
        .map(str::trim)
        .map(|s| s.parse::<f64>().with_context(|| format!("bad conductivity '{s}'")))
        .collect::<Result<_>>()?;
    match values[..] {
        [v] => Ok(Conductivity::Scalar(v)),
        [low, mid, high] => Ok(Conductivity::Lanes([low, mid, high])),
        _ => bail!("conductivity takes one value or three (low,mid,high)"),
    }
}

fn parse_tags(raw: &str) -> Tags {
    let values: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    match values.len() {
        1 => Tags::One(values.into_iter().next().unwrap_or_default()),
        _ => Tags::Many(values),
    }
}

/// Resolve the seven base-score descriptors shared by the make commands.
#[allow(clippy::too_many_arguments)]
fn base_scores(
    dice: &mut Dice,
    phy: &str,
    fin: &str,
    com: &str,
    mgk: Option<&str>,
    cap: &str,
    opt: &str,
    rr: &str,
) -> Result<StatBlock> {
    let resolve = |dice: &mut Dice, token: &str, stat: Stat| -> Result<i64> {
        parse_tier_value(token, stat, dice)
            .with_context(|| format!("cannot resolve descriptor '{token}'"))
    };
    let cap_v = resolve(dice, cap, Stat::Cap)?;
    let opt_v = resolve(dice, opt, Stat::Opt)?;
    let rr_v = resolve(dice, rr, Stat::Rr)?;
    let mgk_v = match mgk {
        Some(token) => resolve(dice, token, Stat::Mgk)?,
        None => cap_v + opt_v + rr_v - 3,
    };
    Ok(StatBlock {
        phy: Some(resolve(dice, phy, Stat::Phy)?),
        fin: Some(resolve(dice, fin, Stat::Fin)?),
        com: Some(resolve(dice, com, Stat::Com)?),
        mgk: Some(mgk_v),
        cap: Some(cap_v),
        opt: Some(opt_v),
        rr: Some(rr_v),
        ..Default::default()
    })
}

fn attack_input(
    mana: f64,
    lane: LaneArg,
    no_physical: bool,
    conductivity: Option<f64>,
    extra_atkm: f64,
    extra_phy: f64,
    extra_reach: f64,
    distance: f64,
    roll: Option<f64>,
    scalings: Option<&str>,
) -> Result<AttackInput> {
    Ok(AttackInput {
        physical_component: !no_physical,
        mana_spent: mana,
        lane: lane.into(),
        conductivity_override: conductivity,
        extra_atkm,
        extra_phy,
        extra_reach,
        distance,
        accuracy_roll: roll,
        extra_scalings: scalings.map(parse_scalings).transpose()?.unwrap_or_default(),
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Tier { stat, token, seed } => {
            let mut dice = dice_for(seed);
            let value = parse_tier_value(&token, stat.into(), &mut dice)?;
            println!("{value}");
        }
        Cmd::Derive { phy, cap, opt, rr, level } => {
            let d = compute_derived(phy, cap, opt, rr, level);
            println!("MMAX={} CHN={} REG={} HP={}", d.mmax, d.chn, d.reg, d.hp);
        }
        Cmd::MakePlayer { name, level, phy, fin, com, mgk, cap, opt, rr, seed } => {
            let mut store = Store::open(&cli.data_dir)?;
            let mut dice = dice_for(seed);
            let stats =
                base_scores(&mut dice, &phy, &fin, &com, mgk.as_deref(), &cap, &opt, &rr)?;
            if let Some((pool, cost)) = stats.mana_substat_imbalance() {
                eprintln!("warning: CAP+OPT+RR = {pool} but MGK+3 = {cost}");
            }
            let player = Character::new(&name, level, CharacterKind::Player, stats);
            println!("{}", player.summary());
            store.put_character(EntityType::Player, player)?;
            store.commit()?;
        }
        Cmd::MakeEnemy {
            name,
            level,
            phy,
            fin,
            com,
            mgk,
            cap,
            opt,
            rr,
            species,
            faction,
            gender,
            age,
            position,
            note,
            seed,
        } => {
            let mut store = Store::open(&cli.data_dir)?;
            let mut dice = dice_for(seed);
            let stats =
                base_scores(&mut dice, &phy, &fin, &com, mgk.as_deref(), &cap, &opt, &rr)?;
            let details = EnemyDetails { species, faction, gender, age, position, note };
            let enemy = Character::new(&name, level, CharacterKind::Enemy(details), stats);
            println!("{}", enemy.summary());
            store.put_character(EntityType::Enemy, enemy)?;
            store.commit()?;
        }
        Cmd::MakeWeapon { name, item_type, rarity, stats } => {
            let mut item = Item::weapon(&name, stats.into_stats()?);
            item.item_type = item_type;
            item.rarity = rarity;
            println!("{}", item.describe());
            let mut store = Store::open(&cli.data_dir)?;
            store.put_item(EntityType::Weapon, item)?;
            store.commit()?;
        }
        Cmd::MakeOutfit { name, item_type, rarity, stats } => {
            let mut item = Item::new(&name, ItemSlot::Outfit, stats.into_stats()?);
            item.item_type = item_type;
            item.rarity = rarity;
            println!("{}", item.describe());
            let mut store = Store::open(&cli.data_dir)?;
            store.put_item(EntityType::Outfit, item)?;
            store.commit()?;
        }
        Cmd::MakeAccessory { name, item_type, rarity, stats } => {
            let mut item = Item::new(&name, ItemSlot::Accessory, stats.into_stats()?);
            item.item_type = item_type;
            item.rarity = rarity;
            println!("{}", item.describe());
            let mut store = Store::open(&cli.data_dir)?;
            store.put_item(EntityType::Accessory, item)?;
            store.commit()?;
        }
        Cmd::Equip { character, item, slot } => {
            let mut store = Store::open(&cli.data_dir)?;
            println!("{}", api::equip(&mut store, &character, &item, slot)?);
            store.commit()?;
        }
        Cmd::Unequip { character, slot, index } => {
            let mut store = Store::open(&cli.data_dir)?;
            let slot = match slot {
                SlotArg::Weapon => ItemSlot::Weapon,
                SlotArg::Outfit => ItemSlot::Outfit,
                SlotArg::Accessory => ItemSlot::Accessory,
            };
            println!("{}", api::unequip(&mut store, &character, slot, index)?);
            store.commit()?;
        }
        Cmd::Refresh { name } => {
            let mut store = Store::open(&cli.data_dir)?;
            println!("{}", api::refresh(&mut store, &name)?);
            store.commit()?;
        }
        Cmd::Attack {
            attacker,
            target,
            mana,
            lane,
            no_physical,
            conductivity,
            extra_atkm,
            extra_phy,
            extra_reach,
            distance,
            roll,
            scalings,
            commit,
            seed,
        } => {
            let mut store = Store::open(&cli.data_dir)?;
            let cfg = AttackConfig {
                attacker,
                target,
                input: attack_input(
                    mana,
                    lane,
                    no_physical,
                    conductivity,
                    extra_atkm,
                    extra_phy,
                    extra_reach,
                    distance,
                    roll,
                    scalings.as_deref(),
                )?,
                commit_damage: commit,
                seed,
            };
            let report = api::attack(&mut store, &cfg)?;
            for line in &report.log {
                println!("{line}");
            }
            if commit {
                store.commit()?;
            }
        }
        Cmd::Counter {
            attacker,
            target,
            mana,
            lane,
            no_physical,
            conductivity,
            extra_atkm,
            extra_phy,
            extra_reach,
            distance,
            roll,
            scalings,
            com_roll,
            decline,
            commit,
            seed,
        } => {
            let mut store = Store::open(&cli.data_dir)?;
            let cfg = CounterConfig {
                attacker,
                target,
                input: attack_input(
                    mana,
                    lane,
                    no_physical,
                    conductivity,
                    extra_atkm,
                    extra_phy,
                    extra_reach,
                    distance,
                    roll,
                    scalings.as_deref(),
                )?,
                counter: CounterInput { com_roll, counterattack: !decline },
                commit_damage: commit,
                seed,
            };
            let report = api::counter(&mut store, &cfg)?;
            for line in &report.log {
                println!("{line}");
            }
            if commit {
                store.commit()?;
            }
        }
        Cmd::Damage { name, amount } => {
            let mut store = Store::open(&cli.data_dir)?;
            for line in api::damage(&mut store, &name, amount)? {
                println!("{line}");
            }
            store.commit()?;
        }
        Cmd::Heal { name, amount } => {
            let mut store = Store::open(&cli.data_dir)?;
            println!("{}", api::heal(&mut store, &name, amount)?);
            store.commit()?;
        }
        Cmd::Rest { name } => {
            let mut store = Store::open(&cli.data_dir)?;
            for name in api::rest(&mut store, name.as_deref())? {
                println!("{name} rested");
            }
            store.commit()?;
        }
        Cmd::Show { name, json } => {
            let mut store = Store::open(&cli.data_dir)?;
            if let Some((ty, key)) = store.find_character(&name)? {
                let character = store
                    .character(ty, &key)?
                    .ok_or_else(|| anyhow!("'{key}' vanished from the store"))?;
                if json {
                    println!("{}", serde_json::to_string_pretty(character)?);
                } else {
                    println!("{}", character.sheet());
                }
            } else {
                let mut found = false;
                for ty in [EntityType::Weapon, EntityType::Outfit, EntityType::Accessory] {
                    if let Some(item) = store.item(ty, &name)? {
                        if json {
                            println!("{}", serde_json::to_string_pretty(item)?);
                        } else {
                            println!("{}", item.describe());
                        }
                        found = true;
                        break;
                    }
                }
                if !found {
                    bail!("nothing named '{name}' in the store");
                }
            }
        }
        Cmd::List { ty } => {
            let store = Store::open(&cli.data_dir)?;
            for name in store.list(ty.into())? {
                println!("{name}");
            }
        }
        Cmd::Roll { seed, rolls } => {
            let mut dice = Dice::from_seed(seed);
            for _ in 0..rolls {
                println!("{}", dice.d20());
            }
        }
    }
    Ok(())
}
