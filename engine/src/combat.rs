//! Attack and counter resolution. Pure over two combatant snapshots:
//! nothing in here mutates a stat block; committing damage is the
//! orchestration layer's job once the final number is known.

use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::stats::Conductivity;
use crate::{Dice, stat_modifier};

/// The `c` constant in the scaling formula.
pub const SCALING_CONSTANT: f64 = 3.5;

/// Conductivity lane picked when spending mana through a 3-lane weapon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    Low,
    #[default]
    Mid,
    High,
}

/// Which side of the original interaction a counter strike lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Attacker,
    Defender,
}

/// Immutable snapshot of one side of a resolution. Every optional
/// numeric on the stat block defaults to 0 here, so resolution never
/// fails on missing inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Combatant {
    pub name: String,
    pub level: i64,
    pub phy: i64,
    pub fin: i64,
    pub com: i64,
    pub atkm: i64,
    pub acc_mod: i64,
    pub reach: i64,
    pub conductivity: Option<Conductivity>,
}

impl Combatant {
    pub fn snapshot(character: &Character) -> Self {
        let stats = &character.stats;
        Self {
            name: character.name.clone(),
            level: character.level,
            phy: stats.phy.unwrap_or(0),
            fin: stats.fin.unwrap_or(0),
            com: stats.com.unwrap_or(0),
            atkm: stats.atkm.unwrap_or(0),
            acc_mod: stats.acc_mod.unwrap_or(0),
            reach: stats.reach.unwrap_or(0),
            conductivity: stats.conductivity,
        }
    }
}

/// Per-resolution inputs collected upstream. All numeric fields default
/// to 0 and a missing accuracy roll means "roll a d20".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttackInput {
    /// Whether the attacker's PHY contributes to damage.
    pub physical_component: bool,
    pub mana_spent: f64,
    pub lane: Lane,
    /// Conductivity used when the attacker's stats carry none (defaults to 1).
    pub conductivity_override: Option<f64>,
    pub extra_atkm: f64,
    pub extra_phy: f64,
    pub extra_reach: f64,
    pub distance: f64,
    pub accuracy_roll: Option<f64>,
    /// Additional multipliers stacked onto the hit scaling.
    pub extra_scalings: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CounterInput {
    /// Defender's COM roll; missing means "roll a d20".
    pub com_roll: Option<f64>,
    /// Whether the defender strikes back on success (declining grants +5
    /// to the counter check instead).
    pub counterattack: bool,
}

/// Outcome of one standard attack (or of the strike embedded in a
/// counter). `target_died` is filled in by whoever commits the damage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttackOutcome {
    pub hit: bool,
    pub roll: f64,
    pub accuracy: f64,
    pub evasion: f64,
    pub scaling: f64,
    /// Same scaling computed with a fixed roll of 14, for tuning display.
    pub scaling_at_14: f64,
    pub damage: i64,
    /// Collateral output, reported hit or miss.
    pub environmental: f64,
    /// accuracy - evasion; how close a miss was.
    pub miss_index: f64,
    pub target_died: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CounterOutcome {
    pub success: bool,
    /// The inbound attack's ACC roll.
    pub roll: f64,
    /// The defender's COM roll.
    pub com_roll: f64,
    pub enemy_accuracy: f64,
    pub counter_check: f64,
    /// enemy accuracy - counter check; meaningful on failure.
    pub fail_index: f64,
    /// The strike that resolves the exchange: the defender's point-blank
    /// counterattack on success, or the attack landing on the failed
    /// defender. `None` for a clean parry.
    pub strike: Option<AttackOutcome>,
    pub struck: Option<Side>,
}

pub fn accuracy(attacker: &Combatant, roll: f64, input: &AttackInput) -> f64 {
    let atkm = (attacker.atkm + attacker.acc_mod) as f64 + input.extra_atkm;
    let reach = attacker.reach as f64 + input.extra_reach;
    let penalty = (input.distance - reach).max(0.0) / 10.0;
    stat_modifier(attacker.fin) as f64 + roll + atkm - penalty
}

pub fn evasion(attacker: &Combatant, defender: &Combatant) -> f64 {
    5.0 + stat_modifier(defender.fin) as f64 + (defender.level - attacker.level) as f64
}

pub fn scaling(acc: f64, eva: f64) -> f64 {
    ((acc - eva).max(0.0) + SCALING_CONSTANT) / 20.0
}

/// Conductivity multiplier for this resolution: zero without mana, the
/// chosen lane of a 3-lane value, a scalar as-is, or the override
/// (default 1) when the attacker has none.
fn resolved_conductivity(attacker: &Combatant, input: &AttackInput) -> f64 {
    if input.mana_spent <= 0.0 {
        return 0.0;
    }
    match attacker.conductivity {
        Some(Conductivity::Lanes(lanes)) => lanes[input.lane as usize],
        Some(Conductivity::Scalar(s)) => s,
        None => input.conductivity_override.unwrap_or(1.0),
    }
}

fn effective_phy(attacker: &Combatant, input: &AttackInput) -> f64 {
    if input.physical_component {
        attacker.phy as f64 + input.extra_phy
    } else {
        0.0
    }
}

fn environmental(eff_phy: f64, eff_opt: f64) -> f64 {
    1.5 * eff_phy + 3.0 * eff_opt
}

fn damage_from(eff_phy: f64, eff_opt: f64, sc: f64, extra_scalings: &[f64]) -> i64 {
    let base = 2.5 * eff_phy + 2.0 * eff_opt;
    let mult = extra_scalings.iter().product::<f64>() * sc;
    ((base * mult).round() as i64).max(0)
}

/// One attack bundle at a given roll/distance/evasion. Shared between
/// the standard path and both counter branches. A `forced` strike has
/// no accuracy check: it lands at the floor of the scaling curve even
/// when accuracy falls below the (clamped) evasion.
fn bundle(
    attacker: &Combatant,
    roll: f64,
    distance: f64,
    eva: f64,
    cond_used: f64,
    input: &AttackInput,
    forced: bool,
) -> AttackOutcome {
    let mut at = input.clone();
    at.distance = distance;
    let acc = accuracy(attacker, roll, &at);

    let eff_phy = effective_phy(attacker, input);
    let eff_opt = input.mana_spent * cond_used;
    let env = environmental(eff_phy, eff_opt);

    if !forced && acc <= eva {
        // A tie is a miss.
        return AttackOutcome {
            hit: false,
            roll,
            accuracy: acc,
            evasion: eva,
            scaling: 0.0,
            scaling_at_14: 0.0,
            damage: 0,
            environmental: env,
            miss_index: acc - eva,
            target_died: false,
        };
    }

    let sc = scaling(acc, eva);
    let acc14 = accuracy(attacker, 14.0, &at);
    let sc14 = scaling(acc14, eva);

    AttackOutcome {
        hit: true,
        roll,
        accuracy: acc,
        evasion: eva,
        scaling: sc,
        scaling_at_14: sc14,
        damage: damage_from(eff_phy, eff_opt, sc, &input.extra_scalings),
        environmental: env,
        miss_index: acc - eva,
        target_died: false,
    }
}

/// Resolve a standard attack between two snapshots.
pub fn resolve_attack(
    dice: &mut Dice,
    attacker: &Combatant,
    defender: &Combatant,
    input: &AttackInput,
) -> AttackOutcome {
    let roll = input.accuracy_roll.unwrap_or_else(|| dice.d20() as f64);
    let eva = evasion(attacker, defender);
    let cond_used = resolved_conductivity(attacker, input);
    bundle(attacker, roll, input.distance, eva, cond_used, input, false)
}

/// Resolve a counter opportunity: the defender contests the inbound
/// attack with a COM check and either parries, strikes back at point
/// blank with a fixed roll of 20, or eats the hit with evasion clamped
/// to zero.
pub fn resolve_counter(
    dice: &mut Dice,
    attacker: &Combatant,
    defender: &Combatant,
    input: &AttackInput,
    counter: &CounterInput,
) -> CounterOutcome {
    let roll = input.accuracy_roll.unwrap_or_else(|| dice.d20() as f64);
    let com_roll = counter.com_roll.unwrap_or_else(|| dice.d20() as f64);

    let enemy_accuracy = accuracy(attacker, roll, input);
    let block_bonus = if counter.counterattack { 0.0 } else { 5.0 };
    let counter_check = com_roll + stat_modifier(defender.com) as f64 + block_bonus;
    let fail_index = enemy_accuracy - counter_check;

    // Conductivity is resolved once for the inbound attack and reused by
    // the riposte bundle.
    let cond_used = resolved_conductivity(attacker, input);

    if counter_check > enemy_accuracy {
        if counter.counterattack {
            // Guaranteed-opening strike: natural 20 at point blank.
            let eva = evasion(defender, attacker);
            let strike = bundle(defender, 20.0, 0.0, eva, cond_used, input, false);
            return CounterOutcome {
                success: true,
                roll,
                com_roll,
                enemy_accuracy,
                counter_check,
                fail_index,
                strike: Some(strike),
                struck: Some(Side::Attacker),
            };
        }
        // Clean parry; nothing lands.
        return CounterOutcome {
            success: true,
            roll,
            com_roll,
            enemy_accuracy,
            counter_check,
            fail_index,
            strike: None,
            struck: None,
        };
    }

    // A failed counter cannot benefit from positive evasion, and the
    // strike is not contested again: it lands regardless of accuracy.
    let fail_eva = (stat_modifier(defender.fin) as f64 + (defender.level - attacker.level) as f64)
        .min(0.0);
    let strike = bundle(attacker, roll, input.distance, fail_eva, cond_used, input, true);
    CounterOutcome {
        success: false,
        roll,
        com_roll,
        enemy_accuracy,
        counter_check,
        fail_index,
        strike: Some(strike),
        struck: Some(Side::Defender),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fighter(name: &str, fin: i64, level: i64) -> Combatant {
        Combatant {
            name: name.into(),
            level,
            phy: 10,
            fin,
            com: 10,
            ..Default::default()
        }
    }

    #[test]
    fn textbook_hit_scenario() {
        // FIN 14 (mod +2), roll 10, no modifiers, point blank.
        let attacker = fighter("A", 14, 3);
        let defender = fighter("D", 10, 3);
        let mut dice = Dice::from_seed(0);
        let input = AttackInput {
            physical_component: true,
            accuracy_roll: Some(10.0),
            ..Default::default()
        };
        let out = resolve_attack(&mut dice, &attacker, &defender, &input);
        assert!(out.hit);
        assert_eq!(out.accuracy, 12.0);
        assert_eq!(out.evasion, 5.0);
        assert_eq!(out.scaling, 0.525);
        // base 2.5 * 10 = 25, damage round(25 * 0.525) = 13
        assert_eq!(out.damage, 13);
        assert_eq!(out.environmental, 15.0);
    }

    #[test]
    fn tie_is_a_miss() {
        let attacker = fighter("A", 10, 1);
        let defender = fighter("D", 10, 1);
        let mut dice = Dice::from_seed(0);
        // ACC = 0 + 5 + 0 = 5 vs EVA = 5.
        let input = AttackInput { accuracy_roll: Some(5.0), ..Default::default() };
        let out = resolve_attack(&mut dice, &attacker, &defender, &input);
        assert!(!out.hit);
        assert_eq!(out.accuracy, out.evasion);
        assert_eq!(out.miss_index, 0.0);
        assert_eq!(out.damage, 0);
    }

    #[test]
    fn miss_still_reports_environmental_damage() {
        let attacker = fighter("A", 10, 1);
        let defender = fighter("D", 18, 1);
        let mut dice = Dice::from_seed(0);
        let input = AttackInput {
            physical_component: true,
            mana_spent: 4.0,
            conductivity_override: Some(2.0),
            accuracy_roll: Some(1.0),
            ..Default::default()
        };
        let out = resolve_attack(&mut dice, &attacker, &defender, &input);
        assert!(!out.hit);
        // 1.5 * 10 + 3.0 * (4 * 2)
        assert_eq!(out.environmental, 39.0);
        assert!(out.miss_index < 0.0);
    }

    #[test]
    fn distance_beyond_reach_penalizes_accuracy() {
        let attacker = fighter("A", 10, 1);
        let input = AttackInput { distance: 25.0, ..Default::default() };
        // reach 0: penalty (25 - 0)/10 = 2.5
        assert_eq!(accuracy(&attacker, 10.0, &input), 7.5);

        let mut armed = attacker.clone();
        armed.reach = 5;
        assert_eq!(accuracy(&armed, 10.0, &input), 8.0);

        // Inside reach there is no penalty and no bonus.
        let close = AttackInput { distance: 3.0, ..Default::default() };
        assert_eq!(accuracy(&armed, 10.0, &close), 10.0);
    }

    #[test]
    fn lane_selection_drives_magical_damage() {
        let mut attacker = fighter("A", 14, 1);
        attacker.conductivity = Some(Conductivity::Lanes([0.5, 1.0, 2.0]));
        let defender = fighter("D", 10, 1);
        let mut dice = Dice::from_seed(0);
        let input = AttackInput {
            mana_spent: 10.0,
            lane: Lane::High,
            accuracy_roll: Some(10.0),
            ..Default::default()
        };
        let out = resolve_attack(&mut dice, &attacker, &defender, &input);
        // eff OPT = 10 * 2.0, base = 2.0 * 20 = 40, sc = (7 + 3.5)/20
        assert_eq!(out.damage, (40.0f64 * 0.525).round() as i64);

        let low = AttackInput { lane: Lane::Low, ..input };
        let out_low = resolve_attack(&mut dice, &attacker, &defender, &low);
        assert_eq!(out_low.damage, (10.0f64 * 0.525).round() as i64);
    }

    #[test]
    fn extra_scalings_multiply_through() {
        let attacker = fighter("A", 14, 1);
        let defender = fighter("D", 10, 1);
        let mut dice = Dice::from_seed(0);
        let input = AttackInput {
            physical_component: true,
            accuracy_roll: Some(10.0),
            extra_scalings: vec![2.0, 0.5],
            ..Default::default()
        };
        let out = resolve_attack(&mut dice, &attacker, &defender, &input);
        // Multipliers cancel: same as the bare scenario.
        assert_eq!(out.damage, 13);
    }

    #[test]
    fn reference_scaling_uses_a_fixed_fourteen() {
        let attacker = fighter("A", 14, 3);
        let defender = fighter("D", 10, 3);
        let mut dice = Dice::from_seed(0);
        let input = AttackInput {
            physical_component: true,
            accuracy_roll: Some(18.0),
            ..Default::default()
        };
        let out = resolve_attack(&mut dice, &attacker, &defender, &input);
        // roll 14: ACC 16 vs EVA 5 -> (11 + 3.5)/20
        assert_eq!(out.scaling_at_14, 0.725);
    }

    #[test]
    fn missing_roll_takes_a_d20() {
        let attacker = fighter("A", 14, 1);
        let defender = fighter("D", 10, 1);
        let input = AttackInput::default();
        let mut a = Dice::from_seed(11);
        let mut b = Dice::from_seed(11);
        let out = resolve_attack(&mut a, &attacker, &defender, &input);
        assert_eq!(out.roll, b.d20() as f64);
    }

    #[test]
    fn successful_counterattack_strikes_back_at_point_blank() {
        let attacker = fighter("A", 10, 1);
        let mut defender = fighter("D", 10, 1);
        defender.com = 18; // +4
        let mut dice = Dice::from_seed(0);
        let input = AttackInput {
            physical_component: true,
            accuracy_roll: Some(5.0),
            distance: 12.0,
            ..Default::default()
        };
        let counter = CounterInput { com_roll: Some(10.0), counterattack: true };
        let out = resolve_counter(&mut dice, &attacker, &defender, &input, &counter);
        // enemy ACC = 0 + 5 - 1.2 = 3.8; check = 10 + 4 = 14
        assert!(out.success);
        assert_eq!(out.struck, Some(Side::Attacker));
        let strike = out.strike.unwrap();
        assert_eq!(strike.roll, 20.0);
        assert!(strike.hit);
        // Point blank: the original 12m distance does not penalize the riposte.
        assert_eq!(strike.accuracy, 20.0);
    }

    #[test]
    fn declining_to_counterattack_adds_five_and_parries() {
        let attacker = fighter("A", 10, 1);
        let defender = fighter("D", 10, 1);
        let mut dice = Dice::from_seed(0);
        let input = AttackInput { accuracy_roll: Some(9.0), ..Default::default() };
        // check = 5 + 0 + 5 = 10 > ACC 9
        let counter = CounterInput { com_roll: Some(5.0), counterattack: false };
        let out = resolve_counter(&mut dice, &attacker, &defender, &input, &counter);
        assert!(out.success);
        assert!(out.strike.is_none());
        assert!(out.struck.is_none());

        // Opting to strike forfeits the +5: the same rolls now fail.
        let eager = CounterInput { com_roll: Some(5.0), counterattack: true };
        let out = resolve_counter(&mut dice, &attacker, &defender, &input, &eager);
        assert!(!out.success);
    }

    #[test]
    fn failed_counter_evasion_never_goes_positive() {
        let attacker = fighter("A", 10, 1);
        // FIN 16 (mod +3) and five levels up: raw evasion would be +8.
        let mut defender = fighter("D", 16, 6);
        defender.com = 2;
        let mut dice = Dice::from_seed(0);
        let input = AttackInput {
            physical_component: true,
            accuracy_roll: Some(18.0),
            ..Default::default()
        };
        let counter = CounterInput { com_roll: Some(1.0), counterattack: true };
        let out = resolve_counter(&mut dice, &attacker, &defender, &input, &counter);
        assert!(!out.success);
        assert_eq!(out.struck, Some(Side::Defender));
        let strike = out.strike.unwrap();
        assert_eq!(strike.evasion, 0.0);
        // sc from ACC 18 vs 0: (18 + 3.5)/20, damage round(25 * 1.075)
        assert_eq!(strike.damage, 27);
    }

    #[test]
    fn failed_counter_still_lands_with_negative_accuracy() {
        let mut attacker = fighter("A", 0, 1);
        attacker.phy = 20;
        let mut defender = fighter("D", 10, 1);
        defender.com = 0;
        let mut dice = Dice::from_seed(0);
        // FIN 0 (mod -5), roll 1: enemy ACC = -4. check = 1 - 5 = -4.
        let input = AttackInput {
            physical_component: true,
            accuracy_roll: Some(1.0),
            ..Default::default()
        };
        let counter = CounterInput { com_roll: Some(1.0), counterattack: true };
        let out = resolve_counter(&mut dice, &attacker, &defender, &input, &counter);
        assert!(!out.success);
        assert_eq!(out.struck, Some(Side::Defender));
        let strike = out.strike.unwrap();
        // Scaling floors at 3.5/20 when ACC sits below the clamped EVA.
        assert_eq!(strike.scaling, 0.175);
        // base 2.5 * 20 = 50, damage round(50 * 0.175) = 9
        assert_eq!(strike.damage, 9);
    }

    #[test]
    fn resolution_is_pure_over_snapshots() {
        let attacker = fighter("A", 14, 2);
        let defender = fighter("D", 12, 2);
        let input = AttackInput {
            physical_component: true,
            accuracy_roll: Some(13.0),
            ..Default::default()
        };
        let mut d1 = Dice::from_seed(5);
        let mut d2 = Dice::from_seed(5);
        let a = resolve_attack(&mut d1, &attacker, &defender, &input);
        let b = resolve_attack(&mut d2, &attacker, &defender, &input);
        assert_eq!(a, b);
    }
}
