use engine::api::{self, AttackConfig, CounterConfig};
use engine::character::{Character, CharacterKind, EnemyDetails, Item, ItemSlot};
use engine::combat::{AttackInput, CounterInput, Side};
use engine::stats::StatBlock;
use engine::store::{EntityType, Store};
use tempfile::tempdir;

fn seeded_store(dir: &std::path::Path) -> Store {
    let mut store = Store::open(dir).unwrap();
    let ana = Character::new(
        "Ana",
        4,
        CharacterKind::Player,
        StatBlock {
            phy: Some(12),
            fin: Some(14),
            com: Some(10),
            mgk: Some(7),
            cap: Some(4),
            opt: Some(3),
            rr: Some(3),
            ..Default::default()
        },
    );
    let grix = Character::new(
        "Grix",
        4,
        CharacterKind::Enemy(EnemyDetails {
            species: "Goblin".into(),
            faction: "Red Claw".into(),
            ..Default::default()
        }),
        StatBlock {
            phy: Some(8),
            fin: Some(10),
            com: Some(10),
            mgk: Some(6),
            cap: Some(3),
            opt: Some(3),
            rr: Some(3),
            ..Default::default()
        },
    );
    store.put_character(EntityType::Player, ana).unwrap();
    store.put_character(EntityType::Enemy, grix).unwrap();
    store.commit().unwrap();
    store
}

#[test]
fn committed_attack_lands_and_persists() {
    let dir = tempdir().unwrap();
    let mut store = seeded_store(dir.path());

    let cfg = AttackConfig {
        attacker: "Ana".into(),
        target: "grix".into(),
        input: AttackInput {
            physical_component: true,
            accuracy_roll: Some(15.0),
            ..Default::default()
        },
        commit_damage: true,
        seed: Some(1),
    };
    let report = api::attack(&mut store, &cfg).unwrap();

    // FIN mod +2, roll 15 vs EVA 5: sc (12 + 3.5)/20, damage round(30 * 0.775).
    assert!(report.outcome.hit);
    assert_eq!(report.outcome.damage, 23);
    assert!(!report.outcome.target_died);
    assert_eq!(report.log[0], "Ana hit Grix and deals 23 damage (ACC roll: 15)");
    assert_eq!(report.log[1], "damage potential: (0.775 / 0.725)");
    assert_eq!(report.log[2], "environmental damage (raw): 18.00");

    store.commit().unwrap();
    let mut reopened = Store::open(dir.path()).unwrap();
    let grix = reopened.character(EntityType::Enemy, "Grix").unwrap().unwrap();
    // Base HP 107.5 minus the 23 that landed.
    assert_eq!(grix.stats.hp_current, Some(84.5));
}

#[test]
fn uncommitted_attack_leaves_the_target_untouched() {
    let dir = tempdir().unwrap();
    let mut store = seeded_store(dir.path());

    let cfg = AttackConfig {
        attacker: "Ana".into(),
        target: "Grix".into(),
        input: AttackInput {
            physical_component: true,
            accuracy_roll: Some(15.0),
            ..Default::default()
        },
        commit_damage: false,
        seed: Some(1),
    };
    let report = api::attack(&mut store, &cfg).unwrap();
    assert_eq!(report.outcome.damage, 23);
    assert_eq!(store.dirty_count(), 0);

    let grix = store.character(EntityType::Enemy, "Grix").unwrap().unwrap();
    assert_eq!(grix.stats.hp_current, Some(107.5));
}

#[test]
fn declined_counter_parries_cleanly() {
    let dir = tempdir().unwrap();
    let mut store = seeded_store(dir.path());

    let cfg = CounterConfig {
        attacker: "Ana".into(),
        target: "Grix".into(),
        input: AttackInput {
            physical_component: true,
            accuracy_roll: Some(3.0),
            ..Default::default()
        },
        counter: CounterInput { com_roll: Some(19.0), counterattack: false },
        commit_damage: true,
        seed: Some(1),
    };
    let report = api::counter(&mut store, &cfg).unwrap();
    assert!(report.outcome.success);
    assert!(report.outcome.strike.is_none());
    assert_eq!(report.log[0], "Grix countered Ana successfully");
    assert_eq!(store.dirty_count(), 0);
}

#[test]
fn successful_counterattack_strikes_the_attacker() {
    let dir = tempdir().unwrap();
    let mut store = seeded_store(dir.path());

    let cfg = CounterConfig {
        attacker: "Ana".into(),
        target: "Grix".into(),
        input: AttackInput {
            physical_component: true,
            accuracy_roll: Some(3.0),
            ..Default::default()
        },
        counter: CounterInput { com_roll: Some(19.0), counterattack: true },
        commit_damage: true,
        seed: Some(1),
    };
    let report = api::counter(&mut store, &cfg).unwrap();
    assert!(report.outcome.success);
    assert_eq!(report.outcome.struck, Some(Side::Attacker));
    let strike = report.outcome.strike.unwrap();
    // Natural 20 at point blank vs EVA 7: sc (13 + 3.5)/20, round(20 * 0.825).
    assert_eq!(strike.roll, 20.0);
    assert_eq!(strike.damage, 17);

    let ana = store.character(EntityType::Player, "Ana").unwrap().unwrap();
    assert_eq!(ana.stats.hp_current, Some(113.0));
}

#[test]
fn failed_counter_reports_both_rolls() {
    let dir = tempdir().unwrap();
    let mut store = seeded_store(dir.path());

    let cfg = CounterConfig {
        attacker: "Ana".into(),
        target: "Grix".into(),
        input: AttackInput {
            physical_component: true,
            accuracy_roll: Some(10.0),
            ..Default::default()
        },
        counter: CounterInput { com_roll: Some(5.0), counterattack: true },
        commit_damage: true,
        seed: Some(1),
    };
    let report = api::counter(&mut store, &cfg).unwrap();
    assert!(!report.outcome.success);
    assert_eq!(report.outcome.struck, Some(Side::Defender));
    // ACC 12 vs clamped EVA 0: sc (12 + 3.5)/20, round(30 * 0.775).
    assert_eq!(
        report.log[0],
        "Grix failed to counter Ana's attack and takes 23 damage (ACC roll: 10, COM roll: 5)"
    );

    let grix = store.character(EntityType::Enemy, "Grix").unwrap().unwrap();
    assert_eq!(grix.stats.hp_current, Some(84.5));
}

#[test]
fn rest_without_a_name_refills_everyone() {
    let dir = tempdir().unwrap();
    let mut store = seeded_store(dir.path());
    api::damage(&mut store, "Ana", 30.0).unwrap();
    api::damage(&mut store, "Grix", 30.0).unwrap();

    let mut rested = api::rest(&mut store, None).unwrap();
    rested.sort();
    assert_eq!(rested, vec!["Ana".to_string(), "Grix".to_string()]);
    let ana = store.character(EntityType::Player, "Ana").unwrap().unwrap();
    assert_eq!(ana.stats.hp_current, Some(130.0));
}

#[test]
fn heal_reports_the_clamped_amount() {
    let dir = tempdir().unwrap();
    let mut store = seeded_store(dir.path());
    api::damage(&mut store, "Ana", 20.0).unwrap();
    let line = api::heal(&mut store, "ana", 50.0).unwrap();
    assert_eq!(line, "Ana healed 20. HP: 110 -> 130");
}

#[test]
fn equip_refresh_and_unequip_round_trip_through_the_store() {
    let dir = tempdir().unwrap();
    let mut store = seeded_store(dir.path());
    store
        .put_item(
            EntityType::Weapon,
            Item::weapon("Storm Blade", StatBlock { atkm: Some(3), ..Default::default() }),
        )
        .unwrap();
    store.commit().unwrap();

    let line = api::equip(&mut store, "Ana", "storm blade", None).unwrap();
    assert_eq!(line, "Ana equips weapon Storm Blade");
    {
        let ana = store.character(EntityType::Player, "Ana").unwrap().unwrap();
        assert_eq!(ana.stats.atkm, Some(3));
    }

    // Refresh keeps the weapon delta in place.
    api::refresh(&mut store, "Ana").unwrap();
    {
        let ana = store.character(EntityType::Player, "Ana").unwrap().unwrap();
        assert_eq!(ana.stats.atkm, Some(3));
    }

    let line = api::unequip(&mut store, "Ana", ItemSlot::Weapon, None).unwrap();
    assert_eq!(line, "Ana unequips Storm Blade");
    let ana = store.character(EntityType::Player, "Ana").unwrap().unwrap();
    assert_eq!(ana.stats.atkm, Some(0));
    assert_eq!(ana.weapon, None);
}

#[test]
fn unknown_names_error_before_any_roll() {
    let dir = tempdir().unwrap();
    let mut store = seeded_store(dir.path());
    let cfg = AttackConfig {
        attacker: "Ana".into(),
        target: "Nobody".into(),
        ..Default::default()
    };
    assert!(api::attack(&mut store, &cfg).is_err());
}
