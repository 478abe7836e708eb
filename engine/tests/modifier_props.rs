use engine::stats::{Conductivity, StatBlock, Tags};
use proptest::prelude::*;

proptest! {
    // Equip-then-unequip must restore every numeric field that was set.
    #[test]
    fn apply_then_remove_restores_set_integers(
        phy in -500i64..500,
        atkm in -500i64..500,
        d_phy in -500i64..500,
        d_atkm in -500i64..500,
    ) {
        let mut block = StatBlock { phy: Some(phy), atkm: Some(atkm), ..Default::default() };
        let delta = StatBlock { phy: Some(d_phy), atkm: Some(d_atkm), ..Default::default() };
        block.apply_modifier(&delta);
        block.remove_modifier(&delta);
        prop_assert_eq!(block.phy, Some(phy));
        prop_assert_eq!(block.atkm, Some(atkm));
    }

    // An unset field adopts the delta on apply and lands on zero after
    // remove, never back on None.
    #[test]
    fn adopted_fields_zero_out_instead_of_clearing(delta in -500i64..500) {
        let mut block = StatBlock::default();
        let d = StatBlock { reach: Some(delta), ..Default::default() };
        block.apply_modifier(&d);
        block.remove_modifier(&d);
        prop_assert_eq!(block.reach, Some(0));
    }

    // Scalar deltas against lane conductivity broadcast and invert.
    #[test]
    fn conductivity_apply_remove_round_trips(
        low in -8i32..8, mid in -8i32..8, high in -8i32..8, d in -8i32..8,
    ) {
        let lanes = [low as f64, mid as f64, high as f64];
        let mut block = StatBlock {
            conductivity: Some(Conductivity::Lanes(lanes)),
            ..Default::default()
        };
        let delta = StatBlock {
            conductivity: Some(Conductivity::Scalar(d as f64)),
            ..Default::default()
        };
        block.apply_modifier(&delta);
        block.remove_modifier(&delta);
        // Small integers add and subtract exactly in f64.
        let expect = if lanes[0] == lanes[1] && lanes[1] == lanes[2] {
            Conductivity::Scalar(lanes[0])
        } else {
            Conductivity::Lanes(lanes)
        };
        prop_assert_eq!(block.conductivity, Some(expect));
    }

    // Removing tags that were just added restores the original list. The
    // alphabet is disjoint from the fixed tags, so removal always targets
    // the appended copies.
    #[test]
    fn tag_lists_invert_exactly(extra in proptest::collection::vec("[x-z]{1,6}", 0..4)) {
        let original = vec!["slash".to_string(), "fire".to_string()];
        let mut block = StatBlock {
            damage_type: Some(Tags::Many(original.clone())),
            ..Default::default()
        };
        let delta = StatBlock {
            damage_type: Some(Tags::Many(extra)),
            ..Default::default()
        };
        block.apply_modifier(&delta);
        block.remove_modifier(&delta);
        prop_assert_eq!(block.damage_type, Some(Tags::Many(original)));
    }
}
