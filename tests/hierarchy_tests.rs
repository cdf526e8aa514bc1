//! Integration tests for [`pbrrn::Brh`] (spec §4.8, §8 property 7, S4).

mod support;

use pbrrn::hierarchy::BrhLevelOptions;
use pbrrn::{Brh, PbrrnOptions};

fn level(width: u32, height: u32, bits: u32) -> BrhLevelOptions {
    BrhLevelOptions {
        pbrrn: PbrrnOptions { width, height, ..PbrrnOptions::default() },
        parent_input_bits: bits,
        parent_output_bits: bits,
    }
}

fn try_brh(levels: &[BrhLevelOptions]) -> Option<Brh> {
    match Brh::new(levels) {
        Ok(brh) => Some(brh),
        Err(pbrrn::PbrrnError::AdapterRequestFailed | pbrrn::PbrrnError::DeviceCreateFailed(_)) => {
            eprintln!("pbrrn: skipping test, no GPU adapter available in this environment");
            None
        }
        Err(e) => panic!("unexpected construction error: {e}"),
    }
}

#[test]
fn rejects_strips_too_wide_for_their_model() {
    let levels = [level(8, 8, 0), level(8, 8, 5)];
    assert!(Brh::new(&levels).is_err());
}

/// Spec §8 S4: the child-to-parent push lands in the parent's input
/// column the same round it was computed (the "previous step" language
/// describes when the *root's own pass* next consults it, one round
/// later — not a lag in this readback, which is a direct memory copy).
#[test]
fn child_output_strip_lands_on_parent_input_column() {
    let levels = [level(8, 8, 2), level(8, 8, 2)];
    let Some(mut brh) = try_brh(&levels) else { return };

    for _ in 0..3 {
        brh.step(0.4).unwrap();

        let mut child_output = vec![0u8; 4 * 1 * 4];
        brh.child(0).unwrap().get_states(2, 7, 4, 1, &mut child_output).unwrap();

        let mut parent_input = vec![0u8; 1 * 4 * 4];
        brh.root().get_states(0, 0, 1, 4, &mut parent_input).unwrap();

        assert_eq!(
            child_output, parent_input,
            "child 0's bottom-edge strip should be copied verbatim into the parent's left-edge column"
        );
    }
}

#[test]
fn favoured_child_always_gets_reward_one() {
    let levels = [level(8, 8, 2), level(8, 8, 2)];
    let Some(mut brh) = try_brh(&levels) else { return };

    for _ in 0..5 {
        brh.step(0.3).unwrap();
    }
    // No direct reward readback exists; this is a smoke test that the
    // whole tree steps without error across several rounds.
    assert!(brh.child(0).is_some());
    assert!(brh.child(1).is_some());
}
