use atasim::beam::Beam;
use atasim::subarray::DriveState;
use atasim::*;
use std::sync::Arc;

fn new_dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(ArrayState::default()))
}

fn beam(name: &str) -> Beam {
    Beam::parse(name).expect("valid beam name")
}

#[test]
fn test_zfocus_requires_an_owning_beam() {
    let d = new_dispatcher();

    assert_eq!(
        d.dispatch("ZFOCUS ant1z 1222"),
        "WARNING: subarray not assigned to any beams: zfocus"
    );
    assert_eq!(d.dispatch("BF SET ANTS BEAMXA1 ant1z"), "OK");
    assert_eq!(d.dispatch("ZFOCUS ant1z 1222"), "OK");

    let status = d.state().subarrays.status(beam("BEAMXA1"));
    assert!((status.zfocus_freq_mhz - 1222.0).abs() < 1e-9);
}

#[test]
fn test_antgroup_set_and_list_primary() {
    let d = new_dispatcher();

    assert_eq!(d.dispatch("ANTGROUP SET PRIMARY 1a,1b,1c"), "OK");
    assert_eq!(d.dispatch("ANTGROUP LIST PRIMARY"), "PRIMARY: 1a,1b,1c");
}

#[test]
fn test_point_requires_an_owning_beam() {
    let d = new_dispatcher();

    assert_eq!(
        d.dispatch("POINT ant5e AZEL 100 5"),
        "WARNING: subarray not assigned to any beams: point"
    );
    assert_eq!(d.dispatch("BF SET ANTS BEAMYB2 ant5e"), "OK");
    assert_eq!(d.dispatch("POINT ant5e AZEL 100 5"), "OK");

    let target = d
        .state()
        .subarrays
        .with_model(beam("BEAMYB2"), |model| model.target());
    assert!((target.az_deg - 100.0).abs() < 1e-9);
    assert!((target.el_deg() - 5.0).abs() < 1e-9);
}

#[test]
fn test_cleared_beam_coords_report_uninit() {
    let d = new_dispatcher();

    assert_eq!(d.dispatch("BF SET COORDS BEAMYD4 J2000 1.5 20"), "OK");
    assert_eq!(d.dispatch("BF CLEAR COORDS BEAMYD4"), "OK");
    assert_eq!(
        d.dispatch("BF LIST COORDS BEAMYD4"),
        "BEAMYD4 UNINIT AZ .000000 deg EL .000000 deg RA .000000 hr DEC .000000 deg \
         GLONG .000000 deg GLAT .000000 deg "
    );
}

#[test]
fn test_obslen_round_trip() {
    let d = new_dispatcher();

    assert_eq!(d.dispatch("BF SET OBSLEN 220"), "OK");
    assert_eq!(d.dispatch("BF LIST OBSLEN"), "220");
}

#[test]
fn test_unrecognized_command() {
    let d = new_dispatcher();
    assert_eq!(d.dispatch("BADCOMMAND"), "ERROR: unrecognized command: BADCOMMAND");
}

#[test]
fn test_subarray_matching_is_a_subset_test() {
    let d = new_dispatcher();
    assert_eq!(d.dispatch("bf set ants beamxa1 1a,1b"), "OK");

    // Disjoint.
    assert_eq!(
        d.dispatch("wrap 1c,1d 2"),
        "WARNING: subarray not assigned to any beams: wrap"
    );
    // Overlapping, but the beam's 1a is missing.
    assert_eq!(
        d.dispatch("wrap 1b,1c 2"),
        "WARNING: subarray not assigned to any beams: wrap"
    );
    // Identical, in a different order and spelling.
    assert_eq!(d.dispatch("wrap ANT1B,ant1a 2"), "OK");
    // A wider list still addresses the narrower subarray.
    assert_eq!(d.dispatch("wrap 1a,1b,1c,1d 3"), "OK");

    assert_eq!(d.state().subarrays.status(beam("BEAMXA1")).wrap, 3);
}

#[test]
fn test_wider_list_addresses_several_beams() {
    let d = new_dispatcher();
    assert_eq!(d.dispatch("bf set ants beamxa1 1a"), "OK");
    assert_eq!(d.dispatch("bf set ants beamyc3 1b"), "OK");

    assert_eq!(d.dispatch("zfocus 1a,1b 5000"), "OK");

    for name in ["BEAMXA1", "BEAMYC3"] {
        let status = d.state().subarrays.status(beam(name));
        assert!((status.zfocus_freq_mhz - 5000.0).abs() < 1e-9, "{name}");
    }
    let untouched = d.state().subarrays.status(beam("BEAMXA2"));
    assert!((untouched.zfocus_freq_mhz - 3000.0).abs() < 1e-9);
}

#[test]
fn test_stop_is_idempotent() {
    let d = new_dispatcher();
    let xa1 = beam("BEAMXA1");
    assert_eq!(d.dispatch("bf set ants beamxa1 3d,3e"), "OK");
    assert_eq!(d.dispatch("point 3d,3e azel 200 20"), "OK");
    d.state().subarrays.update_all();
    assert_eq!(d.state().subarrays.status(xa1).drive_state, DriveState::Slew);

    for _ in 0..2 {
        assert_eq!(d.dispatch("stop 3d,3e"), "OK");
        d.state().subarrays.update_all();
        let status = d.state().subarrays.status(xa1);
        assert_eq!(status.drive_state, DriveState::Stop);
        assert_eq!(status.dish_counts.stop, 2);
        assert_eq!(status.error_deg, 0.0);
    }

    assert_eq!(d.dispatch("stow 3d,3e"), "OK");
}

#[test]
fn test_bf_coords_round_trip() {
    let d = new_dispatcher();

    assert_eq!(d.dispatch("BF SET COORDS BEAMXA1 AZEL 20 10"), "OK");
    assert_eq!(
        d.dispatch("BF LIST COORDS BEAMXA1"),
        "BEAMXA1 AZEL AZ 20.000000 deg EL 10.000000 deg RA .000000 hr DEC .000000 deg \
         GLONG .000000 deg GLAT .000000 deg "
    );
}

#[test]
fn test_new_coord_system_replaces_the_old_one() {
    let d = new_dispatcher();

    assert_eq!(d.dispatch("bf set coords beamxb1 gal 122 10"), "OK");
    assert_eq!(d.dispatch("bf set coords beamxb1 j2000 10.5 -20"), "OK");
    assert_eq!(
        d.dispatch("bf list coords beamxb1"),
        "BEAMXB1 J2000 AZ .000000 deg EL .000000 deg RA 10.500000 hr DEC -20.000000 deg \
         GLONG .000000 deg GLAT .000000 deg "
    );
}

#[test]
fn test_failed_set_coords_keeps_previous_pointing() {
    let d = new_dispatcher();

    assert_eq!(d.dispatch("bf set coords beamxa1 azel 20 10"), "OK");
    assert_eq!(
        d.dispatch("bf set coords beamxa1 azel 360 10"),
        "ERROR: arg out of range: set azel"
    );
    assert_eq!(
        d.dispatch("bf set coords beamxa1 j2000 abc 10"),
        "ERROR: invalid argument"
    );
    assert!(d
        .dispatch("bf list coords beamxa1")
        .starts_with("BEAMXA1 AZEL AZ 20.000000 deg EL 10.000000 deg"));
}

#[test]
fn test_tune_boundaries() {
    let d = new_dispatcher();

    assert_eq!(d.dispatch("TUNE A 1500"), "OK");
    assert_eq!(d.dispatch("TUNE A 0.5"), "ERROR: arg out of range: tune");
    assert_eq!(d.dispatch("TUNE A 11201"), "ERROR: arg out of range: tune");
    assert_eq!(d.dispatch("TUNE A 1"), "OK");
    assert_eq!(d.dispatch("TUNE A 11200"), "OK");
    assert_eq!(d.dispatch("TUNE A mid"), "ERROR: invalid argument: tune");
    assert_eq!(d.dispatch("TUNE E 1500"), "ERROR: invalid tuning name: tune");
    assert_eq!(d.dispatch("TUNE A"), "ERROR: invalid number of arguments: tune");
}

#[test]
fn test_attn_boundaries() {
    let d = new_dispatcher();

    assert_eq!(d.dispatch("ATTN A 10 20"), "OK");
    assert_eq!(d.dispatch("ATTN A 1000 20"), "ERROR: arg out of range: attn");
    assert_eq!(d.dispatch("ATTN A 10 -1"), "ERROR: arg out of range: attn");
    assert_eq!(d.dispatch("ATTN A 1.5 20"), "ERROR: invalid argument: attn");
    assert_eq!(d.dispatch("ATTN Q 1 2"), "ERROR: invalid tuning name: attn");
}

#[test]
fn test_failed_tune_leaves_tuning_unchanged() {
    let d = new_dispatcher();
    assert_eq!(d.dispatch("tune b 2000"), "OK");
    assert_eq!(d.dispatch("tune b 0"), "ERROR: arg out of range: tune");

    let tuning = d.state().tunings.get(atasim::tuning::TuningId::B);
    assert!((tuning.sky_freq_mhz - 2000.0).abs() < 1e-9);
}

#[test]
fn test_antgroup_resolution_for_bf_set_ants() {
    let d = new_dispatcher();

    assert_eq!(d.dispatch("antgroup set xpol 1a,1b"), "OK");
    assert_eq!(d.dispatch("bf set ants beamxa1 antgroup"), "OK");
    assert_eq!(d.dispatch("bf list ants beamxa1"), "BEAMXA1: 1a,1b");
    assert_eq!(
        d.dispatch("bf set ants beamya1 antgroup"),
        "ERROR: antgroup unassigned: bf set ants"
    );
    assert_eq!(
        d.dispatch("point antgroup j2000 10.5 -20"),
        "ERROR: antgroup unassigned: point"
    );
}

#[test]
fn test_bf_point_activates_commanded_coords() {
    let d = new_dispatcher();
    let xa1 = beam("BEAMXA1");

    assert_eq!(
        d.dispatch("bf point"),
        "WARNING: can't point beams, no coordinates assigned"
    );
    assert_eq!(d.dispatch("bf set coords beamxa1 azel 20 10"), "OK");
    assert_eq!(d.dispatch("bf point"), "READY: POINT");

    let active = d.state().beam_status.get(xa1);
    assert_eq!(active, d.state().beam_commands.get(xa1));
    // Beams never commanded keep their previous active pointing.
    assert!(!d.state().beam_status.get(beam("BEAMXA2")).is_uninit());
}

#[test]
fn test_non_finite_numbers_are_invalid_arguments() {
    let d = new_dispatcher();

    assert_eq!(d.dispatch("tune a nan"), "ERROR: invalid argument: tune");
    assert_eq!(d.dispatch("tune a infinity"), "ERROR: invalid argument: tune");
    assert_eq!(d.dispatch("bf set attn beamxa1 5"), "OK");
    assert_eq!(
        d.dispatch("bf set attn beamxa1 inf"),
        "ERROR: invalid argument: bf set attn INF"
    );
    assert_eq!(
        d.dispatch("bf set attn beamxa1 nan"),
        "ERROR: invalid argument: bf set attn NAN"
    );
    assert_eq!(d.dispatch("bf list attn"), "5.0");
    assert_eq!(
        d.dispatch("bf set coords beamxa1 gal nan 0"),
        "ERROR: invalid argument"
    );
}

#[test]
fn test_leading_spaces_before_keyword_are_ignored() {
    let d = new_dispatcher();

    assert_eq!(d.dispatch("   allocate"), "OK");
    assert_eq!(
        d.dispatch("  stop 1a"),
        "WARNING: subarray not assigned to any beams: stop"
    );
}
