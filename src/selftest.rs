//! Built-in self-check run by `atasim -test`: a scripted command session
//! against a fresh simulator, plus a few helper checks.

use crate::antgroup::is_valid_ant_list;
use crate::beam::{pol_from_beam_name, Polarization};
use crate::dispatcher::Dispatcher;
use crate::pointing::small_angle_gc_error_deg;
use crate::protocol::{ErrorKind, CMD_OK, READY_PREFIX};
use crate::state::ArrayState;
use std::sync::Arc;
use tracing::{info, warn};

/// What a scripted response has to look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Ok,
    Exact(&'static str),
    /// Exact match after lower-casing the response.
    ExactLowercase(&'static str),
    Prefix(&'static str),
    Kind(ErrorKind),
    Ready,
}

impl Expect {
    pub fn matches(self, response: &str) -> bool {
        match self {
            Expect::Ok => response == CMD_OK,
            Expect::Exact(text) => response == text,
            Expect::ExactLowercase(text) => response.to_lowercase() == text,
            Expect::Prefix(prefix) => response.starts_with(prefix),
            Expect::Kind(kind) => response.starts_with(&kind.to_string()),
            Expect::Ready => response.starts_with(READY_PREFIX),
        }
    }
}

use Expect::{Exact, ExactLowercase, Kind, Prefix, Ready};

/// The scripted session. Order matters: later steps rely on state set up
/// by earlier ones.
pub const SCRIPT: &[(&str, Expect)] = &[
    ("allocate", Expect::Ok),
    ("zfocus ant1z 1222", Kind(ErrorKind::SubarrayNotAssignedToAnyBeams)),
    ("bf set ants beamxa1 bad,ant,list", Kind(ErrorKind::InvalidAntList)),
    ("bf set ants beamxa1 ant1z", Expect::Ok),
    ("zfocus ant1z 1222", Expect::Ok),
    ("zfocus bad,ant,list 1222", Kind(ErrorKind::InvalidAntList)),
    ("zfocus   ant1z   1222  ", Expect::Ok),
    ("zfocus ant1z badfreq", Kind(ErrorKind::InvalidArgument)),
    ("bf set", Kind(ErrorKind::InvalidNumberOfArgs)),
    ("bf set ants not-enough-args", Kind(ErrorKind::InvalidNumberOfArgs)),
    ("bf set foobar", Prefix("ERROR")),
    ("bf set ants bad-beam ant3d,ant3e", Kind(ErrorKind::InvalidBeam)),
    ("bf set ants beamxa1 ant3d,ant3e", Expect::Ok),
    ("bf list ants beamxa1", ExactLowercase("beamxa1: ant3d,ant3e")),
    ("bf list foobar", Prefix("ERROR")),
    ("bf list ants bad-beam", Kind(ErrorKind::InvalidBeam)),
    ("bf clear ants beamxa1", Expect::Ok),
    ("bf list ants beamxa1", ExactLowercase("beamxa1: ")),
    // primary pointing
    ("point ant5e azel 100 5", Kind(ErrorKind::SubarrayNotAssignedToAnyBeams)),
    ("bf set ants beamxa1 ant5e", Expect::Ok),
    ("point ant5e azel 100 5", Expect::Ok),
    ("point ant5e j2000 10.5 -20", Expect::Ok),
    ("point ant5e gal 122 10", Expect::Ok),
    ("point bad,ant,list gal 122 10", Kind(ErrorKind::InvalidAntList)),
    ("point ant5e azel badarg 5", Kind(ErrorKind::InvalidArgument)),
    ("point ant5e j2000 badarg -20", Kind(ErrorKind::InvalidArgument)),
    ("point ant5e bad-coord-sys 10.5 -20", Kind(ErrorKind::InvalidCoordSys)),
    ("point", Kind(ErrorKind::InvalidNumberOfArgs)),
    // antenna groups
    ("antgroup", Kind(ErrorKind::InvalidNumberOfArgs)),
    ("antgroup set", Kind(ErrorKind::InvalidNumberOfArgs)),
    ("antgroup set primary 1a,1b,1c", Expect::Ok),
    ("antgroup list primary", Exact("PRIMARY: 1a,1b,1c")),
    ("antgroup set primary foo,fred", Kind(ErrorKind::InvalidAntList)),
    ("antgroup set xpol 1a,1b", Expect::Ok),
    ("antgroup list xpol", Exact("XPOL: 1a,1b")),
    ("antgroup set ypol 1b,1c", Expect::Ok),
    ("antgroup list ypol", Exact("YPOL: 1b,1c")),
    ("antgroup clear primary", Expect::Ok),
    ("antgroup list primary", Exact("PRIMARY: ")),
    ("antgroup autoselect sefd 1000 freq 8400", Ready),
    ("antgroup autoselect", Kind(ErrorKind::InvalidNumberOfArgs)),
    ("antgroup clear all", Expect::Ok),
    ("antgroup set xpol 1a,1b", Expect::Ok),
    ("antgroup set primary 1a,1b,1c", Expect::Ok),
    ("bf set ants beamxa1 antgroup", Expect::Ok),
    ("bf list ants beamxa1", ExactLowercase("beamxa1: 1a,1b")),
    ("bf set ants beamza1 antgroup", Kind(ErrorKind::InvalidBeam)),
    ("bf set ants beamya1 antgroup", Kind(ErrorKind::AntGroupUnassigned)),
    ("antgroup clear all", Expect::Ok),
    ("point antgroup j2000 10.5 -20", Kind(ErrorKind::AntGroupUnassigned)),
    ("antgroup set primary 2a,2b,2c", Expect::Ok),
    ("point antgroup j2000 10.5 -20", Kind(ErrorKind::SubarrayNotAssignedToAnyBeams)),
    // a primary group overlapping the antennas already on a beam
    ("antgroup set primary 1a,1b,1c,1d", Expect::Ok),
    ("point antgroup j2000 10.5 -20", Expect::Ok),
    ("stop antgroup", Expect::Ok),
    ("wrap antgroup 1", Expect::Ok),
    ("zfocus antgroup 1222", Expect::Ok),
    // synthesized beam coordinates
    ("bf set coords beamxa1 azel 20 10", Expect::Ok),
    ("bf set coords beamyd4 azel 20 10", Expect::Ok),
    ("bf set coords beamxa1 j2000 10.5 -20", Expect::Ok),
    ("bf set coords beamxa1 gal 122 10", Expect::Ok),
    ("bf set coords badbeamname azel 20 10", Kind(ErrorKind::InvalidBeam)),
    ("bf set coords beamyd4 bad-coord-sys 20 10", Kind(ErrorKind::InvalidCoordSys)),
    ("bf set coords beamyd4 azel badarg 10", Kind(ErrorKind::InvalidArgument)),
    ("bf set coords beamyd4 j2000 badarg 10", Kind(ErrorKind::InvalidArgument)),
    ("bf set coords beamyd4 gal badarg 10", Kind(ErrorKind::InvalidArgument)),
    ("bf set coords beamyd4 azel 40 50", Expect::Ok),
    (
        "bf list coords beamyd4",
        Prefix(
            "BEAMYD4 AZEL AZ 40.000000 deg EL 50.000000 deg RA .000000 hr \
             DEC .000000 deg GLONG .000000 deg GLAT .000000 deg",
        ),
    ),
    ("bf set coords beamyd4 j2000 5 25", Expect::Ok),
    (
        "bf list coords beamyd4",
        Prefix(
            "BEAMYD4 J2000 AZ .000000 deg EL .000000 deg RA 5.000000 hr \
             DEC 25.000000 deg GLONG .000000 deg GLAT .000000 deg",
        ),
    ),
    ("bf set coords beamyd4 gal 100 -12", Expect::Ok),
    (
        "bf list coords beamyd4",
        Prefix(
            "BEAMYD4 GAL AZ .000000 deg EL .000000 deg RA .000000 hr \
             DEC .000000 deg GLONG 100.000000 deg GLAT -12.000000 deg",
        ),
    ),
    // nulls
    ("bf set nulltype none", Expect::Ok),
    ("bf set nulltype foobar", Kind(ErrorKind::InvalidArgument)),
    ("bf clear nulls all", Expect::Ok),
    ("bf set nulltype projection", Expect::Ok),
    ("bf add null beamyd4 j2000 5 25", Expect::Ok),
    ("bf add null beamyd4 azel 30 50", Expect::Ok),
    ("bf add null beamyd4 gal 100 10", Expect::Ok),
    ("bf add null beamyd4 badcoordsys 100 10", Kind(ErrorKind::InvalidCoordSys)),
    ("bf list nulls", Kind(ErrorKind::UnimplementedCommand)),
    ("bf clear coords beamyd4", Expect::Ok),
    (
        "bf list coords beamyd4",
        Prefix(
            "BEAMYD4 UNINIT AZ .000000 deg EL .000000 deg RA .000000 hr \
             DEC .000000 deg GLONG .000000 deg GLAT .000000 deg",
        ),
    ),
    ("bf autoatten", Ready),
    // tunings
    ("tune a 1500", Expect::Ok),
    ("tune d 1600", Expect::Ok),
    ("tune a badarg", Kind(ErrorKind::InvalidArgument)),
    ("tune badtuning 1500", Kind(ErrorKind::InvalidTuningName)),
    ("attn a 10 20", Expect::Ok),
    ("attn a badarg 20", Kind(ErrorKind::InvalidArgument)),
    ("attn b", Kind(ErrorKind::InvalidNumberOfArgs)),
    ("attn badtuning 10 20", Kind(ErrorKind::InvalidTuningName)),
    ("attn a 1000 20", Kind(ErrorKind::OutOfRange)),
    // drives
    ("stop", Kind(ErrorKind::InvalidNumberOfArgs)),
    ("bf set ants beamxa1 ant3d,ant3e", Expect::Ok),
    ("stop ant3d,ant3e", Expect::Ok),
    ("stop bad,ant,list", Kind(ErrorKind::InvalidAntList)),
    ("stow", Kind(ErrorKind::InvalidNumberOfArgs)),
    ("stow ant3d,ant3e", Expect::Ok),
    ("lnaon ant3d,ant3e", Expect::Ok),
    ("pamset ant3d,ant3e", Expect::Ok),
    ("monitor 9", Expect::Ok),
    ("monitor badarg", Kind(ErrorKind::InvalidArgument)),
    ("monitor", Kind(ErrorKind::InvalidNumberOfArgs)),
    ("wrap", Kind(ErrorKind::InvalidNumberOfArgs)),
    ("wrap ant3d,ant3e 1", Expect::Ok),
    ("wrap bad,ant,list 1", Kind(ErrorKind::InvalidAntList)),
    ("wrap ant3d,ant3e badarg", Kind(ErrorKind::InvalidArgument)),
    ("badcommand", Kind(ErrorKind::UnrecognizedCommand)),
    // beamformer control
    ("bf stop", Expect::Ok),
    ("bf reset", Ready),
    ("bf cal ", Kind(ErrorKind::InvalidNumberOfArgs)),
    ("bf cal delay integrate 20 cycles 4", Ready),
    ("bf cal foobar integrate 20 cycles 4", Kind(ErrorKind::InvalidArgument)),
    ("bf set obslen 220", Expect::Ok),
    ("bf list obslen", Exact("220")),
    ("bf set attn beamyd4 5", Expect::Ok),
    ("bf list attn beamyd4", Exact("5.0")),
    ("bf list config", Prefix("BEAM")),
    ("bf init", Ready),
    ("bf clear coords all", Expect::Ok),
    ("bf point", Kind(ErrorKind::NoCoordsAssignedToBeams)),
    ("bf set coords beamyd4 azel 15 58", Expect::Ok),
    ("bf point", Ready),
    ("deallocate", Expect::Ok),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub check: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Default)]
pub struct SelfTestReport {
    pub passed: usize,
    pub failures: Vec<Failure>,
}

impl SelfTestReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, check: &str, ok: bool, expected: impl Into<String>, actual: impl Into<String>) {
        if ok {
            self.passed += 1;
        } else {
            let failure = Failure {
                check: check.to_owned(),
                expected: expected.into(),
                actual: actual.into(),
            };
            warn!("❌ self-check failed: {:?}", failure);
            self.failures.push(failure);
        }
    }
}

/// Run every check against a fresh simulator state.
pub fn run() -> SelfTestReport {
    info!("running self-check");
    let mut report = SelfTestReport::default();

    let gc_el = small_angle_gc_error_deg(80.0, 40.0, 80.0, 40.1);
    info!("small gc error: {}", gc_el);
    report.record("gc error, el offset", (gc_el - 0.1).abs() < 1e-6, "0.1", gc_el.to_string());

    let gc_az = small_angle_gc_error_deg(80.05, 40.0, 80.0, 40.0);
    info!("small gc error: {}", gc_az);
    report.record("gc error, az offset", (gc_az - 0.05).abs() < 1e-6, "0.05", gc_az.to_string());

    for (list, valid) in [
        ("", false),
        ("ant1a,ant2b", true),
        ("ant1z", true),
        ("1a,1b,1c", true),
        ("a1", false),
        ("a11", false),
        ("foobar", false),
    ] {
        let actual = is_valid_ant_list(list);
        report.record(&format!("ant list '{list}'"), actual == valid, valid.to_string(), actual.to_string());
    }

    let pol = pol_from_beam_name("beamxa1");
    report.record("pol of beamxa1", pol == Some(Polarization::X), "X", format!("{pol:?}"));

    let dispatcher = Dispatcher::new(Arc::new(ArrayState::default()));
    for (command, expect) in SCRIPT {
        let response = dispatcher.dispatch(command);
        report.record(command, expect.matches(&response), format!("{expect:?}"), response);
    }

    info!(
        "self-check finished: {} passed, {} failed",
        report.passed,
        report.failures.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_check_passes() {
        let report = run();
        assert!(report.is_success(), "{:#?}", report.failures);
        assert_eq!(report.passed, SCRIPT.len() + 10);
    }

    #[test]
    fn test_expect_matching() {
        assert!(Expect::Ok.matches("OK"));
        assert!(!Expect::Ok.matches("OK "));
        assert!(Kind(ErrorKind::InvalidBeam).matches("ERROR: invalid beam name: bf set ants"));
        assert!(ExactLowercase("beamxa1: 1a").matches("BEAMXA1: 1A"));
        assert!(Ready.matches("READY: INIT"));
    }
}
