use super::{DishCounts, DriveModel, DriveState, SkyPosition, SubarrayStatus};
use crate::antgroup::parse_ant_names;
use crate::beam::Beam;
use crate::pointing::{CoordSystem, DEG_PER_HOUR};
use crate::protocol::{check_range, parse_value, CommandError, ErrorKind};
use crate::tuning::{MAX_TUNE_FREQ_MHZ, MIN_TUNE_FREQ_MHZ};
use tracing::debug;

/// Position error above which the subarray is slewing rather than tracking.
pub const SLEW_THRESHOLD_DEG: f64 = 0.1;

/// Upper bound of the pseudo-random jitter added to the position error.
pub const ERROR_JITTER_DEG: f64 = 0.0005;

const INITIAL_AZ_DEG: f64 = 135.0;
const INITIAL_ZEN_DEG: f64 = 30.0;
const INITIAL_WRAP: i32 = 1;
const INITIAL_ZFOCUS_MHZ: f64 = 3000.0;

/// Kinematic model of the subarray feeding one synthesized beam.
#[derive(Debug)]
pub struct SubarrayModel {
    beam: Beam,

    // Comma separated list as assigned, e.g. "ANT3D,ANT3E"
    ant_names_list: String,
    ant_names: Vec<String>,

    drive_state: DriveState,
    coord_system: CoordSystem,
    wrap: i32,
    zfocus_freq_mhz: f64,
    error_deg: f64,
    stopped: bool,

    position: SkyPosition,
    target: SkyPosition,
    slew_step_deg: f64,

    dish_counts: DishCounts,
    rng_state: u64,
}

impl SubarrayModel {
    pub fn new(beam: Beam, slew_step_deg: f64) -> Self {
        let position = SkyPosition {
            az_deg: INITIAL_AZ_DEG,
            zen_deg: INITIAL_ZEN_DEG,
            ..SkyPosition::default()
        };

        Self {
            beam,
            ant_names_list: String::new(),
            ant_names: Vec::new(),
            drive_state: DriveState::Stop,
            coord_system: CoordSystem::J2000,
            wrap: INITIAL_WRAP,
            zfocus_freq_mhz: INITIAL_ZFOCUS_MHZ,
            error_deg: 0.0,
            stopped: true,
            position,
            target: SkyPosition::default(),
            slew_step_deg,
            dish_counts: DishCounts::default(),
            rng_state: 0x1234_5678_9ABC_DEF0 ^ (beam.index() as u64 + 1),
        }
    }

    pub fn ant_names_list(&self) -> &str {
        &self.ant_names_list
    }

    pub fn set_ant_names_list(&mut self, list: &str) {
        self.ant_names_list = list.to_owned();
        self.ant_names = parse_ant_names(list);
        self.dish_counts.total = self.ant_names.len() as u32;
    }

    /// True if every antenna of this subarray appears in `names`. A subarray
    /// with no antennas is never addressed.
    pub fn ant_names_are_subset_of(&self, names: &[String]) -> bool {
        !self.ant_names.is_empty() && self.ant_names.iter().all(|own| names.contains(own))
    }

    pub fn target(&self) -> SkyPosition {
        self.target
    }

    pub fn position(&self) -> SkyPosition {
        self.position
    }

    /// Command a new target in `system`. The stop flag is released even when
    /// the coordinates turn out to be invalid.
    pub fn point(&mut self, system: CoordSystem, c1: &str, c2: &str) -> Result<(), CommandError> {
        self.stopped = false;

        match system {
            CoordSystem::Azel => {
                let az = check_range(parse_value(c1)?, 0.0..360.0)?;
                self.target.az_deg = az;
                let el: f64 = check_range(parse_value(c2)?, 0.0..=90.0)?;
                self.target.zen_deg = 90.0 - el;
            }
            CoordSystem::J2000 => {
                let ra_hours: f64 = check_range(parse_value(c1)?, 0.0..24.0)?;
                self.target.ra_deg = ra_hours * DEG_PER_HOUR;
                self.target.dec_deg = check_range(parse_value(c2)?, -90.0..=90.0)?;
            }
            CoordSystem::Gal => {
                self.target.glong_deg = check_range(parse_value(c1)?, 0.0..=360.0)?;
                self.target.glat_deg = check_range(parse_value(c2)?, -90.0..=90.0)?;
            }
            CoordSystem::Uninit => return Err(CommandError::new(ErrorKind::InvalidCoordSys)),
        }

        self.coord_system = system;
        Ok(())
    }

    pub fn set_zfocus(&mut self, freq_mhz: &str) -> Result<(), CommandError> {
        let freq = parse_value(freq_mhz)?;
        self.zfocus_freq_mhz = check_range(freq, MIN_TUNE_FREQ_MHZ..=MAX_TUNE_FREQ_MHZ)?;
        Ok(())
    }

    pub fn set_wrap(&mut self, wrap: &str) -> Result<(), CommandError> {
        self.wrap = parse_value(wrap).map_err(|e| e.context(": wrap"))?;
        Ok(())
    }

    fn advance(&mut self) {
        let total = self.dish_counts.total;

        if self.stopped {
            self.target = self.position;
            self.error_deg = 0.0;
            self.drive_state = DriveState::Stop;
            self.dish_counts = DishCounts {
                stop: total,
                ..DishCounts::with_total(total)
            };
            return;
        }

        // All three systems are compared, whichever one was commanded.
        let max_sq_error = self.target.max_squared_error(&self.position);
        self.error_deg = max_sq_error.sqrt() + self.random_unit() * ERROR_JITTER_DEG;

        if self.error_deg > SLEW_THRESHOLD_DEG {
            self.drive_state = DriveState::Slew;
            self.dish_counts = DishCounts {
                slew: total,
                ..DishCounts::with_total(total)
            };
            self.position.approach(&self.target, self.slew_step_deg);
        } else {
            self.target = self.position;
            self.drive_state = DriveState::Track;
            self.dish_counts = DishCounts {
                track: total,
                shared_pointing: total,
                ..DishCounts::with_total(total)
            };
        }
    }

    // Linear congruential generator (Numerical Recipes parameters); the
    // jitter only has to look noisy.
    fn next_random(&mut self) -> u64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.rng_state
    }

    /// Uniform in [0, 1).
    fn random_unit(&mut self) -> f64 {
        (self.next_random() >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl DriveModel for SubarrayModel {
    type Status = SubarrayStatus;

    /// Advance the model by one tick.
    fn update(&mut self) {
        let previous = self.drive_state;
        self.advance();
        if self.drive_state != previous {
            debug!(
                "{}: {} -> {}",
                self.beam,
                previous.as_str(),
                self.drive_state.as_str()
            );
        }
    }

    fn status(&self) -> SubarrayStatus {
        SubarrayStatus {
            drive_state: self.drive_state,
            coord_system: self.coord_system,
            position: self.position,
            dish_counts: self.dish_counts,
            wrap: self.wrap,
            zfocus_freq_mhz: self.zfocus_freq_mhz,
            error_deg: self.error_deg,
        }
    }

    fn stop(&mut self) {
        self.stopped = true;
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with_ants(list: &str) -> SubarrayModel {
        let mut model = SubarrayModel::new(Beam::parse("BEAMXA1").unwrap(), 4.0);
        model.set_ant_names_list(list);
        model
    }

    #[test]
    fn test_initial_state_is_stopped() {
        let mut model = model_with_ants("ANT3D,ANT3E");
        model.update();
        let status = model.status();
        assert_eq!(status.drive_state, DriveState::Stop);
        assert_eq!(status.dish_counts.total, 2);
        assert_eq!(status.dish_counts.stop, 2);
        assert!((status.position.el_deg() - 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_releases_stop_even_on_bad_value() {
        let mut model = model_with_ants("1a");
        let err = model.point(CoordSystem::Azel, "BADARG", "5").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert!(!model.is_stopped());
    }

    #[test]
    fn test_slews_then_tracks() {
        let mut model = model_with_ants("1a");
        model.point(CoordSystem::Azel, "143", "60").unwrap();

        model.update();
        assert_eq!(model.status().drive_state, DriveState::Slew);
        assert!((model.position().az_deg - 139.0).abs() < 1e-12);
        assert_eq!(model.status().dish_counts.slew, 1);

        model.update();
        assert!((model.position().az_deg - 143.0).abs() < 1e-12);

        model.update();
        let status = model.status();
        assert_eq!(status.drive_state, DriveState::Track);
        assert_eq!(status.dish_counts.track, 1);
        assert_eq!(status.dish_counts.shared_pointing, 1);
        assert!(status.error_deg <= ERROR_JITTER_DEG);
    }

    #[test]
    fn test_wrap_and_zfocus_validation() {
        let mut model = model_with_ants("1a");
        assert_eq!(
            model.set_wrap("BADARG").unwrap_err().to_string(),
            "ERROR: invalid argument: wrap"
        );
        assert!(model.set_wrap("0").is_ok());
        assert_eq!(model.set_zfocus("0.5").unwrap_err().kind, ErrorKind::OutOfRange);
        assert!(model.set_zfocus("1222").is_ok());
        assert!((model.status().zfocus_freq_mhz - 1222.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_jitter_stays_in_unit_interval() {
        let mut model = model_with_ants("1a");
        for _ in 0..1000 {
            let r = model.random_unit();
            assert!((0.0..1.0).contains(&r));
        }
    }
}
