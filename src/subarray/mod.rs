//! Per-beam subarray models: primary-beam pointing, drive state and dish
//! counts, advanced once per model tick.

pub mod model;

pub use model::SubarrayModel;

use crate::antgroup::parse_ant_names;
use crate::beam::Beam;
use crate::pointing::CoordSystem;
use crate::state::lock;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Degrees per second a slewing subarray moves on every axis.
pub const SLEW_RATE_DEG_PER_SEC: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveState {
    Stop,
    Slew,
    Track,
    DriveError,
}

impl DriveState {
    pub fn as_str(self) -> &'static str {
        match self {
            DriveState::Stop => "STOP",
            DriveState::Slew => "SLEW",
            DriveState::Track => "TRACK",
            DriveState::DriveError => "DRIVE_ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DishCounts {
    pub total: u32,
    pub shared_pointing: u32,
    pub track: u32,
    pub slew: u32,
    pub stop: u32,
    pub offline: u32,
    pub drive_error: u32,
}

impl DishCounts {
    /// `total` dishes, none of them in any particular state.
    pub fn with_total(total: u32) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }
}

/// Primary-beam position in all three systems at once. Zenith angle
/// rather than elevation; RA in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SkyPosition {
    pub az_deg: f64,
    pub zen_deg: f64,
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub glong_deg: f64,
    pub glat_deg: f64,
}

impl SkyPosition {
    pub fn el_deg(&self) -> f64 {
        90.0 - self.zen_deg
    }

    pub fn ra_hours(&self) -> f64 {
        self.ra_deg / crate::pointing::DEG_PER_HOUR
    }

    /// Largest of the squared per-system separations from `other`.
    pub fn max_squared_error(&self, other: &SkyPosition) -> f64 {
        let sq = |a: f64, b: f64| (a - b) * (a - b);

        let azel = sq(self.az_deg, other.az_deg) + sq(self.zen_deg, other.zen_deg);
        let radec = sq(self.ra_deg, other.ra_deg) + sq(self.dec_deg, other.dec_deg);
        let gal = sq(self.glat_deg, other.glat_deg) + sq(self.glong_deg, other.glong_deg);

        azel.max(radec).max(gal)
    }

    /// Move every coordinate toward `target` by at most `step_deg`.
    pub fn approach(&mut self, target: &SkyPosition, step_deg: f64) {
        step_toward(&mut self.az_deg, target.az_deg, step_deg);
        step_toward(&mut self.zen_deg, target.zen_deg, step_deg);
        step_toward(&mut self.ra_deg, target.ra_deg, step_deg);
        step_toward(&mut self.dec_deg, target.dec_deg, step_deg);
        step_toward(&mut self.glong_deg, target.glong_deg, step_deg);
        step_toward(&mut self.glat_deg, target.glat_deg, step_deg);
    }
}

fn step_toward(current: &mut f64, target: f64, step: f64) {
    let diff = target - *current;
    if diff.abs() > step {
        *current += step.copysign(diff);
    } else {
        *current = target;
    }
}

/// Snapshot of a subarray for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubarrayStatus {
    pub drive_state: DriveState,
    pub coord_system: CoordSystem,
    pub position: SkyPosition,
    pub dish_counts: DishCounts,
    pub wrap: i32,
    pub zfocus_freq_mhz: f64,
    pub error_deg: f64,
}

/// Anything advanced by the model tick and reported in the status stream.
pub trait DriveModel {
    type Status: Clone + Serialize;

    fn update(&mut self);
    fn status(&self) -> Self::Status;
    fn stop(&mut self);
    fn is_stopped(&self) -> bool;
}

/// One subarray model per beam, each behind its own lock.
#[derive(Debug)]
pub struct SubarrayFleet {
    models: Vec<Mutex<SubarrayModel>>,
}

impl SubarrayFleet {
    pub fn new(model_tick_secs: f64) -> Self {
        let slew_step_deg = SLEW_RATE_DEG_PER_SEC * model_tick_secs;
        Self {
            models: Beam::all()
                .map(|beam| Mutex::new(SubarrayModel::new(beam, slew_step_deg)))
                .collect(),
        }
    }

    pub fn with_model<R>(&self, beam: Beam, f: impl FnOnce(&mut SubarrayModel) -> R) -> R {
        f(&mut lock(&self.models[beam.index()]))
    }

    /// Beams whose subarray antennas are all named in `ant_list`, in report
    /// order.
    pub fn matching_beams(&self, ant_list: &str) -> Vec<Beam> {
        let names = parse_ant_names(ant_list);
        Beam::all()
            .filter(|beam| self.with_model(*beam, |m| m.ant_names_are_subset_of(&names)))
            .collect()
    }

    pub fn update_all(&self) {
        for model in &self.models {
            lock(model).update();
        }
    }

    pub fn status(&self, beam: Beam) -> SubarrayStatus {
        self.with_model(beam, |m| m.status())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for SubarrayFleet {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beam::BEAM_COUNT;

    #[test]
    fn test_drive_state_names() {
        assert_eq!(DriveState::Stop.as_str(), "STOP");
        assert_eq!(DriveState::Slew.as_str(), "SLEW");
        assert_eq!(DriveState::Track.as_str(), "TRACK");
        assert_eq!(DriveState::DriveError.as_str(), "DRIVE_ERROR");
    }

    #[test]
    fn test_step_toward_snaps_inside_one_step() {
        let mut v = 10.0;
        step_toward(&mut v, 2.0, 4.0);
        assert!((v - 6.0).abs() < 1e-12);
        step_toward(&mut v, 2.0, 4.0);
        assert!((v - 2.0).abs() < 1e-12);
        step_toward(&mut v, 2.0, 4.0);
        assert!((v - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_max_squared_error_picks_worst_system() {
        let a = SkyPosition::default();
        let b = SkyPosition {
            az_deg: 3.0,
            zen_deg: 4.0,
            glat_deg: 1.0,
            ..SkyPosition::default()
        };
        assert!((a.max_squared_error(&b) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_fleet_matches_subsets_only() {
        let fleet = SubarrayFleet::default();
        assert_eq!(fleet.len(), BEAM_COUNT);

        let xa1 = Beam::parse("BEAMXA1").unwrap();
        let yb2 = Beam::parse("BEAMYB2").unwrap();
        fleet.with_model(xa1, |m| m.set_ant_names_list("ANT1A,ANT1B"));
        fleet.with_model(yb2, |m| m.set_ant_names_list("2C"));

        assert_eq!(fleet.matching_beams("1a,1b,1c"), vec![xa1]);
        assert_eq!(fleet.matching_beams("ant2c,ant1a,ant1b"), vec![xa1, yb2]);
        assert!(fleet.matching_beams("1a").is_empty());
    }

    #[test]
    fn test_update_all_advances_every_model() {
        let fleet = SubarrayFleet::default();
        let beam = Beam::parse("BEAMXD4").unwrap();
        fleet.with_model(beam, |m| {
            m.set_ant_names_list("3d");
            m.point(CoordSystem::Azel, "135", "60")
        })
        .unwrap();

        fleet.update_all();
        let status = fleet.status(beam);
        assert_eq!(status.drive_state, DriveState::Track);
        assert_eq!(status.dish_counts.track, 1);
        assert_eq!(fleet.status(Beam::parse("BEAMXA1").unwrap()).drive_state, DriveState::Stop);
    }
}
