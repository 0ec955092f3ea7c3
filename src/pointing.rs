//! Coordinate systems and beam pointing values.

use crate::protocol::{check_range, parse_value, CommandError, ErrorKind};
use serde::{Deserialize, Serialize};

pub const DEG_PER_HOUR: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordSystem {
    Azel,
    J2000,
    Gal,
    Uninit,
}

impl CoordSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            CoordSystem::Azel => "AZEL",
            CoordSystem::J2000 => "J2000",
            CoordSystem::Gal => "GAL",
            CoordSystem::Uninit => "UNINIT",
        }
    }

    /// Parse a commandable coordinate system. `UNINIT` is a state, not
    /// something a client may command.
    pub fn parse_commanded(word: &str) -> Option<Self> {
        match word {
            "AZEL" => Some(CoordSystem::Azel),
            "J2000" => Some(CoordSystem::J2000),
            "GAL" => Some(CoordSystem::Gal),
            _ => None,
        }
    }
}

impl core::fmt::Display for CoordSystem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A synthesized beam pointing. Only the pair of fields belonging to
/// `coord_system` is meaningful; the others stay at whatever they held.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pointing {
    pub coord_system: CoordSystem,
    pub az_deg: f64,
    pub el_deg: f64,
    pub ra_hours: f64,
    pub dec_deg: f64,
    pub glong_deg: f64,
    pub glat_deg: f64,
}

impl Default for Pointing {
    fn default() -> Self {
        Self::cleared(CoordSystem::Azel)
    }
}

impl Pointing {
    /// All six coordinates zeroed, tagged with `coord_system`.
    pub fn cleared(coord_system: CoordSystem) -> Self {
        Self {
            coord_system,
            az_deg: 0.0,
            el_deg: 0.0,
            ra_hours: 0.0,
            dec_deg: 0.0,
            glong_deg: 0.0,
            glat_deg: 0.0,
        }
    }

    pub fn uninit() -> Self {
        Self::cleared(CoordSystem::Uninit)
    }

    pub fn is_uninit(&self) -> bool {
        self.coord_system == CoordSystem::Uninit
    }

    /// Set from an AZEL pair of command words.
    pub fn set_azel(&mut self, az: &str, el: &str) -> Result<(), CommandError> {
        let context = ": set azel";

        self.az_deg = parse_value(az)
            .and_then(|v| check_range(v, 0.0..360.0))
            .map_err(|e| e.context(context))?;
        self.el_deg = parse_value(el)
            .and_then(|v| check_range(v, 0.0..=90.0))
            .map_err(|e| e.context(context))?;
        self.coord_system = CoordSystem::Azel;
        Ok(())
    }

    /// Set from a J2000 pair of command words, RA in hours.
    pub fn set_j2000(&mut self, ra_hours: &str, dec_deg: &str) -> Result<(), CommandError> {
        self.ra_hours = check_range(parse_value(ra_hours)?, 0.0..24.0)?;
        self.dec_deg = check_range(parse_value(dec_deg)?, -90.0..=90.0)?;
        self.coord_system = CoordSystem::J2000;
        Ok(())
    }

    pub fn set_gal(&mut self, glong_deg: &str, glat_deg: &str) -> Result<(), CommandError> {
        self.glong_deg = check_range(parse_value(glong_deg)?, 0.0..=360.0)?;
        self.glat_deg = check_range(parse_value(glat_deg)?, -90.0..=90.0)?;
        self.coord_system = CoordSystem::Gal;
        Ok(())
    }

    pub fn set(&mut self, system: CoordSystem, c1: &str, c2: &str) -> Result<(), CommandError> {
        match system {
            CoordSystem::Azel => self.set_azel(c1, c2),
            CoordSystem::J2000 => self.set_j2000(c1, c2),
            CoordSystem::Gal => self.set_gal(c1, c2),
            CoordSystem::Uninit => Err(CommandError::new(ErrorKind::InvalidCoordSys)),
        }
    }
}

/// Great-circle separation for small angles (Meeus, 17.2). Good for
/// separations below about 0.16 degrees.
pub fn small_angle_gc_error_deg(az1_deg: f64, el1_deg: f64, az2_deg: f64, el2_deg: f64) -> f64 {
    let az_diff_deg = az1_deg - az2_deg;
    let el_diff_deg = el1_deg - el2_deg;

    let delta_az_cos_avg_el = az_diff_deg * (el_diff_deg / 2.0).to_radians().cos();

    (delta_az_cos_avg_el * delta_az_cos_avg_el + el_diff_deg * el_diff_deg).sqrt()
}
