//! Synthesized beam names and the two beam pointing stores.

use crate::pointing::Pointing;
use crate::state::lock;
use crate::tuning::TuningId;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub const BEAM_COUNT: usize = 32;
pub const BEAMS_PER_TUNING: u8 = 4;

/// Index of the polarization character in a beam name (`BEAM<pol>...`).
pub const POL_CHAR_INDEX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Polarization {
    X,
    Y,
}

impl Polarization {
    pub fn letter(self) -> char {
        match self {
            Polarization::X => 'X',
            Polarization::Y => 'Y',
        }
    }
}

/// One of the 32 synthesized beams, named `BEAM{X|Y}{A-D}{1-4}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Beam {
    pub pol: Polarization,
    pub tuning: TuningId,
    pub number: u8,
}

impl Beam {
    /// All beams in report order: tuning, then number, then polarization
    /// (BEAMXA1, BEAMYA1, BEAMXA2, ... BEAMYD4).
    pub fn all() -> impl Iterator<Item = Beam> {
        TuningId::ALL.into_iter().flat_map(|tuning| {
            (1..=BEAMS_PER_TUNING).flat_map(move |number| {
                [Polarization::X, Polarization::Y]
                    .into_iter()
                    .map(move |pol| Beam { pol, tuning, number })
            })
        })
    }

    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix("BEAM")?;
        let mut chars = rest.chars();

        let pol = match chars.next()? {
            'X' => Polarization::X,
            'Y' => Polarization::Y,
            _ => return None,
        };
        let tuning = TuningId::parse(&chars.next()?.to_string())?;
        let number = chars.next()?.to_digit(10)?;
        if chars.next().is_some() || !(1..=u32::from(BEAMS_PER_TUNING)).contains(&number) {
            return None;
        }

        Some(Beam {
            pol,
            tuning,
            number: number as u8,
        })
    }

    /// Position in report order, 0..32.
    pub fn index(self) -> usize {
        let per_tuning = usize::from(BEAMS_PER_TUNING) * 2;
        let pol = match self.pol {
            Polarization::X => 0,
            Polarization::Y => 1,
        };
        self.tuning.index() * per_tuning + usize::from(self.number - 1) * 2 + pol
    }

    pub fn name(self) -> String {
        self.to_string()
    }
}

impl core::fmt::Display for Beam {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "BEAM{}{}{}", self.pol.letter(), self.tuning.letter(), self.number)
    }
}

/// Polarization read from the fixed character position of a beam name.
pub fn pol_from_beam_name(name: &str) -> Option<Polarization> {
    match name.chars().nth(POL_CHAR_INDEX)?.to_ascii_uppercase() {
        'X' => Some(Polarization::X),
        'Y' => Some(Polarization::Y),
        _ => None,
    }
}

/// Beam name → Pointing map. Reads hand out copies; updates overwrite the
/// stored value in place.
#[derive(Debug)]
pub struct BeamPointingStore {
    pointings: Mutex<Vec<Pointing>>,
}

impl BeamPointingStore {
    /// A store with every beam initialised to `initial`.
    pub fn new(initial: Pointing) -> Self {
        Self {
            pointings: Mutex::new(vec![initial; BEAM_COUNT]),
        }
    }

    pub fn get(&self, beam: Beam) -> Pointing {
        lock(&self.pointings)[beam.index()]
    }

    pub fn update(&self, beam: Beam, pointing: Pointing) {
        lock(&self.pointings)[beam.index()] = pointing;
    }

    /// Copies of every beam's pointing, in report order.
    pub fn snapshot(&self) -> Vec<(Beam, Pointing)> {
        let pointings = lock(&self.pointings);
        Beam::all().map(|beam| (beam, pointings[beam.index()])).collect()
    }
}
