//! IF tunings A-D: sky frequency and per-polarization attenuation.

use crate::protocol::{check_range, parse_value, CommandError};
use crate::state::lock;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub const MAX_TUNE_FREQ_MHZ: f64 = 11200.0;
pub const MIN_TUNE_FREQ_MHZ: f64 = 1.0;
pub const MAX_ATTN_DB: i32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TuningId {
    A,
    B,
    C,
    D,
}

impl TuningId {
    pub const ALL: [TuningId; 4] = [TuningId::A, TuningId::B, TuningId::C, TuningId::D];

    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "A" => Some(TuningId::A),
            "B" => Some(TuningId::B),
            "C" => Some(TuningId::C),
            "D" => Some(TuningId::D),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            TuningId::A => 'A',
            TuningId::B => 'B',
            TuningId::C => 'C',
            TuningId::D => 'D',
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TuningStatus {
    pub sky_freq_mhz: f64,
    pub attn_x_db: i32,
    pub attn_y_db: i32,
}

impl TuningStatus {
    pub fn tune(&mut self, freq_mhz: &str) -> Result<(), CommandError> {
        let freq = parse_value(freq_mhz)?;
        self.sky_freq_mhz = check_range(freq, MIN_TUNE_FREQ_MHZ..=MAX_TUNE_FREQ_MHZ)?;
        Ok(())
    }

    /// Both values are validated before either is applied.
    pub fn set_attn(&mut self, x_db: &str, y_db: &str) -> Result<(), CommandError> {
        let x = check_range(parse_value::<i32>(x_db)?, 0..=MAX_ATTN_DB)?;
        let y = check_range(parse_value::<i32>(y_db)?, 0..=MAX_ATTN_DB)?;
        self.attn_x_db = x;
        self.attn_y_db = y;
        Ok(())
    }
}

/// The four tunings, each read and written as a copy under one lock.
#[derive(Debug, Default)]
pub struct TuningRegistry {
    tunings: Mutex<[TuningStatus; 4]>,
}

impl TuningRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TuningId) -> TuningStatus {
        lock(&self.tunings)[id.index()]
    }

    pub fn update(&self, id: TuningId, status: TuningStatus) {
        lock(&self.tunings)[id.index()] = status;
    }

    /// Apply `f` to a copy of the tuning, storing the copy only on success.
    pub fn modify<F>(&self, id: TuningId, f: F) -> Result<(), CommandError>
    where
        F: FnOnce(&mut TuningStatus) -> Result<(), CommandError>,
    {
        let mut status = self.get(id);
        f(&mut status)?;
        self.update(id, status);
        Ok(())
    }
}
