//! Shared simulator state. Each registry carries its own lock so the command
//! session, the status stream and the model tick never wait on one another
//! for longer than a single read or write.

use crate::antgroup::AntGroupRegistry;
use crate::beam::BeamPointingStore;
use crate::pointing::Pointing;
use crate::subarray::SubarrayFleet;
use crate::tuning::TuningRegistry;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const DEFAULT_OBS_LEN_SECS: i32 = 600;
pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 10;

/// Lock `mutex`, carrying on with the inner value if a previous holder
/// panicked. Every guarded value here is plain data that stays consistent
/// between statements.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct ArrayState {
    pub antgroups: AntGroupRegistry,
    pub tunings: TuningRegistry,
    /// Commanded beamformer pointings, `UNINIT` until set.
    pub beam_commands: BeamPointingStore,
    /// Pointings the beamformer is currently using.
    pub beam_status: BeamPointingStore,
    pub subarrays: SubarrayFleet,
    obs_len_secs: AtomicI32,
    bf_attn_db: Mutex<f64>,
    status_interval_secs: AtomicU64,
}

impl ArrayState {
    pub fn new(model_tick_secs: f64) -> Self {
        Self {
            antgroups: AntGroupRegistry::new(),
            tunings: TuningRegistry::new(),
            beam_commands: BeamPointingStore::new(Pointing::uninit()),
            beam_status: BeamPointingStore::new(Pointing::default()),
            subarrays: SubarrayFleet::new(model_tick_secs),
            obs_len_secs: AtomicI32::new(DEFAULT_OBS_LEN_SECS),
            bf_attn_db: Mutex::new(0.0),
            status_interval_secs: AtomicU64::new(DEFAULT_STATUS_INTERVAL_SECS),
        }
    }

    pub fn obs_len_secs(&self) -> i32 {
        self.obs_len_secs.load(Ordering::Relaxed)
    }

    pub fn set_obs_len_secs(&self, secs: i32) {
        self.obs_len_secs.store(secs, Ordering::Relaxed);
    }

    pub fn bf_attn_db(&self) -> f64 {
        *lock(&self.bf_attn_db)
    }

    pub fn set_bf_attn_db(&self, db: f64) {
        *lock(&self.bf_attn_db) = db;
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs.load(Ordering::Relaxed))
    }

    pub fn set_status_interval_secs(&self, secs: u64) {
        self.status_interval_secs.store(secs, Ordering::Relaxed);
    }
}

impl Default for ArrayState {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beam::Beam;
    use crate::pointing::CoordSystem;

    #[test]
    fn test_initial_values() {
        let state = ArrayState::default();
        assert_eq!(state.obs_len_secs(), 600);
        assert!(state.bf_attn_db().abs() < f64::EPSILON);
        assert_eq!(state.status_interval(), Duration::from_secs(10));

        let beam = Beam::parse("BEAMXA1").unwrap();
        assert!(state.beam_commands.get(beam).is_uninit());
        assert_eq!(state.beam_status.get(beam).coord_system, CoordSystem::Azel);
    }

    #[test]
    fn test_lock_survives_poisoning() {
        let mutex = std::sync::Arc::new(Mutex::new(5));
        let cloned = mutex.clone();
        let _ = std::thread::spawn(move || {
            let _guard = cloned.lock().unwrap();
            panic!("poison");
        })
        .join();

        assert!(mutex.is_poisoned());
        assert_eq!(*lock(&mutex), 5);
    }
}
