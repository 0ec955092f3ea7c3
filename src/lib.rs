//! # ATA Control Interface Simulator
//!
//! A stand-in for the antenna array control system as seen by a backend.
//! It accepts the ASCII command protocol on one TCP port and pushes
//! periodic status snapshots on another, while a simple kinematic model
//! slews and tracks the subarray behind each of the 32 synthesized beams.
//!
//! ## Quick Start
//!
//! ```rust
//! use atasim::{ArrayState, Dispatcher};
//! use std::sync::Arc;
//!
//! let dispatcher = Dispatcher::new(Arc::new(ArrayState::default()));
//!
//! assert_eq!(dispatcher.dispatch("bf set ants beamxa1 ant1a,ant1b"), "OK");
//! assert_eq!(dispatcher.dispatch("point ant1a,ant1b azel 100 45"), "OK");
//! assert_eq!(dispatcher.dispatch("tune a 11201"), "ERROR: arg out of range: tune");
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - tokenizer, keyword tables, error kinds and reply texts
//! - [`dispatcher`] - top-level commands
//! - [`beamformer`] - the `BF` sub-protocol
//! - [`subarray`] - per-beam primary pointing kinematics
//! - [`telemetry`] - status snapshot rendering
//! - [`server`] - command, status and model loops over TCP
//! - [`selftest`] - the `-test` self-check

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod antgroup;
pub mod beam;
pub mod beamformer;
pub mod config;
pub mod dispatcher;
pub mod pointing;
pub mod protocol;
pub mod selftest;
pub mod server;
pub mod state;
pub mod subarray;
pub mod telemetry;
pub mod tuning;

// Re-export main public types for convenience
pub use config::SimulatorConfig;
pub use dispatcher::Dispatcher;
pub use protocol::{CommandError, ErrorKind, Response, ResponseKind};
pub use server::{ServerError, Simulator};
pub use state::ArrayState;
