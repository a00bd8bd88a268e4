#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Path marker task controller (transport-agnostic).
//!
//! All vehicle interaction goes through the `pathmark_traits` traits:
//! commands and subscriptions via `Transport`, heading estimation via
//! `HeadingResolver`, completion via `MissionHooks`.
//!
//! ## Architecture
//!
//! - **Debounce**: condition held continuously for a duration (`debounce`)
//! - **Detection**: N sightings inside an attempt window (`detection`)
//! - **Alignment**: per-phase tolerance confirmations (`alignment`)
//! - **Heading**: pluggable yaw/offset derivation (`heading`)
//! - **Actuation**: bounded, spaced marker pulses (`actuator`)
//! - **Controller**: the phase state machine composing the above (`controller`)
//!
//! ## Time
//!
//! Every handler takes the event stamp in milliseconds. Timers are evaluated
//! lazily from those stamps; nothing in this crate sleeps or spawns threads.

pub mod actuator;
pub mod alignment;
pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod debounce;
pub mod detection;
pub mod error;
pub mod heading;
pub mod mocks;
pub mod runner;
pub mod status;
pub mod transport_error;

pub use builder::{Missing, Set, TaskController, TaskControllerBuilder, TaskControllerG, build_task};
pub use config::{
    AlignmentCfg, DetectionCfg, DropCfg, FrameCfg, HeadingCfg, HeadingMode, TaskCfg, TaskSettings,
};
pub use controller::TaskCore;
pub use error::{AbortReason, BuildError, Result, TaskError};
pub use heading::{HeadingContext, HeadingPlan, HeadingStrategy, HoldCurrent, NormalToFeature};
pub use runner::{RecordedEvent, RunSummary};
pub use status::{Phase, TaskSnapshot, TaskStatus};
