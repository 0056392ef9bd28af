//! Simulators: the per-model side of the kernel.
//!
//! A simulator wraps the behavior of one atomic model and adapts it to
//! the transition protocol driven by the coordinator. Simulators never
//! reference each other; they exchange data only through events routed
//! by the coordinator.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`SimulatorId`] newtype |
//! | [`dynamics`] | [`Dynamics`], [`Executive`] traits, [`Behavior`] |
//! | [`wrapper`] | [`Simulator`] struct |
//! | [`trace`] | [`TraceEntry`] struct |
//! | [`builtin`] | [`Beep`], [`Counter`], [`Janitor`] |

pub mod builtin;
pub mod dynamics;
pub mod id;
pub mod trace;
pub mod wrapper;

// Flat re-exports so callers can use `orrery::simulator::SimulatorId` etc.
pub use builtin::{Beep, Counter, Janitor};
pub use dynamics::{Behavior, Dynamics, DynamicsInit, Executive, InitEventList};
pub use id::SimulatorId;
pub use trace::TraceEntry;
pub use wrapper::Simulator;
