//! # Orrery — DEVS Simulation Kernel
//!
//! A sequential kernel for Discrete Event System Specification models
//! with structural dynamics. Atomic models react to internal, external
//! and confluent transitions; executive models may rewrite the model
//! graph while the simulation runs. Everything is driven by a simulated
//! clock and processed in a deterministic order.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────┐
//! │        RootCoordinator         │ ← drives the interval, one run per step
//! │  ┌─────────────────────────┐  │
//! │  │       Coordinator        │  │ ← pops bags, dispatches, routes outputs
//! │  │  ┌───────────────────┐  │  │
//! │  │  │    EventTable      │  │  │ ← one bag per instant, per model
//! │  │  └───────────────────┘  │  │
//! │  │  ┌───────────────────┐  │  │
//! │  │  │    Simulators      │  │  │ ← wrap Dynamics / Executive behaviour
//! │  │  └───────────────────┘  │  │
//! │  │  ┌───────────────────┐  │  │
//! │  │  │    ModelGraph      │  │  │ ← coupled hierarchy and connections
//! │  │  └───────────────────┘  │  │
//! │  │  ┌───────────────────┐  │  │
//! │  │  │  Views → Streams   │  │  │ ← observation sampling and output
//! │  │  └───────────────────┘  │  │
//! │  └─────────────────────────┘  │
//! └───────────────────────────────┘
//! ```

pub mod bag;
pub mod config;
pub mod coordinator;
pub mod dsl;
pub mod error;
pub mod event;
pub mod event_table;
pub mod factory;
pub mod graph;
pub mod output;
pub mod root;
pub mod simulator;
pub mod time;
pub mod value;
pub mod view;

// Re-exports for convenience.
pub use config::{ExperimentConfig, OutputConfig, ViewConfig};
pub use coordinator::{Coordinator, ExecutiveContext};
pub use dsl::ExperimentBuilder;
pub use error::{DevsError, DevsResult};
pub use event::{
    EventKind, ExternalEvent, ExternalEventList, InternalEvent, ObservationEvent, OutputEvents,
    RequestEvent,
};
pub use event_table::EventTable;
pub use factory::{Condition, ModelFactory, Observable};
pub use graph::{AtomicNode, ModelGraph, ModelId};
pub use output::{Row, Storage, StreamWriter, TextWriter};
pub use root::RootCoordinator;
pub use simulator::{
    Beep, Behavior, Counter, Dynamics, DynamicsInit, Executive, InitEventList, Janitor, Simulator,
    SimulatorId, TraceEntry,
};
pub use time::Time;
pub use value::Value;
pub use view::{View, ViewKind};
