//! `Dynamics` and `Executive` traits: the behavior contract of an atomic
//! model.

use std::collections::BTreeMap;

use crate::coordinator::ExecutiveContext;
use crate::error::DevsResult;
use crate::event::{EventKind, ExternalEventList, ObservationEvent, OutputEvents, RequestEvent};
use crate::graph::ModelId;
use crate::time::Time;
use crate::value::Value;

/// Initial values handed to a dynamics factory, keyed by port name.
/// Built by merging the conditions attached to the atomic model.
pub type InitEventList = BTreeMap<String, Value>;

/// Identity of the atomic model a behavior is built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicsInit {
    pub model: ModelId,
    /// Full path of the model, e.g. `top:sub:a`.
    pub name: String,
}

// ── Dynamics ──────────────────────────────────────────────────────────

/// Behavior of a plain atomic model.
///
/// Every hook has a default so a model only implements what it uses.
/// State-changing hooks return `DevsResult`; an error aborts the current
/// `Coordinator::run` and is handed to the caller unchanged.
///
/// # Contract
///
/// Implementations **must**:
/// - Only exchange data with other models through events.
/// - Leave state untouched in `output`, `confluent_transitions` and
///   `observation`.
/// - Never report a negative time advance.
///
/// # Example
///
/// ```rust
/// use orrery::simulator::Dynamics;
/// use orrery::{DevsResult, ExternalEventList, Time};
///
/// struct Sink { seen: usize }
///
/// impl Dynamics for Sink {
///     fn external_transition(&mut self, events: &ExternalEventList, _time: Time) -> DevsResult<()> {
///         self.seen += events.len();
///         Ok(())
///     }
///     fn as_any(&self) -> &dyn std::any::Any { self }
/// }
/// ```
pub trait Dynamics {
    /// Called once when the model is created. Returns the delay before
    /// the first internal transition.
    fn init(&mut self, _time: Time) -> DevsResult<Time> {
        Ok(Time::INFINITY)
    }

    /// Delay from the last transition to the next internal transition.
    fn time_advance(&self) -> Time {
        Time::INFINITY
    }

    /// Emit output events, just before an internal transition.
    fn output(&self, _time: Time, _output: &mut OutputEvents) -> DevsResult<()> {
        Ok(())
    }

    fn internal_transition(&mut self, _time: Time) -> DevsResult<()> {
        Ok(())
    }

    fn external_transition(&mut self, _events: &ExternalEventList, _time: Time) -> DevsResult<()> {
        Ok(())
    }

    /// Report which component of a confluent transition takes
    /// precedence. Purely informative for the kernel.
    fn confluent_transitions(&self, _time: Time, _events: &ExternalEventList) -> EventKind {
        EventKind::Internal
    }

    /// State update of a confluent transition. Defaults to the external
    /// transition followed by the internal one.
    fn external_transition_conflict(
        &mut self,
        time: Time,
        events: &ExternalEventList,
    ) -> DevsResult<()> {
        self.external_transition(events, time)?;
        self.internal_transition(time)
    }

    /// Value of `event.port_name`, or `None` when the port is not
    /// observable.
    fn observation(&self, _event: &ObservationEvent) -> Option<Value> {
        None
    }

    /// Answer a request. Responses are emitted as output events.
    fn request(
        &mut self,
        _event: &RequestEvent,
        _time: Time,
        _output: &mut OutputEvents,
    ) -> DevsResult<()> {
        Ok(())
    }

    /// Called once at the end of the simulation.
    fn finish(&mut self) {}

    /// Downcast support, required for `Coordinator::dynamics::<T>()`.
    fn as_any(&self) -> &dyn std::any::Any;
}

// ── Executive ─────────────────────────────────────────────────────────

/// Behavior of an executive model: a `Dynamics` with the right to change
/// the model structure while the simulation runs.
///
/// The hooks that may change state receive an [`ExecutiveContext`]
/// scoped to the coupled model holding the executive.
pub trait Executive {
    fn init(&mut self, _ctx: &mut ExecutiveContext<'_>, _time: Time) -> DevsResult<Time> {
        Ok(Time::INFINITY)
    }

    fn time_advance(&self) -> Time {
        Time::INFINITY
    }

    fn output(&self, _time: Time, _output: &mut OutputEvents) -> DevsResult<()> {
        Ok(())
    }

    fn internal_transition(&mut self, _ctx: &mut ExecutiveContext<'_>, _time: Time) -> DevsResult<()> {
        Ok(())
    }

    fn external_transition(
        &mut self,
        _ctx: &mut ExecutiveContext<'_>,
        _events: &ExternalEventList,
        _time: Time,
    ) -> DevsResult<()> {
        Ok(())
    }

    fn confluent_transitions(&self, _time: Time, _events: &ExternalEventList) -> EventKind {
        EventKind::Internal
    }

    fn external_transition_conflict(
        &mut self,
        ctx: &mut ExecutiveContext<'_>,
        time: Time,
        events: &ExternalEventList,
    ) -> DevsResult<()> {
        self.external_transition(ctx, events, time)?;
        self.internal_transition(ctx, time)
    }

    fn observation(&self, _event: &ObservationEvent) -> Option<Value> {
        None
    }

    fn request(
        &mut self,
        _event: &RequestEvent,
        _time: Time,
        _output: &mut OutputEvents,
    ) -> DevsResult<()> {
        Ok(())
    }

    fn finish(&mut self) {}

    fn as_any(&self) -> &dyn std::any::Any;
}

// ── Behavior ──────────────────────────────────────────────────────────

/// The behavior owned by a simulator.
pub enum Behavior {
    Atomic(Box<dyn Dynamics>),
    Executive(Box<dyn Executive>),
}

impl Behavior {
    pub fn atomic(dynamics: impl Dynamics + 'static) -> Self {
        Behavior::Atomic(Box::new(dynamics))
    }

    pub fn executive(executive: impl Executive + 'static) -> Self {
        Behavior::Executive(Box::new(executive))
    }

    pub fn is_executive(&self) -> bool {
        matches!(self, Behavior::Executive(_))
    }

    pub fn as_any(&self) -> &dyn std::any::Any {
        match self {
            Behavior::Atomic(d) => d.as_any(),
            Behavior::Executive(e) => e.as_any(),
        }
    }
}

impl std::fmt::Debug for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Behavior::Atomic(_) => write!(f, "Behavior::Atomic(..)"),
            Behavior::Executive(_) => write!(f, "Behavior::Executive(..)"),
        }
    }
}
