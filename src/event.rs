//! Event system for the DEVS kernel.
//!
//! Four kinds of events flow through the kernel: internal wakeups,
//! external messages, same-instant requests, and observation requests
//! issued on behalf of views. They are modelled as a tagged [`Event`]
//! so dispatch points switch on them exhaustively.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use crate::simulator::SimulatorId;
use crate::time::Time;
use crate::value::Value;

// ── Event ID ──────────────────────────────────────────────────────────

/// A strictly-increasing identifier stamped on every internal event
/// inserted into the event table.
///
/// IDs break ties between internal events scheduled at the same time,
/// in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw u64 into an `EventId`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Deterministic, strictly-increasing event-ID generator.
#[derive(Debug, Clone, Default)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }
}

// ── Event kinds ───────────────────────────────────────────────────────

/// Discriminant of [`Event`].
///
/// Also the return type of `Dynamics::confluent_transitions`, where the
/// model reports which component of a confluent transition it gave
/// precedence to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    Internal,
    External,
    Observation,
    Request,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::Internal => "internal",
            EventKind::External => "external",
            EventKind::Observation => "observation",
            EventKind::Request => "request",
        };
        write!(f, "{}", s)
    }
}

// ── Internal Event ────────────────────────────────────────────────────

/// A self-scheduled wakeup of one simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct InternalEvent {
    pub time: Time,
    pub target: SimulatorId,
}

impl InternalEvent {
    pub fn new(time: Time, target: SimulatorId) -> Self {
        InternalEvent { time, target }
    }
}

// ── External Event ────────────────────────────────────────────────────

/// Named attributes carried by an external event.
pub type Attributes = BTreeMap<String, Value>;

/// A message travelling from an output port to an input port.
///
/// A model builds it with only a port name (its output port). Routing
/// stamps the destination simulator, the destination input port and the
/// current time on a copy per destination.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ExternalEvent {
    pub time: Time,
    pub target: Option<SimulatorId>,
    pub port_name: String,
    pub attributes: Attributes,
}

impl ExternalEvent {
    /// An event on `port_name` with no attributes.
    pub fn new(port_name: impl Into<String>) -> Self {
        ExternalEvent {
            time: Time::ZERO,
            target: None,
            port_name: port_name.into(),
            attributes: Attributes::new(),
        }
    }

    /// Copy of `self` addressed to `target` on `port_name` at `time`.
    pub fn routed(&self, time: Time, target: SimulatorId, port_name: &str) -> Self {
        ExternalEvent {
            time,
            target: Some(target),
            port_name: port_name.to_string(),
            attributes: self.attributes.clone(),
        }
    }

    /// Builder-style attribute insertion.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_double(self, name: &str, value: f64) -> Self {
        self.with(name, value)
    }

    pub fn with_integer(self, name: &str, value: i64) -> Self {
        self.with(name, value)
    }

    pub fn with_boolean(self, name: &str, value: bool) -> Self {
        self.with(name, value)
    }

    pub fn with_string(self, name: &str, value: impl Into<String>) -> Self {
        self.with(name, value.into())
    }

    pub fn with_value(self, name: &str, value: Value) -> Self {
        self.with(name, value)
    }

    /// In-place attribute insertion, chainable on `&mut`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn on_port(&self, port_name: &str) -> bool {
        self.port_name == port_name
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn get_double(&self, name: &str) -> Option<f64> {
        self.attribute(name).and_then(Value::as_double)
    }

    pub fn get_integer(&self, name: &str) -> Option<i64> {
        self.attribute(name).and_then(Value::as_integer)
    }

    pub fn get_boolean(&self, name: &str) -> Option<bool> {
        self.attribute(name).and_then(Value::as_boolean)
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }
}

/// The batch of simultaneous external events handed to a transition.
pub type ExternalEventList = Vec<ExternalEvent>;

// ── Request Event ─────────────────────────────────────────────────────

/// A synchronous query addressed to another model.
///
/// Structurally an external event; the distinct type is what routes it
/// to `Dynamics::request` instead of a transition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct RequestEvent(ExternalEvent);

impl RequestEvent {
    pub fn new(port_name: impl Into<String>) -> Self {
        RequestEvent(ExternalEvent::new(port_name))
    }

    pub fn routed(&self, time: Time, target: SimulatorId, port_name: &str) -> Self {
        RequestEvent(self.0.routed(time, target, port_name))
    }

    pub fn into_inner(self) -> ExternalEvent {
        self.0
    }
}

impl Deref for RequestEvent {
    type Target = ExternalEvent;

    fn deref(&self) -> &ExternalEvent {
        &self.0
    }
}

impl DerefMut for RequestEvent {
    fn deref_mut(&mut self) -> &mut ExternalEvent {
        &mut self.0
    }
}

// ── Observation Event ─────────────────────────────────────────────────

/// A request to sample state on behalf of a view.
///
/// In the event table it names only the view and the sampling time.
/// When the view runs, one copy per observable is handed to
/// `Dynamics::observation` with `target` and `port_name` filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ObservationEvent {
    pub time: Time,
    pub view: String,
    pub target: Option<SimulatorId>,
    pub port_name: String,
}

impl ObservationEvent {
    /// A table entry asking `view` to sample at `time`.
    pub fn for_view(view: impl Into<String>, time: Time) -> Self {
        ObservationEvent {
            time,
            view: view.into(),
            target: None,
            port_name: String::new(),
        }
    }

    /// A sampling of `port_name` on `target`.
    pub fn for_port(&self, target: SimulatorId, port_name: &str) -> Self {
        ObservationEvent {
            time: self.time,
            view: self.view.clone(),
            target: Some(target),
            port_name: port_name.to_string(),
        }
    }

    pub fn on_port(&self, port_name: &str) -> bool {
        self.port_name == port_name
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// Any event handled by the kernel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Event {
    Internal(InternalEvent),
    External(ExternalEvent),
    Observation(ObservationEvent),
    Request(RequestEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Internal(_) => EventKind::Internal,
            Event::External(_) => EventKind::External,
            Event::Observation(_) => EventKind::Observation,
            Event::Request(_) => EventKind::Request,
        }
    }

    pub fn time(&self) -> Time {
        match self {
            Event::Internal(e) => e.time,
            Event::External(e) => e.time,
            Event::Observation(e) => e.time,
            Event::Request(e) => e.time,
        }
    }
}

// ── Output sink ───────────────────────────────────────────────────────

/// Events produced by `Dynamics::output` and `Dynamics::request`.
///
/// Only external and request events are meaningful here; routing
/// rejects any other kind.
#[derive(Debug, Clone, Default)]
pub struct OutputEvents {
    events: Vec<Event>,
}

impl OutputEvents {
    pub fn new() -> Self {
        OutputEvents { events: Vec::new() }
    }

    /// Append an external event on `port_name` and return it for
    /// attribute filling.
    pub fn event(&mut self, port_name: &str) -> &mut ExternalEvent {
        self.events.push(Event::External(ExternalEvent::new(port_name)));
        match self.events.last_mut() {
            Some(Event::External(e)) => e,
            _ => unreachable!("just pushed an external event"),
        }
    }

    /// Append a request event on `port_name`.
    pub fn request(&mut self, port_name: &str) -> &mut RequestEvent {
        self.events.push(Event::Request(RequestEvent::new(port_name)));
        match self.events.last_mut() {
            Some(Event::Request(e)) => e,
            _ => unreachable!("just pushed a request event"),
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_monotonic() {
        let mut gen = EventIdGen::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert!(a < b);
    }

    #[test]
    fn test_routed_copy_keeps_attributes() {
        let e = ExternalEvent::new("out").with("value", 4.5);
        let r = e.routed(Time::new(2.0), SimulatorId::new(7), "in");
        assert_eq!(r.port_name, "in");
        assert_eq!(r.time, Time::new(2.0));
        assert_eq!(r.target, Some(SimulatorId::new(7)));
        assert_eq!(r.get_double("value"), Some(4.5));
    }

    #[test]
    fn test_output_sink_builders() {
        let mut out = OutputEvents::new();
        out.event("out").set("n", 3i64).set("ok", true);
        out.request("ask");
        assert_eq!(out.len(), 2);
        let kinds: Vec<_> = out.iter().map(Event::kind).collect();
        assert_eq!(kinds, vec![EventKind::External, EventKind::Request]);
        match &out.into_events()[0] {
            Event::External(e) => {
                assert_eq!(e.get_integer("n"), Some(3));
                assert_eq!(e.get_boolean("ok"), Some(true));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_observation_for_port() {
        let table_entry = ObservationEvent::for_view("view", Time::new(1.0));
        let sample = table_entry.for_port(SimulatorId::new(3), "x");
        assert!(sample.on_port("x"));
        assert_eq!(sample.view, "view");
        assert_eq!(sample.time, Time::new(1.0));
    }
}
