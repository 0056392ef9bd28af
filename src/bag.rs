//! Event bags: everything due at one simulated instant.
//!
//! An [`EventBagModel`] groups the events of one simulator; a
//! [`CompleteEventBagModel`] groups the per-model bags of every
//! simulator due at the same time, plus the observations due then.

use std::collections::BTreeMap;

use crate::event::{ExternalEventList, InternalEvent, ObservationEvent, RequestEvent};
use crate::simulator::SimulatorId;
use crate::time::Time;

// ── DispatchKind ──────────────────────────────────────────────────────

/// Which transition path the coordinator takes for one model's bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DispatchKind {
    /// Internal event only.
    Internal,
    /// External events only.
    External,
    /// Internal and external events coincide (confluent transition).
    Conflict,
    /// Neither internal nor external, only requests.
    Request,
}

impl std::fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DispatchKind::Internal => "internal",
            DispatchKind::External => "external",
            DispatchKind::Conflict => "conflict",
            DispatchKind::Request => "request",
        };
        write!(f, "{}", s)
    }
}

// ── EventBagModel ─────────────────────────────────────────────────────

/// The events pending for one simulator at the current instant.
///
/// At most one internal event, any number of external and request
/// events.
#[derive(Debug, Clone, Default)]
pub struct EventBagModel {
    internal: Option<InternalEvent>,
    externals: ExternalEventList,
    requests: Vec<RequestEvent>,
}

impl EventBagModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any internal event already in the bag.
    pub fn add_internal(&mut self, event: InternalEvent) {
        self.internal = Some(event);
    }

    pub fn add_externals(&mut self, events: ExternalEventList) {
        self.externals.extend(events);
    }

    pub fn add_requests(&mut self, events: Vec<RequestEvent>) {
        self.requests.extend(events);
    }

    pub fn internal(&self) -> Option<&InternalEvent> {
        self.internal.as_ref()
    }

    pub fn externals(&self) -> &ExternalEventList {
        &self.externals
    }

    pub fn requests(&self) -> &[RequestEvent] {
        &self.requests
    }

    pub fn take_internal(&mut self) -> Option<InternalEvent> {
        self.internal.take()
    }

    pub fn take_externals(&mut self) -> ExternalEventList {
        std::mem::take(&mut self.externals)
    }

    pub fn take_requests(&mut self) -> Vec<RequestEvent> {
        std::mem::take(&mut self.requests)
    }

    pub fn empty_internal(&self) -> bool {
        self.internal.is_none()
    }

    pub fn empty_external(&self) -> bool {
        self.externals.is_empty()
    }

    pub fn empty_request(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.empty_internal() && self.empty_external() && self.empty_request()
    }

    /// The case table of the coordinator: internal only, external only,
    /// both (confluent), otherwise requests. `None` for an empty bag.
    pub fn dispatch_kind(&self) -> Option<DispatchKind> {
        match (self.empty_internal(), self.empty_external()) {
            (false, true) => Some(DispatchKind::Internal),
            (true, false) => Some(DispatchKind::External),
            (false, false) => Some(DispatchKind::Conflict),
            (true, true) if !self.empty_request() => Some(DispatchKind::Request),
            (true, true) => None,
        }
    }

    pub fn clear(&mut self) {
        self.internal = None;
        self.externals.clear();
        self.requests.clear();
    }
}

// ── CompleteEventBagModel ─────────────────────────────────────────────

/// All per-model bags sharing the same time, plus the observations due
/// at that time.
#[derive(Debug, Clone)]
pub struct CompleteEventBagModel {
    time: Time,
    bags: BTreeMap<SimulatorId, EventBagModel>,
    observations: Vec<ObservationEvent>,
}

impl CompleteEventBagModel {
    /// An empty bag for `time`.
    pub fn new(time: Time) -> Self {
        CompleteEventBagModel {
            time,
            bags: BTreeMap::new(),
            observations: Vec::new(),
        }
    }

    pub fn time(&self) -> Time {
        self.time
    }

    /// The bag of `model`, created empty if absent.
    pub fn get_bag(&mut self, model: SimulatorId) -> &mut EventBagModel {
        self.bags.entry(model).or_default()
    }

    pub fn bag(&self, model: SimulatorId) -> Option<&EventBagModel> {
        self.bags.get(&model)
    }

    pub fn exist(&self, model: SimulatorId) -> bool {
        self.bags.contains_key(&model)
    }

    pub fn add_internal(&mut self, event: InternalEvent) {
        self.get_bag(event.target).add_internal(event);
    }

    pub fn add_externals(&mut self, model: SimulatorId, events: ExternalEventList) {
        self.get_bag(model).add_externals(events);
    }

    pub fn add_requests(&mut self, model: SimulatorId, events: Vec<RequestEvent>) {
        self.get_bag(model).add_requests(events);
    }

    pub fn add_observation(&mut self, event: ObservationEvent) {
        self.observations.push(event);
    }

    /// Neither model bags nor observations.
    pub fn is_empty(&self) -> bool {
        self.bags.is_empty() && self.observations.is_empty()
    }

    pub fn empty_bag(&self) -> bool {
        self.bags.is_empty()
    }

    pub fn empty_observations(&self) -> bool {
        self.observations.is_empty()
    }

    /// Number of model bags.
    pub fn len(&self) -> usize {
        self.bags.len()
    }

    pub fn models(&self) -> impl Iterator<Item = SimulatorId> + '_ {
        self.bags.keys().copied()
    }

    pub fn observations(&self) -> &[ObservationEvent] {
        &self.observations
    }

    pub fn take_observations(&mut self) -> Vec<ObservationEvent> {
        std::mem::take(&mut self.observations)
    }

    /// Drop every event of `model` from this bag.
    pub fn del_model(&mut self, model: SimulatorId) {
        self.bags.remove(&model);
        self.observations.retain(|o| o.target != Some(model));
    }

    /// Consume the model bags in dispatch order: every non-executive
    /// model first, then executives, each group in ID order.
    pub fn into_ordered<F>(self, is_executive: F) -> Vec<(SimulatorId, EventBagModel)>
    where
        F: Fn(SimulatorId) -> bool,
    {
        let (mut plain, exec): (Vec<_>, Vec<_>) = self
            .bags
            .into_iter()
            .filter(|(_, bag)| !bag.is_empty())
            .partition(|(id, _)| !is_executive(*id));
        plain.extend(exec);
        plain
    }
}
