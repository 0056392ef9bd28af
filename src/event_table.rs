//! The event table: scheduling core of the kernel.
//!
//! Keeps every pending event ordered by time and hands the coordinator
//! one [`CompleteEventBagModel`] per call to [`EventTable::pop_event`].
//!
//! Internal events live in an ordered set keyed by
//! `(time, event id, simulator)`; the event ID breaks ties in insertion
//! order so two runs with the same inputs pop the same bags. External
//! and request events are zero-delay: they are always due at the
//! table's current time and wait in per-model lists until the next pop.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::bag::CompleteEventBagModel;
use crate::error::{DevsError, DevsResult};
use crate::event::{
    EventId, EventIdGen, ExternalEvent, ExternalEventList, InternalEvent, ObservationEvent,
    RequestEvent,
};
use crate::simulator::SimulatorId;
use crate::time::Time;

/// Time-indexed store of all pending work.
#[derive(Debug, Clone)]
pub struct EventTable {
    /// Valid internal events, smallest `(time, id)` first.
    internals: BTreeSet<(Time, EventId, SimulatorId)>,

    /// The single valid internal event of each model.
    by_model: BTreeMap<SimulatorId, (Time, EventId)>,

    /// External events due at `current_time`.
    externals: BTreeMap<SimulatorId, ExternalEventList>,

    /// Request events due at `current_time`.
    requests: BTreeMap<SimulatorId, Vec<RequestEvent>>,

    /// Observation events keyed by `(time, insertion sequence)`.
    observations: BTreeMap<(Time, u64), ObservationEvent>,

    /// Models whose events are void until purged by `del_model_events`.
    invalidated: BTreeSet<SimulatorId>,

    id_gen: EventIdGen,
    observation_seq: u64,
    current_time: Time,
}

impl EventTable {
    /// An empty table whose clock starts at `start`.
    pub fn new(start: Time) -> Self {
        EventTable {
            internals: BTreeSet::new(),
            by_model: BTreeMap::new(),
            externals: BTreeMap::new(),
            requests: BTreeMap::new(),
            observations: BTreeMap::new(),
            invalidated: BTreeSet::new(),
            id_gen: EventIdGen::new(),
            observation_seq: 0,
            current_time: start,
        }
    }

    /// Time of the most recently popped bag (or the start time).
    pub fn current_time(&self) -> Time {
        self.current_time
    }

    /// Reset the clock. Only meaningful before the first pop.
    pub fn set_current_time(&mut self, time: Time) {
        self.current_time = time;
    }

    /// Minimum scheduled time over every pending event, or
    /// `Time::INFINITY` when nothing is pending.
    pub fn top_event(&self) -> Time {
        if !self.externals.is_empty() || !self.requests.is_empty() {
            return self.current_time;
        }

        let internal = self.internals.first().map(|(t, _, _)| *t);
        let observation = self.observations.keys().next().map(|(t, _)| *t);
        match (internal, observation) {
            (Some(i), Some(o)) => i.min(o),
            (Some(i), None) => i,
            (None, Some(o)) => o,
            (None, None) => Time::INFINITY,
        }
    }

    /// Remove and return every event due at the minimum time.
    ///
    /// Returns an empty bag when nothing is pending. Observations are
    /// only popped when no model is due at that time, so they sample
    /// state after every transition of the instant.
    pub fn pop_event(&mut self) -> CompleteEventBagModel {
        let time = self.top_event();
        if time.is_infinity() {
            return CompleteEventBagModel::new(self.current_time);
        }
        self.current_time = time;

        let mut bag = CompleteEventBagModel::new(time);

        while let Some(&(t, id, model)) = self.internals.first() {
            if t != time {
                break;
            }
            self.internals.remove(&(t, id, model));
            self.by_model.remove(&model);
            bag.add_internal(InternalEvent::new(t, model));
        }

        for (model, events) in std::mem::take(&mut self.externals) {
            bag.add_externals(model, events);
        }

        for (model, events) in std::mem::take(&mut self.requests) {
            bag.add_requests(model, events);
        }

        if bag.empty_bag() {
            while let Some(entry) = self.observations.first_entry() {
                if entry.key().0 != time {
                    break;
                }
                bag.add_observation(entry.remove());
            }
        }

        trace!(time = %time, models = bag.len(), observations = bag.observations().len(), "popped bag");
        bag
    }

    /// Schedule the next wakeup of a model. Replaces any internal event
    /// the model already had.
    pub fn put_internal_event(&mut self, event: InternalEvent) {
        if self.invalidated.contains(&event.target) {
            trace!(simulator = %event.target, "dropping internal event for invalidated model");
            return;
        }

        self.remove_internal(event.target);
        let id = self.id_gen.next_id();
        self.internals.insert((event.time, id, event.target));
        self.by_model.insert(event.target, (event.time, id));
    }

    /// Queue an external event for the current instant.
    ///
    /// A pending internal event of the target lying strictly in the
    /// future is dropped: the external transition recomputes it.
    pub fn put_external_event(&mut self, event: ExternalEvent) -> DevsResult<()> {
        let target = event.target.ok_or_else(|| {
            DevsError::Internal(format!(
                "external event on port `{}` has no target",
                event.port_name
            ))
        })?;

        if self.invalidated.contains(&target) {
            trace!(simulator = %target, "dropping external event for invalidated model");
            return Ok(());
        }

        self.externals.entry(target).or_default().push(event);

        if let Some(&(t, _)) = self.by_model.get(&target) {
            if t > self.current_time {
                self.remove_internal(target);
            }
        }
        Ok(())
    }

    /// Queue a request event for the current instant.
    pub fn put_request_event(&mut self, event: RequestEvent) -> DevsResult<()> {
        let target = event.target.ok_or_else(|| {
            DevsError::Internal(format!(
                "request event on port `{}` has no target",
                event.port_name
            ))
        })?;

        if self.invalidated.contains(&target) {
            return Ok(());
        }

        self.requests.entry(target).or_default().push(event);
        Ok(())
    }

    pub fn put_observation_event(&mut self, event: ObservationEvent) {
        let seq = self.observation_seq;
        self.observation_seq += 1;
        self.observations.insert((event.time, seq), event);
    }

    /// Void every pending event of `model` and refuse new ones, until
    /// `del_model_events` purges it.
    pub fn invalidate_model(&mut self, model: SimulatorId) {
        self.remove_internal(model);
        self.externals.remove(&model);
        self.requests.remove(&model);
        self.invalidated.insert(model);
    }

    pub fn is_invalidated(&self, model: SimulatorId) -> bool {
        self.invalidated.contains(&model)
    }

    /// Purge every event of `model`, at every time.
    pub fn del_model_events(&mut self, model: SimulatorId) {
        self.remove_internal(model);
        self.externals.remove(&model);
        self.requests.remove(&model);
        self.observations.retain(|_, o| o.target != Some(model));
        self.invalidated.remove(&model);
    }

    /// The time of the model's pending internal event, if any.
    pub fn internal_time(&self, model: SimulatorId) -> Option<Time> {
        self.by_model.get(&model).map(|(t, _)| *t)
    }

    /// Number of pending events.
    pub fn event_count(&self) -> usize {
        self.internals.len()
            + self.observations.len()
            + self.externals.values().map(Vec::len).sum::<usize>()
            + self.requests.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }

    fn remove_internal(&mut self, model: SimulatorId) {
        if let Some((t, id)) = self.by_model.remove(&model) {
            self.internals.remove(&(t, id, model));
        }
    }
}

impl Default for EventTable {
    fn default() -> Self {
        Self::new(Time::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sim(id: u64) -> SimulatorId {
        SimulatorId::new(id)
    }

    fn internal(id: u64, t: f64) -> InternalEvent {
        InternalEvent::new(Time::new(t), sim(id))
    }

    fn external(id: u64, port: &str) -> ExternalEvent {
        ExternalEvent::new(port).routed(Time::ZERO, sim(id), port)
    }

    #[test]
    fn test_empty_table() {
        let mut table = EventTable::default();
        assert_eq!(table.top_event(), Time::INFINITY);
        let bag = table.pop_event();
        assert!(bag.is_empty());
        assert_eq!(table.current_time(), Time::ZERO);
    }

    #[test]
    fn test_pop_groups_same_time() {
        let mut table = EventTable::default();
        table.put_internal_event(internal(1, 1.0));
        table.put_internal_event(internal(2, 1.0));
        table.put_internal_event(internal(3, 2.0));

        assert_eq!(table.top_event(), Time::new(1.0));
        let bag = table.pop_event();
        assert_eq!(bag.time(), Time::new(1.0));
        assert_eq!(bag.len(), 2);
        assert_eq!(table.current_time(), Time::new(1.0));
        assert_eq!(table.top_event(), Time::new(2.0));
    }

    #[test]
    fn test_new_internal_replaces_old() {
        let mut table = EventTable::default();
        table.put_internal_event(internal(1, 5.0));
        table.put_internal_event(internal(1, 3.0));
        assert_eq!(table.event_count(), 1);
        assert_eq!(table.top_event(), Time::new(3.0));
        assert_eq!(table.internal_time(sim(1)), Some(Time::new(3.0)));
    }

    #[test]
    fn test_external_is_due_now_and_voids_future_internal() {
        let mut table = EventTable::default();
        table.put_internal_event(internal(1, 1.0));
        table.put_internal_event(internal(2, 4.0));
        table.pop_event();

        table.put_external_event(external(2, "in")).unwrap();
        assert_eq!(table.top_event(), Time::new(1.0));
        assert_eq!(table.internal_time(sim(2)), None);

        let bag = table.pop_event();
        assert_eq!(bag.time(), Time::new(1.0));
        assert_eq!(bag.bag(sim(2)).unwrap().externals().len(), 1);
        assert_eq!(table.top_event(), Time::INFINITY);
    }

    #[test]
    fn test_external_keeps_simultaneous_internal() {
        let mut table = EventTable::default();
        table.put_internal_event(internal(1, 0.0));
        table.put_external_event(external(1, "in")).unwrap();
        let bag = table.pop_event();
        let model_bag = bag.bag(sim(1)).unwrap();
        assert!(!model_bag.empty_internal());
        assert!(!model_bag.empty_external());
    }

    #[test]
    fn test_external_without_target_is_an_error() {
        let mut table = EventTable::default();
        let err = table.put_external_event(ExternalEvent::new("out")).unwrap_err();
        assert!(matches!(err, DevsError::Internal(_)));
    }

    #[test]
    fn test_observations_wait_for_model_bags() {
        let mut table = EventTable::default();
        table.put_internal_event(internal(1, 2.0));
        table.put_observation_event(ObservationEvent::for_view("v", Time::new(2.0)));

        let first = table.pop_event();
        assert_eq!(first.len(), 1);
        assert!(first.empty_observations());

        let second = table.pop_event();
        assert_eq!(second.time(), Time::new(2.0));
        assert!(second.empty_bag());
        assert_eq!(second.observations().len(), 1);
    }

    #[test]
    fn test_invalidate_then_purge() {
        let mut table = EventTable::default();
        table.put_internal_event(internal(1, 1.0));
        table.put_external_event(external(1, "in")).unwrap();
        table.invalidate_model(sim(1));

        assert!(table.is_invalidated(sim(1)));
        assert!(table.is_empty());
        table.put_external_event(external(1, "late")).unwrap();
        assert!(table.is_empty());

        table.del_model_events(sim(1));
        assert!(!table.is_invalidated(sim(1)));
    }

    #[test]
    fn test_request_events_are_due_now() {
        let mut table = EventTable::new(Time::new(3.0));
        table
            .put_request_event(RequestEvent::new("ask").routed(Time::new(3.0), sim(9), "ask"))
            .unwrap();
        assert_eq!(table.top_event(), Time::new(3.0));
        let bag = table.pop_event();
        assert_eq!(bag.bag(sim(9)).unwrap().requests().len(), 1);
    }

    proptest! {
        #[test]
        fn prop_pop_times_are_monotonic(times in proptest::collection::vec(0u32..1000, 1..64)) {
            let mut table = EventTable::default();
            for (i, t) in times.iter().enumerate() {
                table.put_internal_event(internal(i as u64, *t as f64 / 10.0));
            }

            let mut last = Time::ZERO;
            let mut popped = 0;
            loop {
                let bag = table.pop_event();
                if bag.is_empty() {
                    break;
                }
                prop_assert!(bag.time() >= last);
                last = bag.time();
                popped += bag.len();
            }
            prop_assert_eq!(popped, times.len());
        }
    }
}
