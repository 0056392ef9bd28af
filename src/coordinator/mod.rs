//! Coordinator — drives one discrete-event step per `run()` call.
//!
//! Owns every simulator, the event table, the views and the model
//! graph. Simulators are addressed only by [`SimulatorId`]; events and
//! views never hold a reference to a simulator, which is what makes
//! deferred deletion safe.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`executive`] | [`ExecutiveContext`], structural operations |

pub mod executive;

pub use executive::ExecutiveContext;

use std::collections::BTreeMap;

use tracing::{debug, info, trace, warn};

use crate::bag::{DispatchKind, EventBagModel};
use crate::error::{DevsError, DevsResult};
use crate::event::{
    Event, ExternalEventList, InternalEvent, ObservationEvent, OutputEvents, RequestEvent,
};
use crate::event_table::EventTable;
use crate::factory::ModelFactory;
use crate::graph::{ModelGraph, ModelId};
use crate::output::StreamWriter;
use crate::simulator::{Dynamics, DynamicsInit, Executive, Simulator, SimulatorId, TraceEntry};
use crate::time::Time;
use crate::view::{View, ViewKind};

/// The simulation engine of one model hierarchy.
pub struct Coordinator {
    graph: ModelGraph,
    factory: ModelFactory,
    table: EventTable,

    simulators: BTreeMap<SimulatorId, Simulator>,
    by_model: BTreeMap<ModelId, SimulatorId>,
    next_simulator: u64,

    views: BTreeMap<String, View>,
    /// Observation events held back until time moves past them.
    obs_buffer: Vec<ObservationEvent>,

    /// Cleared simulators waiting for reclamation.
    deleted: Vec<Simulator>,

    current_time: Time,
    started: bool,
    finished: bool,

    /// Append-only trace of every bag dispatched to a simulator.
    pub trace: Vec<TraceEntry>,
}

impl Coordinator {
    pub fn new(graph: ModelGraph, factory: ModelFactory) -> Self {
        Coordinator {
            graph,
            factory,
            table: EventTable::default(),
            simulators: BTreeMap::new(),
            by_model: BTreeMap::new(),
            next_simulator: 0,
            views: BTreeMap::new(),
            obs_buffer: Vec::new(),
            deleted: Vec::new(),
            current_time: Time::ZERO,
            started: false,
            finished: false,
            trace: Vec::new(),
        }
    }

    /// Register a view. Views must be added before `init`.
    pub fn add_view(
        &mut self,
        name: &str,
        kind: ViewKind,
        stream: Box<dyn StreamWriter>,
    ) -> DevsResult<()> {
        if self.started {
            return Err(DevsError::Internal(format!(
                "view `{}` added after init",
                name
            )));
        }
        if self.views.contains_key(name) {
            return Err(DevsError::Internal(format!(
                "view `{}` is already registered",
                name
            )));
        }
        kind.check(name)?;
        self.views
            .insert(name.to_string(), View::new(name, kind, stream));
        Ok(())
    }

    /// Open the views, create a simulator for every atomic model and
    /// schedule their first internal events.
    pub fn init(&mut self, begin: Time) -> DevsResult<()> {
        if self.started {
            return Err(DevsError::Internal("coordinator already initialised".into()));
        }
        self.started = true;
        self.current_time = begin;
        self.table.set_current_time(begin);

        for view in self.views.values_mut() {
            view.open(begin)?;
            if view.is_timed() {
                self.table
                    .put_observation_event(ObservationEvent::for_view(view.name(), begin));
            }
        }

        let atomics = self.graph.atomics_under(self.graph.root())?;
        for model in atomics {
            self.create_simulator(model)?;
        }

        info!(
            time = %begin,
            simulators = self.simulators.len(),
            views = self.views.len(),
            "coordinator initialised"
        );
        Ok(())
    }

    /// Time of the next bag, or `Time::INFINITY` when nothing is
    /// pending.
    pub fn next_time(&self) -> Time {
        self.table.top_event()
    }

    pub fn current_time(&self) -> Time {
        self.current_time
    }

    // ── Main loop ─────────────────────────────────────────────

    /// Process the bag due at the next time.
    pub fn run(&mut self) -> DevsResult<()> {
        if !self.started || self.finished {
            return Err(DevsError::Internal(
                "run called outside init/finish".into(),
            ));
        }

        for shell in self.deleted.drain(..) {
            self.table.del_model_events(shell.id());
            debug!(simulator = %shell.id(), model = shell.name(), "reclaimed simulator");
        }

        let mut bag = self.table.pop_event();
        if !bag.is_empty() {
            debug_assert!(bag.time() >= self.current_time, "time went backward");
            self.current_time = bag.time();
            debug!(
                time = %self.current_time,
                models = bag.len(),
                observations = bag.observations().len(),
                "processing bag"
            );
        }

        let observations = bag.take_observations();
        let simulators = &self.simulators;
        let ordered = bag.into_ordered(|id| simulators.get(&id).is_some_and(Simulator::is_executive));

        for (id, model_bag) in ordered {
            if self.table.is_invalidated(id) || !self.simulators.contains_key(&id) {
                warn!(
                    simulator = %id,
                    time = %self.current_time,
                    "skipping dispatch to deleted simulator"
                );
                continue;
            }
            self.dispatch(id, model_bag)?;
        }

        // The table pops observations only in a bag with no model due, so
        // holding them back needs another event at the same instant. The
        // buffer keeps the flush order correct if that ever happens.
        if !observations.is_empty() {
            if self.next_time() == observations[0].time {
                self.obs_buffer.extend(observations);
            } else {
                self.process_view_events(observations)?;
                let buffered = std::mem::take(&mut self.obs_buffer);
                self.process_view_events(buffered)?;
            }
        } else if let Some(first) = self.obs_buffer.first() {
            if self.next_time() != first.time {
                let buffered = std::mem::take(&mut self.obs_buffer);
                self.process_view_events(buffered)?;
            }
        }

        Ok(())
    }

    /// Flush observations, call every model's `finish` and run the
    /// finish views. Must be called exactly once.
    pub fn finish(&mut self) -> DevsResult<()> {
        if !self.started {
            return Err(DevsError::Internal("finish called before init".into()));
        }
        if self.finished {
            return Err(DevsError::Internal("finish called twice".into()));
        }
        self.finished = true;

        let buffered = std::mem::take(&mut self.obs_buffer);
        self.process_view_events(buffered)?;

        for sim in self.simulators.values_mut() {
            sim.finish();
        }

        let time = self.current_time;
        for view in self.views.values_mut() {
            if view.is_finish() {
                view.run(time, &self.simulators)?;
            }
            view.finish(time)?;
        }

        info!(time = %time, simulators = self.simulators.len(), "simulation finished");
        Ok(())
    }

    // ── Dispatch ──────────────────────────────────────────────

    fn dispatch(&mut self, id: SimulatorId, mut bag: EventBagModel) -> DevsResult<()> {
        let Some(kind) = bag.dispatch_kind() else {
            return Ok(());
        };

        let model = self.simulator_name(id);
        trace!(time = %self.current_time, simulator = %id, model = %model, kind = %kind, "dispatch");
        self.trace.push(TraceEntry {
            time: self.current_time,
            simulator: id,
            model,
            kind,
        });

        match kind {
            DispatchKind::Internal => {
                let internal = bag.take_internal().ok_or_else(|| missing(id, "internal"))?;
                self.process_internal_event(id, internal)?;
            }
            DispatchKind::External => {
                let externals = bag.take_externals();
                self.process_external_events(id, externals)?;
            }
            DispatchKind::Conflict => {
                let internal = bag.take_internal().ok_or_else(|| missing(id, "internal"))?;
                let externals = bag.take_externals();
                self.process_conflict_events(id, internal, externals)?;
            }
            DispatchKind::Request => {
                let requests = bag.take_requests();
                return self.process_request_events(id, requests);
            }
        }

        // Requests sharing the bag with a transition wait for the next
        // run at the same instant.
        for request in bag.take_requests() {
            if self.simulators.contains_key(&id) {
                self.table.put_request_event(request)?;
            }
        }
        Ok(())
    }

    fn process_internal_event(&mut self, id: SimulatorId, event: InternalEvent) -> DevsResult<()> {
        self.emit_output(id)?;

        let next = self.with_simulator(id, |sim, ctx| sim.internal_transition(&event, ctx))?;
        if let Some(next) = next {
            self.table.put_internal_event(next);
        }

        self.process_event_view(id)
    }

    fn process_external_events(&mut self, id: SimulatorId, events: ExternalEventList) -> DevsResult<()> {
        let now = self.current_time;
        let next = self.with_simulator(id, |sim, ctx| sim.external_transition(&events, now, ctx))?;
        if let Some(next) = next {
            self.table.put_internal_event(next);
        }

        self.process_event_view(id)
    }

    fn process_conflict_events(
        &mut self,
        id: SimulatorId,
        event: InternalEvent,
        events: ExternalEventList,
    ) -> DevsResult<()> {
        self.emit_output(id)?;

        let resolution = self.simulator(id)?.confluent_transitions(&event, &events)?;
        trace!(simulator = %id, resolution = %resolution, "confluent transition");

        let next = self.with_simulator(id, |sim, ctx| {
            sim.external_transition_conflict(&event, &events, ctx)
        })?;

        self.process_event_view(id)?;

        if let Some(next) = next {
            self.table.put_internal_event(next);
        }
        Ok(())
    }

    fn process_request_events(&mut self, id: SimulatorId, requests: Vec<RequestEvent>) -> DevsResult<()> {
        let now = self.current_time;
        for request in requests {
            let mut output = OutputEvents::new();
            self.simulators
                .get_mut(&id)
                .ok_or_else(|| unknown_simulator(id))?
                .request(&request, now, &mut output)?;
            self.dispatch_external_events(id, output)?;
        }
        Ok(())
    }

    fn emit_output(&mut self, id: SimulatorId) -> DevsResult<()> {
        let mut output = OutputEvents::new();
        self.simulator(id)?.output(self.current_time, &mut output)?;
        self.dispatch_external_events(id, output)
    }

    /// Route the output of `source` to every connected input port, at
    /// the current time.
    fn dispatch_external_events(&mut self, source: SimulatorId, output: OutputEvents) -> DevsResult<()> {
        if output.is_empty() {
            return Ok(());
        }
        let model = self.simulator(source)?.model();
        let now = self.current_time;

        for event in output.into_events() {
            match event {
                Event::External(e) => {
                    for (target, port) in self.graph.atomic_targets(model, &e.port_name) {
                        if let Some(&sid) = self.by_model.get(&target) {
                            self.table.put_external_event(e.routed(now, sid, &port))?;
                        }
                    }
                }
                Event::Request(r) => {
                    for (target, port) in self.graph.atomic_targets(model, &r.port_name) {
                        if let Some(&sid) = self.by_model.get(&target) {
                            self.table.put_request_event(r.routed(now, sid, &port))?;
                        }
                    }
                }
                other => {
                    return Err(DevsError::Modelling(format!(
                        "model `{}` emitted a {} event as output",
                        self.simulator_name(source),
                        other.kind()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Run `f` on a simulator. Executives are taken out of the map for
    /// the duration of the call and get a context on the coordinator.
    fn with_simulator<R>(
        &mut self,
        id: SimulatorId,
        f: impl FnOnce(&mut Simulator, Option<&mut ExecutiveContext<'_>>) -> DevsResult<R>,
    ) -> DevsResult<R> {
        let is_executive = self.simulator(id)?.is_executive();
        if !is_executive {
            let sim = self.simulators.get_mut(&id).ok_or_else(|| unknown_simulator(id))?;
            return f(sim, None);
        }

        let mut sim = self.simulators.remove(&id).ok_or_else(|| unknown_simulator(id))?;
        let result = {
            let mut ctx = ExecutiveContext::new(self, id, sim.model());
            f(&mut sim, Some(&mut ctx))
        };
        // The executive may have renamed itself.
        if let Ok(path) = self.graph.path(sim.model()) {
            sim.set_name(path);
        }
        self.simulators.insert(id, sim);
        result
    }

    // ── Views ─────────────────────────────────────────────────

    /// Run every event view observing `id`.
    fn process_event_view(&mut self, id: SimulatorId) -> DevsResult<()> {
        let time = self.current_time;
        for view in self.views.values_mut() {
            if view.is_event() && view.exists(id) {
                view.run(time, &self.simulators)?;
            }
        }
        Ok(())
    }

    /// Run the views named by `events`, once per view and time, and
    /// reschedule the timed ones.
    fn process_view_events(&mut self, mut events: Vec<ObservationEvent>) -> DevsResult<()> {
        events.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.view.cmp(&b.view)));
        events.dedup_by(|a, b| a.time == b.time && a.view == b.view);

        for event in events {
            let view = self.views.get_mut(&event.view).ok_or_else(|| {
                DevsError::Internal(format!("view `{}` is unknown", event.view))
            })?;
            view.run(event.time, &self.simulators)?;
            if let Some(next) = view.next_time(event.time) {
                self.table
                    .put_observation_event(ObservationEvent::for_view(event.view.clone(), next));
            }
        }
        Ok(())
    }

    // ── Structure ─────────────────────────────────────────────

    /// Build the simulator of an atomic model, register its observables
    /// and schedule its first internal event.
    pub(crate) fn create_simulator(&mut self, model: ModelId) -> DevsResult<SimulatorId> {
        if self.by_model.contains_key(&model) {
            return Err(DevsError::Internal(format!(
                "model `{}` already has a simulator",
                self.graph.path(model)?
            )));
        }

        let atomic = self.graph.atomic(model)?.clone();
        let path = self.graph.path(model)?;
        let events = self.factory.init_events(&atomic.conditions)?;
        let behavior = self.factory.build(
            &atomic.dynamics,
            &DynamicsInit {
                model,
                name: path.clone(),
            },
            &events,
        )?;

        let id = SimulatorId::new(self.next_simulator);
        self.next_simulator += 1;
        self.simulators
            .insert(id, Simulator::new(id, model, path.clone(), behavior));
        self.by_model.insert(model, id);

        if let Some(name) = &atomic.observable {
            let observable = self.factory.observable(name)?.clone();
            for (port, views) in observable {
                for view in views {
                    self.views
                        .get_mut(&view)
                        .ok_or_else(|| {
                            DevsError::Internal(format!("view `{}` is unknown", view))
                        })?
                        .add_observable(id, &path, &port);
                }
            }
        }

        let now = self.current_time;
        if let Some(first) = self.with_simulator(id, |sim, ctx| sim.init(now, ctx))? {
            self.table.put_internal_event(first);
        }

        debug!(simulator = %id, model = %path, time = %now, "created simulator");
        Ok(id)
    }

    /// Delete `model` and, for a coupled model, everything below it.
    /// Simulators are cleared now and reclaimed during the next `run`.
    pub(crate) fn delete_model(&mut self, model: ModelId) -> DevsResult<()> {
        for atomic in self.graph.atomics_under(model)? {
            self.delete_simulator(atomic)?;
        }
        self.graph.remove(model)
    }

    fn delete_simulator(&mut self, model: ModelId) -> DevsResult<()> {
        let id = self.by_model.remove(&model).ok_or_else(|| {
            DevsError::Modelling(format!("cannot delete unknown atomic model {}", model))
        })?;
        let mut sim = self.simulators.remove(&id).ok_or_else(|| unknown_simulator(id))?;

        for view in self.views.values_mut() {
            view.remove_observable(id);
        }
        self.table.invalidate_model(id);
        sim.clear();

        debug!(simulator = %id, model = sim.name(), time = %self.current_time, "deleted simulator");
        self.deleted.push(sim);
        Ok(())
    }

    /// Propagate a rename of `model` to the simulators below it.
    pub(crate) fn refresh_names(&mut self, model: ModelId) -> DevsResult<()> {
        for atomic in self.graph.atomics_under(model)? {
            let Some(&id) = self.by_model.get(&atomic) else {
                continue;
            };
            let path = self.graph.path(atomic)?;
            for view in self.views.values_mut() {
                view.rename_observable(id, &path);
            }
            if let Some(sim) = self.simulators.get_mut(&id) {
                sim.set_name(path);
            }
        }
        Ok(())
    }

    pub(crate) fn add_observable_to_view(
        &mut self,
        model: ModelId,
        port: &str,
        view: &str,
    ) -> DevsResult<()> {
        let id = *self.by_model.get(&model).ok_or_else(|| {
            DevsError::Internal(format!("model {} has no simulator", model))
        })?;
        let path = self.graph.path(model)?;
        self.views
            .get_mut(view)
            .ok_or_else(|| DevsError::Internal(format!("view `{}` is unknown", view)))?
            .add_observable(id, &path, port);
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn graph(&self) -> &ModelGraph {
        &self.graph
    }

    pub fn factory(&self) -> &ModelFactory {
        &self.factory
    }

    pub fn event_table(&self) -> &EventTable {
        &self.table
    }

    pub fn simulator(&self, id: SimulatorId) -> DevsResult<&Simulator> {
        self.simulators.get(&id).ok_or_else(|| unknown_simulator(id))
    }

    /// The live simulator of the model at `path`.
    pub fn simulator_by_path(&self, path: &str) -> Option<&Simulator> {
        let model = self.graph.find(path).ok()?;
        self.simulators.get(self.by_model.get(&model)?)
    }

    /// Downcast the dynamics of the model at `path` for inspection.
    pub fn dynamics<T: Dynamics + 'static>(&self, path: &str) -> Option<&T> {
        self.simulator_by_path(path)?
            .behavior()?
            .as_any()
            .downcast_ref::<T>()
    }

    /// Downcast the executive of the model at `path` for inspection.
    pub fn executive<T: Executive + 'static>(&self, path: &str) -> Option<&T> {
        self.simulator_by_path(path)?
            .behavior()?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn simulator_count(&self) -> usize {
        self.simulators.len()
    }

    /// Deleted simulators not reclaimed yet.
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    /// Downcast the stream writer of a view for inspection.
    pub fn output<T: StreamWriter + 'static>(&self, view: &str) -> Option<&T> {
        self.views.get(view)?.output::<T>()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn simulator_name(&self, id: SimulatorId) -> String {
        self.simulators
            .get(&id)
            .map(|s| s.name().to_string())
            .unwrap_or_else(|| id.to_string())
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("current_time", &self.current_time)
            .field("simulators", &self.simulators.len())
            .field("views", &self.views.keys().collect::<Vec<_>>())
            .field("pending", &self.table.event_count())
            .finish()
    }
}

fn unknown_simulator(id: SimulatorId) -> DevsError {
    DevsError::Internal(format!("simulator {} does not exist", id))
}

fn missing(id: SimulatorId, what: &str) -> DevsError {
    DevsError::Internal(format!("bag of {} lost its {} event", id, what))
}
