//! `ExecutiveContext` — the structural privileges of an executive model.
//!
//! A context is built by the coordinator around every state-changing
//! call into an executive. Model names are resolved relative to the
//! coupled model holding the executive: a name is either one of its
//! children or the coupled model itself.

use tracing::debug;

use crate::error::{DevsError, DevsResult};
use crate::factory::{Condition, Observable};
use crate::graph::{AtomicNode, ModelId};
use crate::simulator::{Behavior, DynamicsInit, InitEventList, SimulatorId};
use crate::time::Time;

use super::Coordinator;

/// Handle on the coordinator given to an executive for one call.
pub struct ExecutiveContext<'a> {
    coordinator: &'a mut Coordinator,
    executive: SimulatorId,
    /// The atomic model of the executive itself.
    model: ModelId,
}

impl<'a> ExecutiveContext<'a> {
    pub(crate) fn new(coordinator: &'a mut Coordinator, executive: SimulatorId, model: ModelId) -> Self {
        ExecutiveContext {
            coordinator,
            executive,
            model,
        }
    }

    pub fn current_time(&self) -> Time {
        self.coordinator.current_time
    }

    /// The simulator running the executive.
    pub fn executive(&self) -> SimulatorId {
        self.executive
    }

    fn parent(&self) -> DevsResult<ModelId> {
        self.coordinator.graph.parent(self.model)?.ok_or_else(|| {
            DevsError::Internal("executive model has no parent coupled model".into())
        })
    }

    /// Full path of the coupled model holding the executive.
    pub fn coupled_model_name(&self) -> DevsResult<String> {
        self.coordinator.graph.path(self.parent()?)
    }

    /// Names of every model in the coupled model, the executive included.
    pub fn model_names(&self) -> DevsResult<Vec<String>> {
        let graph = &self.coordinator.graph;
        let children = graph.children(self.parent()?)?;
        children
            .into_iter()
            .map(|id| graph.name(id).map(str::to_string))
            .collect()
    }

    /// A child of the coupled model by name.
    fn sibling(&self, name: &str) -> DevsResult<ModelId> {
        self.coordinator.graph.child(self.parent()?, name)
    }

    /// A child by name, falling back to the coupled model itself.
    fn endpoint(&self, name: &str) -> DevsResult<ModelId> {
        let parent = self.parent()?;
        let graph = &self.coordinator.graph;
        match graph.child(parent, name) {
            Ok(id) => Ok(id),
            Err(e) => {
                if graph.name(parent)? == name {
                    Ok(parent)
                } else {
                    Err(e)
                }
            }
        }
    }

    // ── Models ────────────────────────────────────────────────

    /// Add an atomic model to the coupled model and start its simulator
    /// at the current time.
    pub fn create_model(
        &mut self,
        name: &str,
        inputs: &[&str],
        outputs: &[&str],
        dynamics: &str,
        conditions: &[&str],
        observable: Option<&str>,
    ) -> DevsResult<ModelId> {
        if !self.coordinator.factory.has_dynamics(dynamics) {
            return Err(DevsError::Modelling(format!(
                "cannot create `{}`: unknown dynamics `{}`",
                name, dynamics
            )));
        }

        let mut atomic = AtomicNode::new(dynamics);
        for condition in conditions {
            atomic = atomic.with_condition(*condition);
        }
        if let Some(observable) = observable {
            atomic = atomic.with_observable(observable);
        }

        let parent = self.parent()?;
        let model = self
            .coordinator
            .graph
            .add_atomic(parent, name, inputs, outputs, atomic)?;
        self.coordinator.create_simulator(model)?;

        debug!(model = name, dynamics, time = %self.current_time(), "executive created model");
        Ok(model)
    }

    /// Instantiate the registered class `class` as the child `name`.
    pub fn create_model_from_class(&mut self, class: &str, name: &str) -> DevsResult<ModelId> {
        let template = self.coordinator.factory.class(class)?.clone();
        let parent = self.parent()?;
        let root = self.coordinator.graph.graft(parent, name, &template)?;

        for atomic in self.coordinator.graph.atomics_under(root)? {
            self.coordinator.create_simulator(atomic)?;
        }

        debug!(model = name, class, time = %self.current_time(), "executive instantiated class");
        Ok(root)
    }

    /// Delete the child `name` and everything below it. Its simulators
    /// stop receiving events at once and are reclaimed on the next run.
    pub fn del_model(&mut self, name: &str) -> DevsResult<()> {
        let model = self.sibling(name)?;
        if model == self.model {
            return Err(DevsError::Modelling(format!(
                "executive `{}` cannot delete itself",
                name
            )));
        }
        self.coordinator.delete_model(model)?;
        debug!(model = name, time = %self.current_time(), "executive deleted model");
        Ok(())
    }

    pub fn rename_model(&mut self, old_name: &str, new_name: &str) -> DevsResult<()> {
        let model = self.sibling(old_name)?;
        self.coordinator.graph.rename(model, new_name)?;
        self.coordinator.refresh_names(model)
    }

    // ── Connections and ports ─────────────────────────────────

    /// Connect `src.src_port` to `dst.dst_port`. Either end may name the
    /// coupled model itself, for input and output connections.
    pub fn add_connection(
        &mut self,
        src: &str,
        src_port: &str,
        dst: &str,
        dst_port: &str,
    ) -> DevsResult<()> {
        let (src, dst) = (self.endpoint(src)?, self.endpoint(dst)?);
        self.coordinator
            .graph
            .add_connection(src, src_port, dst, dst_port)
    }

    pub fn remove_connection(
        &mut self,
        src: &str,
        src_port: &str,
        dst: &str,
        dst_port: &str,
    ) -> DevsResult<()> {
        let (src, dst) = (self.endpoint(src)?, self.endpoint(dst)?);
        self.coordinator
            .graph
            .remove_connection(src, src_port, dst, dst_port)
    }

    pub fn add_input_port(&mut self, model: &str, port: &str) -> DevsResult<()> {
        let id = self.endpoint(model)?;
        self.coordinator.graph.add_input_port(id, port)
    }

    pub fn add_output_port(&mut self, model: &str, port: &str) -> DevsResult<()> {
        let id = self.endpoint(model)?;
        self.coordinator.graph.add_output_port(id, port)
    }

    /// Remove an input port and every connection using it.
    pub fn remove_input_port(&mut self, model: &str, port: &str) -> DevsResult<()> {
        let id = self.endpoint(model)?;
        self.coordinator.graph.remove_input_port(id, port)
    }

    /// Remove an output port and every connection using it.
    pub fn remove_output_port(&mut self, model: &str, port: &str) -> DevsResult<()> {
        let id = self.endpoint(model)?;
        self.coordinator.graph.remove_output_port(id, port)
    }

    // ── Views and registries ──────────────────────────────────

    /// Record `port` of the atomic child `model` in `view`.
    pub fn add_observable_to_view(&mut self, model: &str, port: &str, view: &str) -> DevsResult<()> {
        let id = self.sibling(model)?;
        self.coordinator.add_observable_to_view(id, port, view)
    }

    pub fn add_permanent_dynamics<F>(&mut self, name: &str, factory: F) -> DevsResult<()>
    where
        F: Fn(&DynamicsInit, &InitEventList) -> DevsResult<Behavior> + 'static,
    {
        self.coordinator.factory.add_dynamics(name, factory)
    }

    pub fn add_permanent_condition(&mut self, name: &str, condition: Condition) -> DevsResult<()> {
        self.coordinator.factory.add_condition(name, condition)
    }

    pub fn add_permanent_observable(&mut self, name: &str, observable: Observable) -> DevsResult<()> {
        self.coordinator.factory.add_observable(name, observable)
    }
}
