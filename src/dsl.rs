//! Fluent builder DSL for experiment setup.
//!
//! Hides the boilerplate of filling a `ModelGraph` and a `ModelFactory`,
//! registering views and wiring a `RootCoordinator`. Models are named
//! by path (`top:sub:a`), the root being the name given to `new`.

use std::collections::BTreeMap;

use crate::config::{ExperimentConfig, OutputConfig, ViewConfig};
use crate::coordinator::Coordinator;
use crate::error::{DevsError, DevsResult};
use crate::factory::{Condition, ModelFactory, Observable};
use crate::graph::{AtomicNode, ModelGraph, ModelId};
use crate::root::RootCoordinator;
use crate::simulator::{Beep, Behavior, Counter, DynamicsInit, InitEventList, Janitor};
use crate::value::Value;

// ── ExperimentBuilder ─────────────────────────────────────────────────

/// Fluent builder for a `RootCoordinator`.
///
/// Errors are recorded as they happen and reported by `build`, so the
/// chain itself never fails.
///
/// # Example
/// ```rust
/// use orrery::dsl::ExperimentBuilder;
/// use orrery::{Beep, Counter, Value};
///
/// let mut root = ExperimentBuilder::new("top")
///     .with_builtins()
///     .duration(5.0)
///     .condition("fast", &[("period", Value::Double(0.5))])
///     .atomic("top", "gen", &[], &["out"], "beep", &["fast"])
///     .atomic("top", "sink", &["in"], &[], "counter", &[])
///     .connect("top:gen", "out", "top:sink", "in")
///     .build()
///     .unwrap();
///
/// root.init().unwrap();
/// root.run_to_end().unwrap();
/// root.finish().unwrap();
///
/// let coordinator = root.coordinator();
/// assert_eq!(coordinator.dynamics::<Beep>("top:gen").unwrap().emitted, 10);
/// assert_eq!(coordinator.dynamics::<Counter>("top:sink").unwrap().count, 10);
/// ```
pub struct ExperimentBuilder {
    config: ExperimentConfig,
    graph: ModelGraph,
    factory: ModelFactory,
    observables: BTreeMap<String, Observable>,
    error: Option<DevsError>,
}

impl ExperimentBuilder {
    /// A builder whose root coupled model is called `root`.
    pub fn new(root: &str) -> Self {
        ExperimentBuilder {
            config: ExperimentConfig::new(root),
            graph: ModelGraph::new(root),
            factory: ModelFactory::new(),
            observables: BTreeMap::new(),
            error: None,
        }
    }

    fn record<T>(&mut self, result: DevsResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.error.get_or_insert(e);
                None
            }
        }
    }

    // ── Experiment ────────────────────────────────────────────

    pub fn name(mut self, name: &str) -> Self {
        self.config.name = name.to_string();
        self
    }

    pub fn begin(mut self, begin: f64) -> Self {
        self.config.begin = begin;
        self
    }

    pub fn duration(mut self, duration: f64) -> Self {
        self.config.duration = duration;
        self
    }

    // ── Factory ───────────────────────────────────────────────

    /// Register a dynamics factory.
    pub fn dynamics<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&DynamicsInit, &InitEventList) -> DevsResult<Behavior> + 'static,
    {
        let result = self.factory.add_dynamics(name, factory);
        self.record(result);
        self
    }

    /// Register the built-in models as `beep`, `counter` and `janitor`.
    pub fn with_builtins(self) -> Self {
        self.dynamics("beep", |_, events| Ok(Behavior::atomic(Beep::from_init(events)?)))
            .dynamics("counter", |_, _| Ok(Behavior::atomic(Counter::new())))
            .dynamics("janitor", |_, events| {
                Ok(Behavior::executive(Janitor::from_init(events)?))
            })
    }

    pub fn condition(mut self, name: &str, values: &[(&str, Value)]) -> Self {
        let condition: Condition = values
            .iter()
            .map(|(port, value)| (port.to_string(), value.clone()))
            .collect();
        let result = self.factory.add_condition(name, condition);
        self.record(result);
        self
    }

    /// Observe `port` in every view of `views`, under the observable
    /// `name`. Repeated calls with the same name add ports.
    pub fn observable(mut self, name: &str, port: &str, views: &[&str]) -> Self {
        self.observables
            .entry(name.to_string())
            .or_default()
            .insert(
                port.to_string(),
                views.iter().map(|v| v.to_string()).collect(),
            );
        self
    }

    /// Register a class template for `create_model_from_class`.
    pub fn class(mut self, name: &str, template: ModelGraph) -> Self {
        let result = self.factory.add_class(name, template);
        self.record(result);
        self
    }

    // ── Graph ─────────────────────────────────────────────────

    fn parent(&mut self, path: &str) -> Option<ModelId> {
        let result = self.graph.find(path);
        self.record(result)
    }

    pub fn coupled(mut self, parent: &str, name: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        if let Some(parent) = self.parent(parent) {
            let result = self.graph.add_coupled(parent, name, inputs, outputs);
            self.record(result);
        }
        self
    }

    /// Add an atomic model using the dynamics `dynamics` and the listed
    /// conditions.
    pub fn atomic(
        mut self,
        parent: &str,
        name: &str,
        inputs: &[&str],
        outputs: &[&str],
        dynamics: &str,
        conditions: &[&str],
    ) -> Self {
        let mut atomic = AtomicNode::new(dynamics);
        for condition in conditions {
            atomic = atomic.with_condition(*condition);
        }
        self.atomic_node(parent, name, inputs, outputs, atomic)
    }

    /// Add an atomic model from a fully described node.
    pub fn atomic_node(
        mut self,
        parent: &str,
        name: &str,
        inputs: &[&str],
        outputs: &[&str],
        atomic: AtomicNode,
    ) -> Self {
        if let Some(parent) = self.parent(parent) {
            let result = self.graph.add_atomic(parent, name, inputs, outputs, atomic);
            self.record(result);
        }
        self
    }

    /// Connect two models by path.
    pub fn connect(mut self, src: &str, src_port: &str, dst: &str, dst_port: &str) -> Self {
        let ends = self
            .graph
            .find(src)
            .and_then(|s| self.graph.find(dst).map(|d| (s, d)));
        if let Some((src, dst)) = self.record(ends) {
            let result = self.graph.add_connection(src, src_port, dst, dst_port);
            self.record(result);
        }
        self
    }

    // ── Views ─────────────────────────────────────────────────

    pub fn view(mut self, view: ViewConfig) -> Self {
        self.config.views.push(view);
        self
    }

    pub fn timed_view(self, name: &str, step: f64) -> Self {
        self.view(ViewConfig::timed(name, step))
    }

    pub fn event_view(self, name: &str) -> Self {
        self.view(ViewConfig::event(name))
    }

    pub fn finish_view(self, name: &str) -> Self {
        self.view(ViewConfig::finish(name))
    }

    /// Send the last added view to `output` instead of memory.
    pub fn output(mut self, output: OutputConfig) -> Self {
        match self.config.views.last_mut() {
            Some(view) => view.output = output,
            None => {
                self.error
                    .get_or_insert(DevsError::Internal("output set before any view".into()));
            }
        }
        self
    }

    // ── Build ─────────────────────────────────────────────────

    /// Build the driver. The first error met while building is returned
    /// here.
    pub fn build(mut self) -> DevsResult<RootCoordinator> {
        if let Some(e) = self.error {
            return Err(e);
        }
        for (name, observable) in self.observables {
            self.factory.add_observable(&name, observable)?;
        }
        let coordinator = Coordinator::new(self.graph, self.factory);
        RootCoordinator::from_config(coordinator, &self.config)
    }

    /// Build, init, run to the end of the interval and finish.
    pub fn run(self) -> DevsResult<RootCoordinator> {
        let mut root = self.build()?;
        root.init()?;
        root.run_to_end()?;
        root.finish()?;
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Storage;
    use crate::time::Time;

    #[test]
    fn test_builder_runs_experiment() {
        let root = ExperimentBuilder::new("top")
            .with_builtins()
            .duration(3.0)
            .observable("obs", "count", &["counts"])
            .timed_view("counts", 1.0)
            .coupled("top", "sub", &["in"], &[])
            .atomic("top", "gen", &[], &["out"], "beep", &[])
            .atomic_node(
                "top:sub",
                "sink",
                &["in"],
                &[],
                AtomicNode::new("counter").with_observable("obs"),
            )
            .connect("top:gen", "out", "top:sub", "in")
            .connect("top:sub", "in", "top:sub:sink", "in")
            .run()
            .unwrap();

        let coordinator = root.coordinator();
        assert_eq!(coordinator.dynamics::<Counter>("top:sub:sink").unwrap().count, 3);
        let storage = coordinator.output::<Storage>("counts").unwrap();
        assert_eq!(
            storage.rows_at(Time::new(3.0))[0].get("top:sub:sink.count"),
            Some(&Value::Integer(3))
        );
    }

    #[test]
    fn test_first_error_reported_at_build() {
        let result = ExperimentBuilder::new("top")
            .with_builtins()
            .atomic("nowhere", "a", &[], &[], "beep", &[])
            .atomic("top", "b", &[], &[], "beep", &[])
            .atomic("top", "b", &[], &[], "beep", &[])
            .build();
        assert!(matches!(result, Err(DevsError::Graph(ref m)) if m.contains("nowhere")));
    }

    #[test]
    fn test_output_without_view_is_error() {
        let result = ExperimentBuilder::new("top")
            .output(OutputConfig::Storage)
            .build();
        assert!(matches!(result, Err(DevsError::Internal(_))));
    }
}
