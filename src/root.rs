//! Root coordinator: drives a `Coordinator` over a simulated interval.
//!
//! One call to [`RootCoordinator::run`] is one coordinator step. The
//! loop is synchronous and single-threaded; stopping early is just not
//! calling `run` again, but `finish` must still be called once.

use tracing::info;

use crate::config::ExperimentConfig;
use crate::coordinator::Coordinator;
use crate::error::{DevsError, DevsResult};
use crate::time::Time;

/// Top-level simulation driver.
#[derive(Debug)]
pub struct RootCoordinator {
    coordinator: Coordinator,
    begin: Time,
    end: Time,
    steps: u64,
    initialised: bool,
}

impl RootCoordinator {
    /// Drive `coordinator` over `[begin, begin + duration]`.
    pub fn new(coordinator: Coordinator, begin: Time, duration: Time) -> Self {
        RootCoordinator {
            coordinator,
            begin,
            end: begin + duration,
            steps: 0,
            initialised: false,
        }
    }

    /// Validate `config`, register its views and take its interval.
    pub fn from_config(mut coordinator: Coordinator, config: &ExperimentConfig) -> DevsResult<Self> {
        config.validate()?;
        for view in &config.views {
            coordinator.add_view(&view.name, view.kind, view.output.open()?)?;
        }
        Ok(RootCoordinator::new(
            coordinator,
            config.begin_time(),
            Time::new(config.duration),
        ))
    }

    /// Create the simulators and schedule their first events.
    pub fn init(&mut self) -> DevsResult<()> {
        if self.initialised {
            return Err(DevsError::Internal("root coordinator already initialised".into()));
        }
        self.initialised = true;
        self.coordinator.init(self.begin)?;
        info!(begin = %self.begin, end = %self.end, "simulation started");
        Ok(())
    }

    pub fn current_time(&self) -> Time {
        self.coordinator.current_time()
    }

    /// End of the simulated interval.
    pub fn end_time(&self) -> Time {
        self.end
    }

    /// Coordinator steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut Coordinator {
        &mut self.coordinator
    }

    /// `true` once nothing is left to do inside the interval.
    pub fn is_finished(&self) -> bool {
        let next = self.coordinator.next_time();
        next.is_infinity() || next > self.end
    }

    /// Execute one coordinator step.
    ///
    /// Returns `false`, without stepping, once the next event is beyond
    /// the end of the interval or nothing is scheduled.
    pub fn run(&mut self) -> DevsResult<bool> {
        if !self.initialised {
            return Err(DevsError::Internal("run called before init".into()));
        }
        if self.is_finished() {
            return Ok(false);
        }
        self.coordinator.run()?;
        self.steps += 1;
        Ok(true)
    }

    /// Step until the interval is exhausted **or** `max_steps` steps
    /// have run, whichever comes first.
    ///
    /// Returns the number of steps taken in this call.
    pub fn run_for(&mut self, max_steps: u64) -> DevsResult<u64> {
        let start = self.steps;
        while self.steps - start < max_steps {
            if !self.run()? {
                break;
            }
        }
        Ok(self.steps - start)
    }

    /// Step until the interval is exhausted. Never returns when a model
    /// keeps scheduling events inside an infinite interval.
    pub fn run_to_end(&mut self) -> DevsResult<u64> {
        let start = self.steps;
        while self.run()? {}
        Ok(self.steps - start)
    }

    /// Flush the views and call every model's `finish`. Must be called
    /// exactly once.
    pub fn finish(&mut self) -> DevsResult<()> {
        self.coordinator.finish()?;
        info!(time = %self.current_time(), steps = self.steps, "simulation ended");
        Ok(())
    }

    /// Consume the driver, returning the coordinator for inspection.
    pub fn into_coordinator(self) -> Coordinator {
        self.coordinator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use crate::factory::ModelFactory;
    use crate::graph::{AtomicNode, ModelGraph};
    use crate::output::Storage;
    use crate::simulator::{Beep, Behavior};
    use crate::value::Value;
    use crate::view::ViewKind;

    fn coordinator() -> Coordinator {
        let mut factory = ModelFactory::new();
        factory
            .add_dynamics("beep", |_, events| Ok(Behavior::atomic(Beep::from_init(events)?)))
            .unwrap();
        let mut observed = crate::factory::Observable::new();
        observed.insert("value".into(), vec!["every".into()]);
        factory.add_observable("obs", observed).unwrap();

        let mut graph = ModelGraph::new("top");
        let root = graph.root();
        graph
            .add_atomic(
                root,
                "a",
                &[],
                &["out"],
                AtomicNode::new("beep").with_observable("obs"),
            )
            .unwrap();
        Coordinator::new(graph, factory)
    }

    /// `coordinator()` with `every` registered as an event view.
    fn coordinator_with_event_view() -> Coordinator {
        let mut coordinator = coordinator();
        coordinator
            .add_view("every", ViewKind::Event, Box::new(Storage::new()))
            .unwrap();
        coordinator
    }

    #[test]
    fn test_run_stops_at_end_of_interval() {
        let config = ExperimentConfig::new("exp")
            .with_duration(5.0)
            .with_view(ViewConfig::timed("every", 1.0));
        let mut root = RootCoordinator::from_config(coordinator(), &config).unwrap();
        root.init().unwrap();
        root.run_to_end().unwrap();

        assert!(root.is_finished());
        assert!(!root.run().unwrap());
        assert_eq!(root.current_time(), Time::new(5.0));
        root.finish().unwrap();

        let coordinator = root.into_coordinator();
        assert_eq!(coordinator.dynamics::<Beep>("top:a").unwrap().emitted, 5);
        let storage = coordinator.output::<Storage>("every").unwrap();
        assert_eq!(storage.rows().len(), 6);
        assert_eq!(
            storage.rows().last().unwrap().get("top:a.value"),
            Some(&Value::Integer(5))
        );
    }

    #[test]
    fn test_run_for_respects_step_budget() {
        let mut root = RootCoordinator::new(coordinator_with_event_view(), Time::ZERO, Time::INFINITY);
        root.init().unwrap();
        assert_eq!(root.run_for(3).unwrap(), 3);
        assert_eq!(root.current_time(), Time::new(3.0));
        assert_eq!(root.steps(), 3);
        assert!(!root.is_finished());

        let storage = root.coordinator().output::<Storage>("every").unwrap();
        assert_eq!(
            storage.column("top:a.value"),
            vec![
                (Time::new(1.0), Some(Value::Integer(1))),
                (Time::new(2.0), Some(Value::Integer(2))),
                (Time::new(3.0), Some(Value::Integer(3))),
            ]
        );
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut root = RootCoordinator::new(coordinator_with_event_view(), Time::ZERO, Time::new(1.0));
        assert!(root.run().is_err());
        root.init().unwrap();
        assert!(root.init().is_err());
        root.finish().unwrap();
        assert!(root.finish().is_err());
    }
}
