//! Views: observation policies feeding stream writers.
//!
//! One [`View`] type carries a [`ViewKind`] tag instead of three
//! separate view types:
//!
//! - `Timed` views are driven by observation events in the event table
//!   and reschedule themselves every `step`.
//! - `Event` views run after every transition of an observed model.
//! - `Finish` views run once, from `Coordinator::finish`.

use std::collections::BTreeMap;

use crate::error::{DevsError, DevsResult};
use crate::event::ObservationEvent;
use crate::output::{Row, StreamWriter};
use crate::simulator::{Simulator, SimulatorId};
use crate::time::Time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ViewKind {
    Timed { step: Time },
    Event,
    Finish,
}

impl ViewKind {
    /// A timed step must be positive and finite, or time would stall or
    /// run backward.
    pub fn check(&self, view: &str) -> DevsResult<()> {
        if let ViewKind::Timed { step } = *self {
            if step <= Time::ZERO || step.is_infinity() {
                return Err(DevsError::Internal(format!(
                    "view `{}`: timed step must be positive and finite",
                    view
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewKind::Timed { step } => write!(f, "timed({})", step.value()),
            ViewKind::Event => write!(f, "event"),
            ViewKind::Finish => write!(f, "finish"),
        }
    }
}

/// One observed port of one simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observable {
    pub simulator: SimulatorId,
    /// Full model path, used as the column prefix.
    pub model: String,
    pub port: String,
}

impl Observable {
    pub fn column(&self) -> String {
        format!("{}.{}", self.model, self.port)
    }
}

/// A named observation policy writing to its own stream.
pub struct View {
    name: String,
    kind: ViewKind,
    stream: Box<dyn StreamWriter>,
    observables: Vec<Observable>,
    runs: usize,
}

impl View {
    pub fn new(name: impl Into<String>, kind: ViewKind, stream: Box<dyn StreamWriter>) -> Self {
        View {
            name: name.into(),
            kind,
            stream,
            observables: Vec::new(),
            runs: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn is_timed(&self) -> bool {
        matches!(self.kind, ViewKind::Timed { .. })
    }

    pub fn is_event(&self) -> bool {
        matches!(self.kind, ViewKind::Event)
    }

    pub fn is_finish(&self) -> bool {
        matches!(self.kind, ViewKind::Finish)
    }

    /// Number of rows written so far.
    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn observables(&self) -> &[Observable] {
        &self.observables
    }

    pub fn stream(&self) -> &dyn StreamWriter {
        self.stream.as_ref()
    }

    /// Downcast the stream writer for inspection.
    pub fn output<T: StreamWriter + 'static>(&self) -> Option<&T> {
        self.stream.as_any().downcast_ref::<T>()
    }

    pub fn open(&mut self, time: Time) -> DevsResult<()> {
        self.stream.open(&self.name, time)
    }

    /// Observe `port` of `simulator`. Adding the same pair twice is a
    /// no-op.
    pub fn add_observable(&mut self, simulator: SimulatorId, model: &str, port: &str) {
        if !self.exists_port(simulator, port) {
            self.observables.push(Observable {
                simulator,
                model: model.to_string(),
                port: port.to_string(),
            });
        }
    }

    /// Stop observing every port of `simulator`.
    pub fn remove_observable(&mut self, simulator: SimulatorId) {
        self.observables.retain(|o| o.simulator != simulator);
    }

    /// Follow a model rename.
    pub fn rename_observable(&mut self, simulator: SimulatorId, model: &str) {
        for o in self.observables.iter_mut().filter(|o| o.simulator == simulator) {
            o.model = model.to_string();
        }
    }

    pub fn exists(&self, simulator: SimulatorId) -> bool {
        self.observables.iter().any(|o| o.simulator == simulator)
    }

    pub fn exists_port(&self, simulator: SimulatorId, port: &str) -> bool {
        self.observables
            .iter()
            .any(|o| o.simulator == simulator && o.port == port)
    }

    /// Time of the next table-driven run after one at `current`. Only
    /// timed views have one.
    pub fn next_time(&self, current: Time) -> Option<Time> {
        match self.kind {
            ViewKind::Timed { step } => Some(current + step),
            ViewKind::Event | ViewKind::Finish => None,
        }
    }

    /// Sample every observable and write one row.
    pub fn run(&mut self, time: Time, simulators: &BTreeMap<SimulatorId, Simulator>) -> DevsResult<()> {
        let request = ObservationEvent::for_view(self.name.clone(), time);
        let values = self
            .observables
            .iter()
            .map(|o| {
                let value = simulators
                    .get(&o.simulator)
                    .and_then(|s| s.observation(&request.for_port(o.simulator, &o.port)));
                (o.column(), value)
            })
            .collect();

        self.stream.write(&Row { time, values })?;
        self.runs += 1;
        Ok(())
    }

    /// Close the stream.
    pub fn finish(&mut self, time: Time) -> DevsResult<()> {
        self.stream.close(time)
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("observables", &self.observables)
            .field("runs", &self.runs)
            .finish()
    }
}
