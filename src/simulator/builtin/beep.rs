//! `Beep` — a periodic generator.

use std::cell::Cell;

use crate::error::{DevsError, DevsResult};
use crate::event::{EventKind, ExternalEventList, ObservationEvent, OutputEvents};
use crate::simulator::dynamics::{Dynamics, InitEventList};
use crate::time::Time;
use crate::value::Value;

/// Emits one event on `out` every `period`, carrying a running `value`.
///
/// Init ports:
/// - `period` (double, default 1.0)
/// - `start` (double, delay of the first beep, default `period`)
/// - `limit` (integer, stop after that many beeps)
/// - `request` (boolean, emit requests instead of plain events)
///
/// Events received on any input port are recorded and do not disturb
/// the schedule. Confluent transitions are applied in one step.
#[derive(Debug, Clone)]
pub struct Beep {
    period: Time,
    start: Time,
    limit: Option<i64>,
    as_request: bool,

    sigma: Time,
    last: Time,

    /// Beeps emitted so far.
    pub emitted: i64,
    pub internals: usize,
    pub externals: usize,
    pub conflicts: usize,
    /// Calls to `confluent_transitions`.
    pub classified: Cell<usize>,
    pub finished: usize,
    /// `(time, port)` of every received event.
    pub received: Vec<(Time, String)>,
}

impl Beep {
    pub fn new(period: f64) -> Self {
        Beep {
            period: Time::new(period),
            start: Time::new(period),
            limit: None,
            as_request: false,
            sigma: Time::INFINITY,
            last: Time::ZERO,
            emitted: 0,
            internals: 0,
            externals: 0,
            conflicts: 0,
            classified: Cell::new(0),
            finished: 0,
            received: Vec::new(),
        }
    }

    /// Build from init ports.
    pub fn from_init(events: &InitEventList) -> DevsResult<Self> {
        let double = |port: &str| -> DevsResult<Option<f64>> {
            match events.get(port) {
                None => Ok(None),
                Some(v) => v.as_double().map(Some).ok_or_else(|| {
                    DevsError::Modelling(format!("beep: `{}` must be a number", port))
                }),
            }
        };

        let period = double("period")?.unwrap_or(1.0);
        if period <= 0.0 {
            return Err(DevsError::Modelling("beep: `period` must be positive".into()));
        }
        let mut beep = Beep::new(period);
        if let Some(start) = double("start")? {
            beep.start = Time::new(start);
        }
        beep.limit = events.get("limit").and_then(Value::as_integer);
        beep.as_request = events
            .get("request")
            .and_then(Value::as_boolean)
            .unwrap_or(false);
        Ok(beep)
    }

    fn exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.emitted >= limit)
    }

    fn beep(&mut self, time: Time) {
        self.emitted += 1;
        self.last = time;
        self.sigma = if self.exhausted() {
            Time::INFINITY
        } else {
            self.period
        };
    }

    fn record(&mut self, events: &ExternalEventList, time: Time) {
        self.received
            .extend(events.iter().map(|e| (time, e.port_name.clone())));
    }
}

impl Dynamics for Beep {
    fn init(&mut self, time: Time) -> DevsResult<Time> {
        self.last = time;
        self.sigma = if self.exhausted() {
            Time::INFINITY
        } else {
            self.start
        };
        Ok(self.sigma)
    }

    fn time_advance(&self) -> Time {
        self.sigma
    }

    fn output(&self, _time: Time, output: &mut OutputEvents) -> DevsResult<()> {
        let value = self.emitted + 1;
        if self.as_request {
            output.request("out").set("value", value);
        } else {
            output.event("out").set("value", value);
        }
        Ok(())
    }

    fn internal_transition(&mut self, time: Time) -> DevsResult<()> {
        self.internals += 1;
        self.beep(time);
        Ok(())
    }

    fn external_transition(&mut self, events: &ExternalEventList, time: Time) -> DevsResult<()> {
        self.externals += 1;
        self.record(events, time);
        if !self.sigma.is_infinity() {
            self.sigma = self.sigma - (time - self.last);
        }
        self.last = time;
        Ok(())
    }

    fn confluent_transitions(&self, _time: Time, _events: &ExternalEventList) -> EventKind {
        self.classified.set(self.classified.get() + 1);
        EventKind::Internal
    }

    fn external_transition_conflict(
        &mut self,
        time: Time,
        events: &ExternalEventList,
    ) -> DevsResult<()> {
        self.conflicts += 1;
        self.record(events, time);
        self.beep(time);
        Ok(())
    }

    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        event.on_port("value").then(|| Value::Integer(self.emitted))
    }

    fn finish(&mut self) {
        self.finished += 1;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_init_reads_ports() {
        let mut init = InitEventList::new();
        init.insert("period".into(), Value::Double(0.5));
        init.insert("limit".into(), Value::Integer(2));
        let mut beep = Beep::from_init(&init).unwrap();
        assert_eq!(beep.init(Time::ZERO).unwrap(), Time::new(0.5));

        beep.internal_transition(Time::new(0.5)).unwrap();
        assert_eq!(beep.time_advance(), Time::new(0.5));
        beep.internal_transition(Time::new(1.0)).unwrap();
        assert!(beep.time_advance().is_infinity());
    }

    #[test]
    fn test_bad_period_rejected() {
        let mut init = InitEventList::new();
        init.insert("period".into(), Value::Double(0.0));
        assert!(matches!(
            Beep::from_init(&init),
            Err(DevsError::Modelling(_))
        ));
    }

    #[test]
    fn test_external_keeps_schedule() {
        let mut beep = Beep::new(2.0);
        beep.init(Time::ZERO).unwrap();
        beep.external_transition(&vec![crate::event::ExternalEvent::new("in")], Time::new(0.5))
            .unwrap();
        assert_eq!(beep.time_advance(), Time::new(1.5));
        assert_eq!(beep.received, vec![(Time::new(0.5), "in".to_string())]);
    }
}
