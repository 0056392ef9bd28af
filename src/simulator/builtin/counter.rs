//! `Counter` — a passive sink that counts what it receives.

use crate::error::DevsResult;
use crate::event::{ExternalEvent, ExternalEventList, ObservationEvent, OutputEvents, RequestEvent};
use crate::simulator::dynamics::Dynamics;
use crate::time::Time;
use crate::value::Value;

/// Counts received events and answers requests with its count.
///
/// Never schedules itself. Observable port `count` reports the number
/// of events received so far. A request on any port is answered with
/// an event on `reply` carrying `count`.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    pub count: i64,
    /// Calls to `external_transition`.
    pub externals: usize,
    pub requests: usize,
    pub finished: usize,
    /// Every received event, in arrival order.
    pub received: Vec<ExternalEvent>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dynamics for Counter {
    fn external_transition(&mut self, events: &ExternalEventList, _time: Time) -> DevsResult<()> {
        self.externals += 1;
        self.count += events.len() as i64;
        self.received.extend(events.iter().cloned());
        Ok(())
    }

    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        event.on_port("count").then(|| Value::Integer(self.count))
    }

    fn request(
        &mut self,
        _event: &RequestEvent,
        _time: Time,
        output: &mut OutputEvents,
    ) -> DevsResult<()> {
        self.requests += 1;
        output.event("reply").set("count", self.count);
        Ok(())
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
    fn test_counts_batches() {
        let mut counter = Counter::new();
        let batch = vec![ExternalEvent::new("in"), ExternalEvent::new("in")];
        counter.external_transition(&batch, Time::new(1.0)).unwrap();
        assert_eq!(counter.count, 2);
        assert_eq!(counter.externals, 1);
        assert!(counter.time_advance().is_infinity());
    }

    #[test]
    fn test_request_replies_with_count() {
        let mut counter = Counter::new();
        counter.count = 7;
        let mut out = OutputEvents::new();
        counter
            .request(&RequestEvent::new("ask"), Time::ZERO, &mut out)
            .unwrap();
        assert_eq!(out.len(), 1);
        match &out.into_events()[0] {
            crate::event::Event::External(e) => {
                assert!(e.on_port("reply"));
                assert_eq!(e.get_integer("count"), Some(7));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
