//! `Simulator` — adapts one behavior to the transition protocol of the
//! coordinator.

use crate::coordinator::ExecutiveContext;
use crate::error::{DevsError, DevsResult};
use crate::event::{
    EventKind, ExternalEventList, InternalEvent, ObservationEvent, OutputEvents, RequestEvent,
};
use crate::graph::ModelId;
use crate::time::Time;
use crate::value::Value;

use super::dynamics::Behavior;
use super::id::SimulatorId;

/// Wraps the behavior of exactly one atomic model.
///
/// Transition methods return the next internal event of the model, or
/// `None` when its time advance is infinite. After [`Simulator::clear`]
/// the behavior is gone and every transition method fails with
/// `DevsError::Internal`.
#[derive(Debug)]
pub struct Simulator {
    id: SimulatorId,
    model: ModelId,
    name: String,
    behavior: Option<Behavior>,
}

fn destroyed(name: &str) -> DevsError {
    DevsError::Internal(format!("simulator `{}` destroyed", name))
}

fn require<'c, 'a>(
    ctx: Option<&'c mut ExecutiveContext<'a>>,
    name: &str,
) -> DevsResult<&'c mut ExecutiveContext<'a>> {
    ctx.ok_or_else(|| {
        DevsError::Internal(format!("executive `{}` called without a context", name))
    })
}

impl Simulator {
    pub fn new(id: SimulatorId, model: ModelId, name: impl Into<String>, behavior: Behavior) -> Self {
        Simulator {
            id,
            model,
            name: name.into(),
            behavior: Some(behavior),
        }
    }

    pub fn id(&self) -> SimulatorId {
        self.id
    }

    /// The atomic model node this simulator wraps.
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Full path of the model, e.g. `top:sub:a`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn is_executive(&self) -> bool {
        self.behavior.as_ref().is_some_and(Behavior::is_executive)
    }

    /// `true` once `clear` has released the behavior.
    pub fn is_cleared(&self) -> bool {
        self.behavior.is_none()
    }

    pub fn behavior(&self) -> Option<&Behavior> {
        self.behavior.as_ref()
    }

    /// Time advance of the model. Negative values are a modelling error.
    pub fn time_advance(&self) -> DevsResult<Time> {
        let ta = match &self.behavior {
            Some(Behavior::Atomic(d)) => d.time_advance(),
            Some(Behavior::Executive(e)) => e.time_advance(),
            None => return Err(destroyed(&self.name)),
        };
        self.check_advance(ta)
    }

    fn check_advance(&self, ta: Time) -> DevsResult<Time> {
        if ta.value() < 0.0 {
            return Err(DevsError::Modelling(format!(
                "negative time advance in `{}` ({})",
                self.name,
                ta.value()
            )));
        }
        Ok(ta)
    }

    fn build_internal_event(&self, time: Time) -> DevsResult<Option<InternalEvent>> {
        let ta = self.time_advance()?;
        if ta.is_infinity() {
            Ok(None)
        } else {
            Ok(Some(InternalEvent::new(time + ta, self.id)))
        }
    }

    /// Initialise the behavior and return its first internal event.
    pub fn init(
        &mut self,
        time: Time,
        ctx: Option<&mut ExecutiveContext<'_>>,
    ) -> DevsResult<Option<InternalEvent>> {
        let ta = match self.behavior.as_mut() {
            Some(Behavior::Atomic(d)) => d.init(time)?,
            Some(Behavior::Executive(e)) => e.init(require(ctx, &self.name)?, time)?,
            None => return Err(destroyed(&self.name)),
        };
        let ta = self.check_advance(ta)?;
        if ta.is_infinity() {
            Ok(None)
        } else {
            Ok(Some(InternalEvent::new(time + ta, self.id)))
        }
    }

    pub fn output(&self, time: Time, output: &mut OutputEvents) -> DevsResult<()> {
        match &self.behavior {
            Some(Behavior::Atomic(d)) => d.output(time, output),
            Some(Behavior::Executive(e)) => e.output(time, output),
            None => Err(destroyed(&self.name)),
        }
    }

    pub fn internal_transition(
        &mut self,
        event: &InternalEvent,
        ctx: Option<&mut ExecutiveContext<'_>>,
    ) -> DevsResult<Option<InternalEvent>> {
        match self.behavior.as_mut() {
            Some(Behavior::Atomic(d)) => d.internal_transition(event.time)?,
            Some(Behavior::Executive(e)) => {
                e.internal_transition(require(ctx, &self.name)?, event.time)?
            }
            None => return Err(destroyed(&self.name)),
        }
        self.build_internal_event(event.time)
    }

    pub fn external_transition(
        &mut self,
        events: &ExternalEventList,
        time: Time,
        ctx: Option<&mut ExecutiveContext<'_>>,
    ) -> DevsResult<Option<InternalEvent>> {
        match self.behavior.as_mut() {
            Some(Behavior::Atomic(d)) => d.external_transition(events, time)?,
            Some(Behavior::Executive(e)) => {
                e.external_transition(require(ctx, &self.name)?, events, time)?
            }
            None => return Err(destroyed(&self.name)),
        }
        self.build_internal_event(time)
    }

    /// Ask the model which component of the confluent transition wins.
    pub fn confluent_transitions(
        &self,
        event: &InternalEvent,
        events: &ExternalEventList,
    ) -> DevsResult<EventKind> {
        match &self.behavior {
            Some(Behavior::Atomic(d)) => Ok(d.confluent_transitions(event.time, events)),
            Some(Behavior::Executive(e)) => Ok(e.confluent_transitions(event.time, events)),
            None => Err(destroyed(&self.name)),
        }
    }

    /// Apply a confluent transition and return the next internal event.
    pub fn external_transition_conflict(
        &mut self,
        event: &InternalEvent,
        events: &ExternalEventList,
        ctx: Option<&mut ExecutiveContext<'_>>,
    ) -> DevsResult<Option<InternalEvent>> {
        match self.behavior.as_mut() {
            Some(Behavior::Atomic(d)) => d.external_transition_conflict(event.time, events)?,
            Some(Behavior::Executive(e)) => {
                e.external_transition_conflict(require(ctx, &self.name)?, event.time, events)?
            }
            None => return Err(destroyed(&self.name)),
        }
        self.build_internal_event(event.time)
    }

    /// Sample an observable port. `None` after `clear`.
    pub fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        match &self.behavior {
            Some(Behavior::Atomic(d)) => d.observation(event),
            Some(Behavior::Executive(e)) => e.observation(event),
            None => None,
        }
    }

    pub fn request(
        &mut self,
        event: &RequestEvent,
        time: Time,
        output: &mut OutputEvents,
    ) -> DevsResult<()> {
        match self.behavior.as_mut() {
            Some(Behavior::Atomic(d)) => d.request(event, time, output),
            Some(Behavior::Executive(e)) => e.request(event, time, output),
            None => Err(destroyed(&self.name)),
        }
    }

    pub fn finish(&mut self) {
        match self.behavior.as_mut() {
            Some(Behavior::Atomic(d)) => d.finish(),
            Some(Behavior::Executive(e)) => e.finish(),
            None => {}
        }
    }

    /// Drop the behavior. The shell stays valid for ID lookups only.
    pub fn clear(&mut self) {
        self.behavior = None;
    }
}
