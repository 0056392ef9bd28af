//! Model factory: the registries behaviors are built from.
//!
//! Atomic models name their dynamics, conditions and observable; the
//! factory resolves those names. Executives may add entries while the
//! simulation runs (`add_permanent_*`).

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{DevsError, DevsResult};
use crate::graph::ModelGraph;
use crate::simulator::{Behavior, DynamicsInit, InitEventList};
use crate::value::Value;

/// Builds the behavior of one atomic model.
pub type DynamicsFactory = Rc<dyn Fn(&DynamicsInit, &InitEventList) -> DevsResult<Behavior>>;

/// Initial values by port name.
pub type Condition = BTreeMap<String, Value>;

/// Observed ports, each with the names of the views recording it.
pub type Observable = BTreeMap<String, Vec<String>>;

/// Registries of dynamics, conditions, observables and classes.
#[derive(Default, Clone)]
pub struct ModelFactory {
    dynamics: BTreeMap<String, DynamicsFactory>,
    conditions: BTreeMap<String, Condition>,
    observables: BTreeMap<String, Observable>,
    classes: BTreeMap<String, ModelGraph>,
}

impl ModelFactory {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration ──────────────────────────────────────────

    pub fn add_dynamics<F>(&mut self, name: &str, factory: F) -> DevsResult<()>
    where
        F: Fn(&DynamicsInit, &InitEventList) -> DevsResult<Behavior> + 'static,
    {
        if self.dynamics.contains_key(name) {
            return Err(DevsError::Internal(format!(
                "dynamics `{}` is already registered",
                name
            )));
        }
        self.dynamics.insert(name.to_string(), Rc::new(factory));
        Ok(())
    }

    pub fn add_condition(&mut self, name: &str, condition: Condition) -> DevsResult<()> {
        if self.conditions.contains_key(name) {
            return Err(DevsError::Internal(format!(
                "condition `{}` is already registered",
                name
            )));
        }
        self.conditions.insert(name.to_string(), condition);
        Ok(())
    }

    pub fn add_observable(&mut self, name: &str, observable: Observable) -> DevsResult<()> {
        if self.observables.contains_key(name) {
            return Err(DevsError::Internal(format!(
                "observable `{}` is already registered",
                name
            )));
        }
        self.observables.insert(name.to_string(), observable);
        Ok(())
    }

    pub fn add_class(&mut self, name: &str, template: ModelGraph) -> DevsResult<()> {
        if self.classes.contains_key(name) {
            return Err(DevsError::Internal(format!(
                "class `{}` is already registered",
                name
            )));
        }
        self.classes.insert(name.to_string(), template);
        Ok(())
    }

    // ── Lookup ────────────────────────────────────────────────

    pub fn has_dynamics(&self, name: &str) -> bool {
        self.dynamics.contains_key(name)
    }

    pub fn condition(&self, name: &str) -> DevsResult<&Condition> {
        self.conditions
            .get(name)
            .ok_or_else(|| DevsError::Modelling(format!("unknown condition `{}`", name)))
    }

    pub fn observable(&self, name: &str) -> DevsResult<&Observable> {
        self.observables
            .get(name)
            .ok_or_else(|| DevsError::Modelling(format!("unknown observable `{}`", name)))
    }

    pub fn class(&self, name: &str) -> DevsResult<&ModelGraph> {
        self.classes
            .get(name)
            .ok_or_else(|| DevsError::Modelling(format!("unknown class `{}`", name)))
    }

    /// Merge the named conditions into one init list. A port present in
    /// two of them is a modelling error.
    pub fn init_events<S: AsRef<str>>(&self, conditions: &[S]) -> DevsResult<InitEventList> {
        let mut merged = InitEventList::new();
        for name in conditions {
            for (port, value) in self.condition(name.as_ref())? {
                if merged.insert(port.clone(), value.clone()).is_some() {
                    return Err(DevsError::Modelling(format!(
                        "multiple conditions with the same init port `{}`",
                        port
                    )));
                }
            }
        }
        Ok(merged)
    }

    /// Build the behavior of `init.name` with the named dynamics.
    pub fn build(
        &self,
        dynamics: &str,
        init: &DynamicsInit,
        events: &InitEventList,
    ) -> DevsResult<Behavior> {
        let factory = self.dynamics.get(dynamics).ok_or_else(|| {
            DevsError::Modelling(format!(
                "model `{}` uses unknown dynamics `{}`",
                init.name, dynamics
            ))
        })?;
        factory(init, events).map_err(|e| match e {
            DevsError::Modelling(m) => DevsError::Modelling(format!(
                "model `{}` (dynamics `{}`) failed to build: {}",
                init.name, dynamics, m
            )),
            other => other,
        })
    }
}

impl std::fmt::Debug for ModelFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelFactory")
            .field("dynamics", &self.dynamics.keys().collect::<Vec<_>>())
            .field("conditions", &self.conditions)
            .field("observables", &self.observables)
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ModelId;
    use crate::simulator::{Beep, Counter};

    fn condition(pairs: &[(&str, Value)]) -> Condition {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn init() -> DynamicsInit {
        DynamicsInit {
            model: ModelId::new(1),
            name: "top:a".into(),
        }
    }

    #[test]
    fn test_init_events_merge() {
        let mut factory = ModelFactory::new();
        factory
            .add_condition("a", condition(&[("period", Value::Double(1.0))]))
            .unwrap();
        factory
            .add_condition("b", condition(&[("limit", Value::Integer(3))]))
            .unwrap();
        let merged = factory.init_events(&["a", "b"]).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_duplicate_init_port_rejected() {
        let mut factory = ModelFactory::new();
        factory
            .add_condition("a", condition(&[("period", Value::Double(1.0))]))
            .unwrap();
        factory
            .add_condition("b", condition(&[("period", Value::Double(2.0))]))
            .unwrap();
        let err = factory.init_events(&["a", "b"]).unwrap_err();
        assert!(matches!(err, DevsError::Modelling(ref m) if m.contains("period")));
    }

    #[test]
    fn test_unknown_names() {
        let factory = ModelFactory::new();
        assert!(factory.init_events(&["nope"]).is_err());
        assert!(factory.observable("nope").is_err());
        assert!(factory.class("nope").is_err());
        assert!(matches!(
            factory.build("nope", &init(), &InitEventList::new()),
            Err(DevsError::Modelling(_))
        ));
    }

    #[test]
    fn test_build_runs_factory() {
        let mut factory = ModelFactory::new();
        factory
            .add_dynamics("beep", |_, events| Ok(Behavior::atomic(Beep::from_init(events)?)))
            .unwrap();
        factory
            .add_dynamics("counter", |_, _| Ok(Behavior::atomic(Counter::new())))
            .unwrap();
        assert!(factory.add_dynamics("counter", |_, _| Ok(Behavior::atomic(Counter::new()))).is_err());

        let behavior = factory.build("beep", &init(), &InitEventList::new()).unwrap();
        assert!(behavior.as_any().downcast_ref::<Beep>().is_some());

        let mut bad = InitEventList::new();
        bad.insert("period".into(), Value::Double(-1.0));
        let err = factory.build("beep", &init(), &bad).unwrap_err();
        assert!(matches!(err, DevsError::Modelling(ref m) if m.contains("top:a")));
    }
}
