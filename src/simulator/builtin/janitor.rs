//! `Janitor` — an executive that rewires its coupled model once.

use crate::coordinator::ExecutiveContext;
use crate::error::{DevsError, DevsResult};
use crate::simulator::dynamics::{Executive, InitEventList};
use crate::time::Time;
use crate::value::Value;

/// Performs one batch of structural changes at a fixed time, then
/// sleeps forever.
///
/// Init ports:
/// - `at` (double, delay before acting, default 0)
/// - `delete` (string, sibling to delete)
/// - `create` + `dynamics` (strings, atomic sibling to create, with
///   input `in` and output `out`)
/// - `class` + `instance` (strings, class to instantiate as a sibling)
/// - `connect` (string, sibling whose `out` is wired to the created
///   model's `in`)
#[derive(Debug, Clone, Default)]
pub struct Janitor {
    at: f64,
    delete: Option<String>,
    create: Option<(String, String)>,
    class: Option<(String, String)>,
    connect: Option<String>,

    done: bool,
    /// Time at which the changes were applied.
    pub fired_at: Option<Time>,
    /// Sibling names seen just after the changes.
    pub siblings: Vec<String>,
}

impl Janitor {
    pub fn new(at: f64) -> Self {
        Janitor {
            at,
            ..Janitor::default()
        }
    }

    pub fn deleting(mut self, name: &str) -> Self {
        self.delete = Some(name.to_string());
        self
    }

    pub fn creating(mut self, name: &str, dynamics: &str) -> Self {
        self.create = Some((name.to_string(), dynamics.to_string()));
        self
    }

    pub fn instantiating(mut self, class: &str, name: &str) -> Self {
        self.class = Some((class.to_string(), name.to_string()));
        self
    }

    pub fn connecting(mut self, source: &str) -> Self {
        self.connect = Some(source.to_string());
        self
    }

    pub fn from_init(events: &InitEventList) -> DevsResult<Self> {
        let string = |port: &str| events.get(port).and_then(Value::as_str).map(str::to_string);

        let at = match events.get("at") {
            None => 0.0,
            Some(v) => v.as_double().ok_or_else(|| {
                DevsError::Modelling("janitor: `at` must be a number".into())
            })?,
        };
        let mut janitor = Janitor::new(at);
        janitor.delete = string("delete");
        janitor.connect = string("connect");
        if let Some(name) = string("create") {
            let dynamics = string("dynamics").ok_or_else(|| {
                DevsError::Modelling("janitor: `create` needs `dynamics`".into())
            })?;
            janitor.create = Some((name, dynamics));
        }
        if let Some(class) = string("class") {
            let instance = string("instance").unwrap_or_else(|| class.clone());
            janitor.class = Some((class, instance));
        }
        Ok(janitor)
    }
}

impl Executive for Janitor {
    fn init(&mut self, _ctx: &mut ExecutiveContext<'_>, _time: Time) -> DevsResult<Time> {
        Ok(Time::new(self.at))
    }

    fn time_advance(&self) -> Time {
        if self.done {
            Time::INFINITY
        } else {
            Time::new(self.at)
        }
    }

    fn internal_transition(&mut self, ctx: &mut ExecutiveContext<'_>, time: Time) -> DevsResult<()> {
        if let Some(name) = &self.delete {
            ctx.del_model(name)?;
        }
        if let Some((name, dynamics)) = &self.create {
            ctx.create_model(name, &["in"], &["out"], dynamics, &[], None)?;
            if let Some(source) = &self.connect {
                ctx.add_connection(source, "out", name, "in")?;
            }
        }
        if let Some((class, instance)) = &self.class {
            ctx.create_model_from_class(class, instance)?;
        }

        self.done = true;
        self.fired_at = Some(time);
        self.siblings = ctx.model_names()?;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
