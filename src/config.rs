//! Experiment configuration: simulated interval and views.
//!
//! Everything here is plain data. With the `serialize` feature the
//! types derive serde, so an experiment can be loaded from JSON.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::{DevsError, DevsResult};
use crate::output::{Storage, StreamWriter, TextWriter};
use crate::time::Time;
use crate::view::ViewKind;

// ── Output ────────────────────────────────────────────────────────────

/// Where a view writes its rows.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputConfig {
    /// In memory, read back through `Coordinator::output::<Storage>`.
    #[default]
    Storage,
    Text { path: PathBuf },
    #[cfg(feature = "serialize")]
    Json { path: PathBuf },
}

impl OutputConfig {
    /// Build the stream writer. File outputs are created here, so an
    /// unwritable path fails before the simulation starts.
    pub fn open(&self) -> DevsResult<Box<dyn StreamWriter>> {
        match self {
            OutputConfig::Storage => Ok(Box::new(Storage::new())),
            OutputConfig::Text { path } => Ok(Box::new(TextWriter::create(path)?)),
            #[cfg(feature = "serialize")]
            OutputConfig::Json { path } => Ok(Box::new(crate::output::JsonWriter::create(path)?)),
        }
    }
}

// ── View ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewConfig {
    pub name: String,
    pub kind: ViewKind,
    pub output: OutputConfig,
}

impl ViewConfig {
    /// A view sampling every `step`.
    pub fn timed(name: &str, step: f64) -> Self {
        ViewConfig {
            name: name.to_string(),
            kind: ViewKind::Timed {
                step: Time::new(step),
            },
            output: OutputConfig::Storage,
        }
    }

    /// A view sampling after every transition of an observed model.
    pub fn event(name: &str) -> Self {
        ViewConfig {
            name: name.to_string(),
            kind: ViewKind::Event,
            output: OutputConfig::Storage,
        }
    }

    /// A view sampling once, at the end of the simulation.
    pub fn finish(name: &str) -> Self {
        ViewConfig {
            name: name.to_string(),
            kind: ViewKind::Finish,
            output: OutputConfig::Storage,
        }
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }
}

// ── Experiment ────────────────────────────────────────────────────────

/// Simulated interval and views of one experiment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentConfig {
    pub name: String,
    pub begin: f64,
    /// Length of the simulated interval; may be infinite.
    pub duration: f64,
    pub views: Vec<ViewConfig>,
}

impl ExperimentConfig {
    pub fn new(name: &str) -> Self {
        ExperimentConfig {
            name: name.to_string(),
            begin: 0.0,
            duration: f64::INFINITY,
            views: Vec::new(),
        }
    }

    pub fn with_begin(mut self, begin: f64) -> Self {
        self.begin = begin;
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_view(mut self, view: ViewConfig) -> Self {
        self.views.push(view);
        self
    }

    /// Reject settings the kernel cannot run.
    pub fn validate(&self) -> DevsResult<()> {
        if !self.begin.is_finite() {
            return Err(DevsError::Internal(format!(
                "experiment `{}`: begin must be finite",
                self.name
            )));
        }
        if self.duration.is_nan() || self.duration < 0.0 {
            return Err(DevsError::Internal(format!(
                "experiment `{}`: duration must not be negative",
                self.name
            )));
        }

        let mut seen = BTreeSet::new();
        for view in &self.views {
            if view.name.is_empty() {
                return Err(DevsError::Internal(format!(
                    "experiment `{}`: view with an empty name",
                    self.name
                )));
            }
            if !seen.insert(view.name.as_str()) {
                return Err(DevsError::Internal(format!(
                    "experiment `{}`: duplicate view `{}`",
                    self.name, view.name
                )));
            }
            view.kind.check(&view.name)?;
        }
        Ok(())
    }

    pub fn begin_time(&self) -> Time {
        Time::new(self.begin)
    }

    /// `begin + duration`.
    pub fn end_time(&self) -> Time {
        Time::new(self.begin + self.duration)
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self::new("experiment")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        let config = ExperimentConfig::new("exp")
            .with_duration(10.0)
            .with_view(ViewConfig::timed("t", 1.0))
            .with_view(ViewConfig::finish("f"));
        assert!(config.validate().is_ok());
        assert_eq!(config.end_time(), Time::new(10.0));
        assert!(ExperimentConfig::default().end_time().is_infinity());
    }

    #[test]
    fn test_validate_rejects_bad_views() {
        let duplicate = ExperimentConfig::new("exp")
            .with_view(ViewConfig::event("v"))
            .with_view(ViewConfig::finish("v"));
        assert!(matches!(duplicate.validate(), Err(DevsError::Internal(ref m)) if m.contains("duplicate")));

        let zero_step = ExperimentConfig::new("exp").with_view(ViewConfig::timed("t", 0.0));
        assert!(zero_step.validate().is_err());

        let negative = ExperimentConfig::new("exp").with_duration(-1.0);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_text_output_fails_early_on_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig::Text {
            path: dir.path().join("missing").join("out.txt"),
        };
        assert!(matches!(output.open(), Err(DevsError::Io(_))));
        assert!(OutputConfig::default().open().is_ok());
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "name": "exp",
            "begin": 0.0,
            "duration": 5.0,
            "views": [
                { "name": "t", "kind": { "Timed": { "step": 1.0 } }, "output": "Storage" }
            ]
        }"#;
        let config: ExperimentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.views[0], ViewConfig::timed("t", 1.0));
        assert!(config.validate().is_ok());
    }
}
