//! TraceEntry — records every bag dispatched to a simulator.

use crate::bag::DispatchKind;
use crate::time::Time;

use super::id::SimulatorId;

/// A record of one model bag handed to a simulator.
///
/// The coordinator appends one entry per visit, which makes the
/// "one visit per model per run" and case-dispatch rules directly
/// checkable in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEntry {
    /// Simulation time of the dispatch.
    pub time: Time,
    pub simulator: SimulatorId,
    /// Full path of the model at dispatch time.
    pub model: String,
    /// Which transition path was taken.
    pub kind: DispatchKind,
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} {} {}] {}",
            self.time, self.simulator, self.model, self.kind
        )
    }
}
