//! Simulator ID — a stable, never-reused handle on one simulator.

/// A unique identifier for a simulator.
///
/// IDs are minted from a monotonic counter and never reused, so an ID
/// held by a stale event can never alias a simulator created later.
/// The kernel refers to simulators only through these IDs; no event or
/// view holds a reference to a `Simulator` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulatorId(u64);

impl SimulatorId {
    /// Create a simulator ID from a raw integer.
    #[inline]
    pub fn new(id: u64) -> Self {
        SimulatorId(id)
    }

    /// Return the underlying integer.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SimulatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}
