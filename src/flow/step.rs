//! Step sequence abstraction shared by the registration and onboarding flows.
//!
//! A flow is a fixed, totally ordered list of named steps. Ordering comes from
//! position in the sequence, never from the identifier itself, so reordering a
//! flow is a one-line change to `all()`.

use std::fmt::Debug;
use std::hash::Hash;

/// A named step in a fixed, ordered wizard sequence.
///
/// Implementors are plain enums; an invalid step is unrepresentable, so none
/// of the navigation code needs runtime validation of step identity.
pub trait FlowStep: Copy + Eq + Hash + Debug + Sized + 'static {
    /// The full step sequence in flow order. Never empty.
    fn all() -> &'static [Self];

    /// Stable string key used in persisted snapshots and routes.
    fn key(self) -> &'static str;

    /// Resolve a persisted key back to a step. `None` for keys from a stale
    /// schema; callers repair those to the initial step.
    fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|s| s.key() == key)
    }

    /// Position of this step in the flow sequence.
    fn index(self) -> usize {
        Self::all().iter().position(|s| *s == self).unwrap_or(0)
    }

    /// Entry step of the flow (first in sequence).
    fn initial() -> Self {
        Self::all()[0]
    }

    /// Whether this is the flow's terminal step. The terminal step is only
    /// ever "reached", never "completed": nothing comes after it to gate.
    fn is_terminal(self) -> bool {
        self.index() == Self::all().len() - 1
    }
}
