//! Wizard state for one funnel flow.
//!
//! `FlowState` tracks the current step, the payload submitted at each step,
//! and a cross-cutting promotional-pricing flag. Forward navigation is gated
//! on completion of every prior step; backward navigation is always allowed.
//! The state is owned by a single view and mutated only through its handlers,
//! so there is no interior locking here.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::flow::step::FlowStep;

/// Serializable snapshot of a flow, handed to the persistence layer.
///
/// Step identity is stored as string keys so a snapshot survives enum
/// reordering; unknown keys are repaired on rehydrate rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub current_step: String,
    /// Entry step key; empty in snapshots written before entry was persisted.
    #[serde(default)]
    pub entry_step: String,
    #[serde(default)]
    pub slots: BTreeMap<String, Value>,
    #[serde(default)]
    pub promo_pricing: bool,
    pub updated_at: DateTime<Utc>,
}

/// State machine for a fixed, ordered step flow.
#[derive(Debug, Clone)]
pub struct FlowState<S: FlowStep> {
    /// Step the flow starts on; `reset` returns here. Usually the first step,
    /// later for simplified checkout entry.
    entry: S,
    current: S,
    slots: HashMap<S, Value>,
    /// Promotional pricing applies for this visitor. Survives `reset` when
    /// requested so a promo checkout entry keeps its pricing across restarts.
    promo_pricing: bool,
}

impl<S: FlowStep> Default for FlowState<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FlowStep> FlowState<S> {
    /// Fresh flow starting at the first step with every slot empty.
    pub fn new() -> Self {
        Self::with_entry(S::initial())
    }

    /// Fresh flow starting at a later fixed step (simplified entry). The
    /// forward guard still applies, so callers seed the skipped steps'
    /// payloads before advancing past them.
    pub fn with_entry(entry: S) -> Self {
        Self {
            entry,
            current: entry,
            slots: HashMap::new(),
            promo_pricing: false,
        }
    }

    pub fn current_step(&self) -> S {
        self.current
    }

    pub fn entry_step(&self) -> S {
        self.entry
    }

    /// Unconditional jump. For backward and browser-history navigation where
    /// the caller has already consulted `can_navigate_to`; use
    /// `try_navigate_to` everywhere else.
    pub fn set_current_step(&mut self, step: S) {
        self.current = step;
    }

    /// Guarded navigation: moves only if `can_navigate_to` holds and reports
    /// whether it did. A `false` return is not an error; the UI simply stays
    /// put.
    pub fn try_navigate_to(&mut self, target: S) -> bool {
        if self.can_navigate_to(target) {
            self.current = target;
            true
        } else {
            debug!(
                target = target.key(),
                current = self.current.key(),
                "navigation denied: incomplete prerequisite step"
            );
            false
        }
    }

    /// Backward or lateral movement is always allowed. Forward movement
    /// requires every step strictly before the target to be completed. The
    /// guard scans the full prefix rather than keeping a high-water mark, so
    /// out-of-order completion (e.g. a rehydrated snapshot missing a middle
    /// step) never unlocks steps past the gap.
    pub fn can_navigate_to(&self, target: S) -> bool {
        if target.index() <= self.current.index() {
            return true;
        }
        S::all()[..target.index()]
            .iter()
            .all(|s| self.is_step_completed(*s))
    }

    /// Store the payload submitted at a step. Overwrites any previous value;
    /// shape validation belongs to the form that produced it.
    pub fn set_payload(&mut self, step: S, payload: Value) {
        self.slots.insert(step, payload);
    }

    pub fn payload(&self, step: S) -> Option<&Value> {
        self.slots.get(&step)
    }

    /// A step is completed once its payload slot is filled. The terminal step
    /// is the exception: it is only ever reached, so it reports `false` even
    /// with a payload set.
    pub fn is_step_completed(&self, step: S) -> bool {
        !step.is_terminal() && self.slots.contains_key(&step)
    }

    /// Completed steps in flow order.
    pub fn completed_steps(&self) -> Vec<S> {
        S::all()
            .iter()
            .copied()
            .filter(|s| self.is_step_completed(*s))
            .collect()
    }

    pub fn promo_pricing(&self) -> bool {
        self.promo_pricing
    }

    pub fn set_promo_pricing(&mut self, promo: bool) {
        self.promo_pricing = promo;
    }

    /// Clear every payload slot and return to the entry step. The promo flag
    /// is the one documented survivor, kept only when `preserve_promo` is
    /// set.
    pub fn reset(&mut self, preserve_promo: bool) {
        self.slots.clear();
        self.current = self.entry;
        if !preserve_promo {
            self.promo_pricing = false;
        }
    }

    /// Snapshot for the persistence collaborator.
    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            current_step: self.current.key().to_string(),
            entry_step: self.entry.key().to_string(),
            slots: self
                .slots
                .iter()
                .map(|(s, v)| (s.key().to_string(), v.clone()))
                .collect(),
            promo_pricing: self.promo_pricing,
            updated_at: Utc::now(),
        }
    }

    /// Rehydrate from a persisted snapshot. An unrecognized current step (a
    /// stale schema, e.g. a renamed step key) is repaired to the initial step
    /// instead of failing; unrecognized payload keys are dropped the same
    /// way. The entry step is restored too, falling back to the initial step
    /// for snapshots that predate it.
    pub fn from_snapshot(snapshot: &FlowSnapshot) -> Self {
        let entry = S::from_key(&snapshot.entry_step).unwrap_or_else(S::initial);
        let mut state = Self::with_entry(entry);
        state.promo_pricing = snapshot.promo_pricing;

        for (key, value) in &snapshot.slots {
            match S::from_key(key) {
                Some(step) => {
                    state.slots.insert(step, value.clone());
                }
                None => debug!(key = key.as_str(), "dropping payload for unrecognized step"),
            }
        }

        state.current = match S::from_key(&snapshot.current_step) {
            Some(step) => step,
            None => {
                debug!(
                    key = %snapshot.current_step,
                    "unrecognized current step in snapshot, repairing to initial"
                );
                S::initial()
            }
        };

        state
    }
}
