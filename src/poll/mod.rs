//! Bounded backoff polling for asynchronous backend state transitions.

pub mod backoff;
pub mod monitor;

pub use backoff::{BackoffPoller, NextDelay};
pub use monitor::{PaymentCheck, PaymentMonitor, PollOutcome, PollProgress, StatusProbe};
