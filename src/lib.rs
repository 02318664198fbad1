//! Funnel - checkout and onboarding flow engine for a fitness subscription
//! product.
//!
//! Two cooperating cores: ordered step-wizard state machines with guarded
//! forward navigation (`flow`), and a bounded exponential-backoff poller that
//! awaits payment confirmation from the checkout backend (`poll`). The `api`
//! module is the thin client those collaborate with.

pub mod api;
pub mod config;
pub mod flow;
pub mod logging;
pub mod poll;
pub mod types;
