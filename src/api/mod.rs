//! Client for the checkout backend (session creation, credentials,
//! payment-status checks).

pub mod checkout;

pub use checkout::{CheckoutClient, SessionProbe};
