//! Shared wire types for the funnel's external collaborators.

pub mod checkout;

pub use checkout::{
    CheckoutError, CheckoutSession, CreateCheckoutRequest, PaymentState, PaymentStatusResponse,
    RegistrationCredentials,
};
