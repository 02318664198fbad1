//! Step-wizard state machines for the registration and onboarding flows.

pub mod onboarding;
pub mod registration;
pub mod state;
pub mod step;
pub mod store;

pub use onboarding::{OnboardingStep, SurveyAnswer};
pub use registration::{
    ContactDetails, GoalsLifestyle, PhysicalProfile, PlanSelection, RegistrationStep,
    SubscriptionTypeChoice,
};
pub use state::{FlowSnapshot, FlowState};
pub use step::FlowStep;
pub use store::FlowStore;
