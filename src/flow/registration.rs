//! Registration flow: the pre-payment half of the funnel.
//!
//! Runs from plan selection through order confirmation. Order confirmation is
//! the terminal step; "completing" it means leaving for checkout, which is
//! handled by the flow's owner, not modeled as a further step.

use serde::{Deserialize, Serialize};

use crate::flow::step::FlowStep;

/// Steps of the registration flow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationStep {
    SubscriptionType,
    SubscriptionPlan,
    PhysicalData,
    ContactInfo,
    GoalsLifestyle,
    OrderConfirmation,
}

impl FlowStep for RegistrationStep {
    fn all() -> &'static [Self] {
        &[
            Self::SubscriptionType,
            Self::SubscriptionPlan,
            Self::PhysicalData,
            Self::ContactInfo,
            Self::GoalsLifestyle,
            Self::OrderConfirmation,
        ]
    }

    fn key(self) -> &'static str {
        match self {
            Self::SubscriptionType => "subscription-type",
            Self::SubscriptionPlan => "subscription-plan",
            Self::PhysicalData => "physical-data",
            Self::ContactInfo => "contact-info",
            Self::GoalsLifestyle => "goals-lifestyle",
            Self::OrderConfirmation => "order-confirmation",
        }
    }
}

/// Payload for the subscription-type step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionTypeChoice {
    /// Product line key (e.g. "personal-coaching", "group-training")
    pub subscription_type: String,
}

/// Payload for the subscription-plan step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSelection {
    /// Backend plan identifier
    pub plan_id: String,
    /// Billing interval key (e.g. "monthly", "quarterly")
    pub billing_interval: String,
    /// Whether promotional pricing applies to this selection
    #[serde(default)]
    pub promo: bool,
}

/// Payload for the physical-data step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalProfile {
    pub height_cm: u32,
    pub weight_kg: f64,
    pub target_weight_kg: f64,
    pub birth_year: u16,
}

/// Payload for the contact-info step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactDetails {
    pub first_name: String,
    pub email: String,
    /// E.164 formatted; formatting itself happens in the form layer
    pub phone: String,
}

/// Payload for the goals-lifestyle step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalsLifestyle {
    pub goals: Vec<String>,
    pub activity_level: String,
    #[serde(default)]
    pub note: Option<String>,
}
