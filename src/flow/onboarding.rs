//! Onboarding flow: the post-payment half of the funnel.
//!
//! Entered once a payment is confirmed; the payment-success step's payload is
//! the credential bundle returned by the backend. The instructions step is
//! terminal and never reports completed.

use serde::{Deserialize, Serialize};

use crate::flow::step::FlowStep;

/// Steps of the onboarding flow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnboardingStep {
    PaymentSuccess,
    TrainingType,
    TrainingVariation,
    ExerciseConfidence,
    Insecurities,
    MentalityFocus,
    PreviousObstacles,
    InnerCircle,
    Instructions,
}

impl FlowStep for OnboardingStep {
    fn all() -> &'static [Self] {
        &[
            Self::PaymentSuccess,
            Self::TrainingType,
            Self::TrainingVariation,
            Self::ExerciseConfidence,
            Self::Insecurities,
            Self::MentalityFocus,
            Self::PreviousObstacles,
            Self::InnerCircle,
            Self::Instructions,
        ]
    }

    fn key(self) -> &'static str {
        match self {
            Self::PaymentSuccess => "payment-success",
            Self::TrainingType => "training-type",
            Self::TrainingVariation => "training-variation",
            Self::ExerciseConfidence => "exercise-confidence",
            Self::Insecurities => "insecurities",
            Self::MentalityFocus => "mentality-focus",
            Self::PreviousObstacles => "previous-obstacles",
            Self::InnerCircle => "inner-circle",
            Self::Instructions => "instructions",
        }
    }
}

/// Generic questionnaire answer used by the onboarding survey steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyAnswer {
    pub selections: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
}
