use crate::{
    applicant::RawApplicantRecord,
    features::EngineeredRecord,
    reasons::ReasonRecord,
    types::{ModelVersion, RequestId},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskClass {
    High,
    Low,
}

impl RiskClass {
    /// A probability exactly at the threshold is High.
    pub fn classify(probability: f64, threshold: f64) -> Self {
        if probability >= threshold {
            RiskClass::High
        } else {
            RiskClass::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskClass::High => "High",
            RiskClass::Low  => "Low",
        }
    }
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub probability_of_default: f64,
    pub decision_threshold:     f64,
    pub threshold_delta:        f64,
    pub risk_class:             RiskClass,
    pub reasons:                Vec<ReasonRecord>,
}

impl ScoringResult {
    pub fn is_near_threshold(&self, band: f64) -> bool {
        self.threshold_delta.abs() <= band
    }
}

/// One scored request as printed by the runner and kept in the
/// prediction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub request_id:          RequestId,
    pub timestamp:           chrono::DateTime<chrono::Utc>,
    pub model_version:       ModelVersion,
    pub threshold_policy:    String,
    pub near_threshold_band: f64,
    pub near_threshold_flag: bool,
    pub raw_input:           RawApplicantRecord,
    pub engineered:          EngineeredRecord,
    pub result:              ScoringResult,
}
