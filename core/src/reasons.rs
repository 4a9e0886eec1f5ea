//! Reason consolidation: ranked attribution rows become business-facing
//! reason records.
//!
//! RULES:
//!   - dti_inv moves opposite to debt-to-income, so its sign is inverted
//!     before choosing a risk direction.
//!   - Magnitude is relative to the strongest reason in the same list.
//!   - fico_sq and dti_inv are ranked in engineered space against their own
//!     tables. Categorical features never have a percentile.

use crate::{
    applicant::RawApplicantRecord,
    attribution::AttributionRow,
    features::{EngineeredFeature, EngineeredRecord, RawFeature},
    percentile::PercentileIndex,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const HIGH_MAGNITUDE_RATIO: f64 = 0.60;
pub const MODERATE_MAGNITUDE_RATIO: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskDirection {
    #[serde(rename = "increases risk")]
    Increases,
    #[serde(rename = "decreases risk")]
    Decreases,
}

impl RiskDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskDirection::Increases => "increases risk",
            RiskDirection::Decreases => "decreases risk",
        }
    }
}

impl fmt::Display for RiskDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Magnitude {
    High,
    Moderate,
    Low,
}

impl Magnitude {
    /// Bucket a contribution against the strongest one in its list.
    pub fn classify(contribution: f64, anchor: f64) -> Self {
        if anchor <= 0.0 {
            return Magnitude::Low;
        }
        let rel = contribution.abs() / anchor;
        if rel >= HIGH_MAGNITUDE_RATIO {
            Magnitude::High
        } else if rel >= MODERATE_MAGNITUDE_RATIO {
            Magnitude::Moderate
        } else {
            Magnitude::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Magnitude::High     => "High",
            Magnitude::Moderate => "Moderate",
            Magnitude::Low      => "Low",
        }
    }
}

/// The applicant's value for a reason: a count, a real, or the grade/term
/// category string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonRecord {
    pub display_feature_name:   String,
    pub raw_feature_key:        RawFeature,
    pub engineered_feature_key: EngineeredFeature,
    pub applicant_value:        FeatureValue,
    pub percentile:             Option<u8>,
    pub direction:              RiskDirection,
    pub contribution_score:     f64,
    pub magnitude:              Magnitude,
    pub reason_code:            String,
}

pub fn risk_direction(feature: EngineeredFeature, contribution: f64) -> RiskDirection {
    let signed = if feature == EngineeredFeature::DtiInv {
        -contribution
    } else {
        contribution
    };
    if signed > 0.0 {
        RiskDirection::Increases
    } else {
        RiskDirection::Decreases
    }
}

fn applicant_value(
    feature: EngineeredFeature,
    raw: &RawApplicantRecord,
    engineered: &EngineeredRecord,
) -> FeatureValue {
    match feature.raw_feature() {
        RawFeature::Grade             => FeatureValue::Text(raw.grade().as_str().to_string()),
        RawFeature::Term              => FeatureValue::Integer(i64::from(raw.term().months())),
        RawFeature::GradeTerm         => FeatureValue::Text(engineered.grade_term.clone()),
        RawFeature::AccountsOpened24m => FeatureValue::Integer(i64::from(raw.accounts_opened_24m())),
        RawFeature::Dti               => FeatureValue::Number(raw.debt_to_income()),
        RawFeature::FicoMid           => FeatureValue::Integer(i64::from(raw.fico_mid())),
    }
}

fn percentile_for(
    feature: EngineeredFeature,
    raw: &RawApplicantRecord,
    engineered: &EngineeredRecord,
    percentiles: &PercentileIndex,
) -> Option<u8> {
    match feature {
        EngineeredFeature::FicoSq | EngineeredFeature::DtiInv => {
            percentiles.percentile(engineered.numeric(feature)?, feature.as_str())
        }
        _ => {
            let key = feature.raw_feature();
            if key.is_categorical() {
                return None;
            }
            let value = match key {
                RawFeature::AccountsOpened24m => f64::from(raw.accounts_opened_24m()),
                RawFeature::Dti               => raw.debt_to_income(),
                RawFeature::FicoMid           => f64::from(raw.fico_mid()),
                _ => return None,
            };
            percentiles.percentile(value, key.as_str())
        }
    }
}

/// Attach display name, value, percentile, direction and magnitude to each
/// ranked attribution row. Order is preserved.
pub fn consolidate(
    rows: &[AttributionRow],
    raw: &RawApplicantRecord,
    engineered: &EngineeredRecord,
    percentiles: &PercentileIndex,
) -> Vec<ReasonRecord> {
    let anchor = rows
        .iter()
        .map(|r| r.contribution_score.abs())
        .fold(0.0, f64::max);

    rows.iter()
        .map(|row| ReasonRecord {
            display_feature_name:   row.raw_feature_key.display_name().to_string(),
            raw_feature_key:        row.raw_feature_key,
            engineered_feature_key: row.feature,
            applicant_value:        applicant_value(row.feature, raw, engineered),
            percentile:             percentile_for(row.feature, raw, engineered, percentiles),
            direction:              risk_direction(row.feature, row.contribution_score),
            contribution_score:     row.contribution_score,
            magnitude:              Magnitude::classify(row.contribution_score, anchor),
            reason_code:            row.feature.reason_code().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_buckets() {
        assert_eq!(Magnitude::classify(1.0, 1.0), Magnitude::High);
        assert_eq!(Magnitude::classify(-0.6, 1.0), Magnitude::High);
        assert_eq!(Magnitude::classify(0.59, 1.0), Magnitude::Moderate);
        assert_eq!(Magnitude::classify(0.30, 1.0), Magnitude::Moderate);
        assert_eq!(Magnitude::classify(0.29, 1.0), Magnitude::Low);
        assert_eq!(Magnitude::classify(0.0, 0.0), Magnitude::Low);
    }

    #[test]
    fn dti_inv_direction_is_inverted() {
        assert_eq!(risk_direction(EngineeredFeature::DtiInv, -0.4), RiskDirection::Increases);
        assert_eq!(risk_direction(EngineeredFeature::DtiInv, 0.4), RiskDirection::Decreases);
        assert_eq!(risk_direction(EngineeredFeature::FicoSq, -0.4), RiskDirection::Decreases);
        assert_eq!(risk_direction(EngineeredFeature::FicoSq, 0.4), RiskDirection::Increases);
        assert_eq!(risk_direction(EngineeredFeature::GradeTerm, 0.0), RiskDirection::Decreases);
    }

    #[test]
    fn direction_serializes_as_phrase() {
        let json = serde_json::to_string(&RiskDirection::Increases).expect("serialize");
        assert_eq!(json, "\"increases risk\"");
    }
}
