//! The validated applicant record: the engine's only input.
//!
//! RULE: A RawApplicantRecord can only exist if every field is inside
//! its declared domain. Out-of-domain values are rejected, never coerced.

use crate::error::{ScoreError, ScoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const FICO_MIN: u16 = 300;
pub const FICO_MAX: u16 = 850;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanGrade {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl LoanGrade {
    pub const ALL: [LoanGrade; 7] = [
        LoanGrade::A,
        LoanGrade::B,
        LoanGrade::C,
        LoanGrade::D,
        LoanGrade::E,
        LoanGrade::F,
        LoanGrade::G,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanGrade::A => "A",
            LoanGrade::B => "B",
            LoanGrade::C => "C",
            LoanGrade::D => "D",
            LoanGrade::E => "E",
            LoanGrade::F => "F",
            LoanGrade::G => "G",
        }
    }

    /// Exact single-letter match. Lowercase or padded input is rejected.
    pub fn from_letter(letter: &str) -> ScoreResult<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == letter)
            .ok_or_else(|| {
                ScoreError::invalid_input("grade", format!("expected one of A-G, got '{letter}'"))
            })
    }
}

impl fmt::Display for LoanGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loan term. Serialized as the integer month count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub enum LoanTerm {
    Months36,
    Months60,
}

impl LoanTerm {
    pub fn from_months(months: i64) -> ScoreResult<Self> {
        match months {
            36 => Ok(LoanTerm::Months36),
            60 => Ok(LoanTerm::Months60),
            other => Err(ScoreError::invalid_input(
                "term",
                format!("must be 36 or 60, got {other}"),
            )),
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            LoanTerm::Months36 => 36,
            LoanTerm::Months60 => 60,
        }
    }
}

impl TryFrom<i64> for LoanTerm {
    type Error = ScoreError;

    fn try_from(value: i64) -> ScoreResult<Self> {
        LoanTerm::from_months(value)
    }
}

impl From<LoanTerm> for u32 {
    fn from(term: LoanTerm) -> u32 {
        term.months()
    }
}

/// A fully validated loan application. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ApplicantPayload")]
pub struct RawApplicantRecord {
    grade:               LoanGrade,
    term:                LoanTerm,
    accounts_opened_24m: u32,
    debt_to_income:      f64,
    fico_mid:            u16,
}

impl RawApplicantRecord {
    pub fn new(
        grade: LoanGrade,
        term: LoanTerm,
        accounts_opened_24m: u32,
        debt_to_income: f64,
        fico_mid: u16,
    ) -> ScoreResult<Self> {
        if !debt_to_income.is_finite() || debt_to_income < 0.0 {
            return Err(ScoreError::invalid_input(
                "debt_to_income",
                format!("must be a finite value >= 0, got {debt_to_income}"),
            ));
        }
        if !(FICO_MIN..=FICO_MAX).contains(&fico_mid) {
            return Err(ScoreError::invalid_input(
                "fico_mid",
                format!("must be between {FICO_MIN} and {FICO_MAX}, got {fico_mid}"),
            ));
        }
        Ok(Self {
            grade,
            term,
            accounts_opened_24m,
            debt_to_income,
            fico_mid,
        })
    }

    pub fn grade(&self) -> LoanGrade {
        self.grade
    }

    pub fn term(&self) -> LoanTerm {
        self.term
    }

    pub fn accounts_opened_24m(&self) -> u32 {
        self.accounts_opened_24m
    }

    pub fn debt_to_income(&self) -> f64 {
        self.debt_to_income
    }

    pub fn fico_mid(&self) -> u16 {
        self.fico_mid
    }
}

/// Wire shape of an applicant document. Every field is required and
/// unknown fields are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicantPayload {
    pub grade: String,
    pub term: i64,
    #[serde(alias = "acc_open_past_24mths")]
    pub accounts_opened_24m: i64,
    #[serde(alias = "dti")]
    pub debt_to_income: f64,
    pub fico_mid: i64,
}

impl TryFrom<ApplicantPayload> for RawApplicantRecord {
    type Error = ScoreError;

    fn try_from(payload: ApplicantPayload) -> ScoreResult<Self> {
        let grade = LoanGrade::from_letter(&payload.grade)?;
        let term = LoanTerm::from_months(payload.term)?;
        let accounts = u32::try_from(payload.accounts_opened_24m).map_err(|_| {
            ScoreError::invalid_input(
                "accounts_opened_24m",
                format!("must be a non-negative integer, got {}", payload.accounts_opened_24m),
            )
        })?;
        let fico = u16::try_from(payload.fico_mid).map_err(|_| {
            ScoreError::invalid_input(
                "fico_mid",
                format!("must be between {FICO_MIN} and {FICO_MAX}, got {}", payload.fico_mid),
            )
        })?;
        RawApplicantRecord::new(grade, term, accounts, payload.debt_to_income, fico)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> serde_json::Value {
        serde_json::json!({
            "grade": "A",
            "term": 36,
            "accounts_opened_24m": 2,
            "debt_to_income": 15.0,
            "fico_mid": 750
        })
    }

    #[test]
    fn valid_payload_deserializes() {
        let record: RawApplicantRecord =
            serde_json::from_value(payload()).expect("valid payload");
        assert_eq!(record.grade(), LoanGrade::A);
        assert_eq!(record.term(), LoanTerm::Months36);
        assert_eq!(record.accounts_opened_24m(), 2);
        assert_eq!(record.debt_to_income(), 15.0);
        assert_eq!(record.fico_mid(), 750);
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let record: RawApplicantRecord = serde_json::from_value(serde_json::json!({
            "grade": "C",
            "term": 60,
            "acc_open_past_24mths": 4,
            "dti": 22.5,
            "fico_mid": 690
        }))
        .expect("aliases accepted");
        assert_eq!(record.term(), LoanTerm::Months60);
        assert_eq!(record.debt_to_income(), 22.5);
    }

    #[test]
    fn missing_field_is_rejected() {
        let mut value = payload();
        value.as_object_mut().unwrap().remove("fico_mid");
        assert!(serde_json::from_value::<RawApplicantRecord>(value).is_err());
    }

    #[test]
    fn out_of_domain_values_are_rejected() {
        for (field, bad) in [
            ("grade", serde_json::json!("Z")),
            ("grade", serde_json::json!("a")),
            ("term", serde_json::json!(72)),
            ("accounts_opened_24m", serde_json::json!(-1)),
            ("debt_to_income", serde_json::json!(-0.5)),
            ("fico_mid", serde_json::json!(299)),
            ("fico_mid", serde_json::json!(851)),
        ] {
            let mut value = payload();
            value[field] = bad.clone();
            assert!(
                serde_json::from_value::<RawApplicantRecord>(value).is_err(),
                "{field}={bad} should be rejected"
            );
        }
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut value = payload();
        value["income"] = serde_json::json!(50_000);
        assert!(serde_json::from_value::<RawApplicantRecord>(value).is_err());
    }

    #[test]
    fn constructor_rejects_nan_dti() {
        let err = RawApplicantRecord::new(LoanGrade::B, LoanTerm::Months36, 1, f64::NAN, 700)
            .unwrap_err();
        assert!(matches!(err, ScoreError::InvalidInput { field: "debt_to_income", .. }));
    }

    #[test]
    fn record_serializes_with_contract_field_names() {
        let record: RawApplicantRecord =
            serde_json::from_value(payload()).expect("valid payload");
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json, payload());
    }
}
