//! Feature engineering: the four model-ready features derived from
//! a validated applicant record.
//!
//! RULE: engineer() is a pure function. No I/O, no clocks, no randomness.
//! The canonical term string is a byte-level contract with the persisted
//! transform artifact: its one-hot categories are spelled exactly
//! "<grade>_ <months> months".

use crate::applicant::{LoanTerm, RawApplicantRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Keeps dti_inv finite at a debt-to-income of zero.
pub const DTI_EPSILON: f64 = 1e-3;

/// Features in the space the surrogate model reasons in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineeredFeature {
    #[serde(rename = "grade_term")]
    GradeTerm,
    #[serde(rename = "accounts_opened_24m")]
    AccountsOpened24m,
    #[serde(rename = "dti_inv")]
    DtiInv,
    #[serde(rename = "fico_sq")]
    FicoSq,
}

impl EngineeredFeature {
    pub const ALL: [EngineeredFeature; 4] = [
        EngineeredFeature::GradeTerm,
        EngineeredFeature::AccountsOpened24m,
        EngineeredFeature::DtiInv,
        EngineeredFeature::FicoSq,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineeredFeature::GradeTerm         => "grade_term",
            EngineeredFeature::AccountsOpened24m => "accounts_opened_24m",
            EngineeredFeature::DtiInv            => "dti_inv",
            EngineeredFeature::FicoSq            => "fico_sq",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// The business-facing feature this engineered feature stands for.
    pub fn raw_feature(&self) -> RawFeature {
        match self {
            EngineeredFeature::GradeTerm         => RawFeature::GradeTerm,
            EngineeredFeature::AccountsOpened24m => RawFeature::AccountsOpened24m,
            EngineeredFeature::DtiInv            => RawFeature::Dti,
            EngineeredFeature::FicoSq            => RawFeature::FicoMid,
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, EngineeredFeature::GradeTerm)
    }

    /// Stable code handed to audit and narrative collaborators.
    pub fn reason_code(&self) -> &'static str {
        match self {
            EngineeredFeature::GradeTerm         => "GRADE_TERM_RISK",
            EngineeredFeature::AccountsOpened24m => "RECENT_CREDIT_ACTIVITY",
            EngineeredFeature::DtiInv            => "HIGH_DTI",
            EngineeredFeature::FicoSq            => "FICO_SCORE",
        }
    }
}

impl fmt::Display for EngineeredFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business-meaningful feature keys. `GradeTerm` has no raw counterpart
/// and is reported under its engineered name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawFeature {
    #[serde(rename = "grade")]
    Grade,
    #[serde(rename = "term")]
    Term,
    #[serde(rename = "grade_term")]
    GradeTerm,
    #[serde(rename = "accounts_opened_24m")]
    AccountsOpened24m,
    #[serde(rename = "dti")]
    Dti,
    #[serde(rename = "fico_mid")]
    FicoMid,
}

impl RawFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawFeature::Grade             => "grade",
            RawFeature::Term              => "term",
            RawFeature::GradeTerm         => "grade_term",
            RawFeature::AccountsOpened24m => "accounts_opened_24m",
            RawFeature::Dti               => "dti",
            RawFeature::FicoMid           => "fico_mid",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RawFeature::Grade             => "Loan Grade",
            RawFeature::Term              => "Loan Term (months)",
            RawFeature::GradeTerm         => "Grade & Term",
            RawFeature::AccountsOpened24m => "Recent Account Openings (24m)",
            RawFeature::Dti               => "Debt-to-Income Ratio",
            RawFeature::FicoMid           => "FICO Score",
        }
    }

    /// Categorical features have no population percentile.
    pub fn is_categorical(&self) -> bool {
        matches!(self, RawFeature::Grade | RawFeature::Term | RawFeature::GradeTerm)
    }
}

impl fmt::Display for RawFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model-ready features for one applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeredRecord {
    pub grade_term:          String,
    pub accounts_opened_24m: u32,
    pub dti_inv:             f64,
    pub fico_sq:             f64,
}

impl EngineeredRecord {
    /// Numeric value of a feature, `None` for categorical ones.
    pub fn numeric(&self, feature: EngineeredFeature) -> Option<f64> {
        match feature {
            EngineeredFeature::GradeTerm         => None,
            EngineeredFeature::AccountsOpened24m => Some(f64::from(self.accounts_opened_24m)),
            EngineeredFeature::DtiInv            => Some(self.dti_inv),
            EngineeredFeature::FicoSq            => Some(self.fico_sq),
        }
    }
}

/// " 36 months" / " 60 months", leading space included.
pub fn canonical_term(term: LoanTerm) -> &'static str {
    match term {
        LoanTerm::Months36 => " 36 months",
        LoanTerm::Months60 => " 60 months",
    }
}

pub fn grade_term(raw: &RawApplicantRecord) -> String {
    format!("{}_{}", raw.grade().as_str(), canonical_term(raw.term()))
}

pub fn engineer(raw: &RawApplicantRecord) -> EngineeredRecord {
    let fico = f64::from(raw.fico_mid());
    EngineeredRecord {
        grade_term:          grade_term(raw),
        accounts_opened_24m: raw.accounts_opened_24m(),
        dti_inv:             1.0 / (raw.debt_to_income() + DTI_EPSILON),
        fico_sq:             fico * fico,
    }
}
