//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use aura_core::{
    applicant::{LoanGrade, LoanTerm, RawApplicantRecord},
    config::{ArtifactPaths, ThresholdConfig},
    error::ScoreResult,
    surrogate::SurrogateModel,
};
use std::path::{Path, PathBuf};

pub const VERSION: &str = "v1";

pub const PIPELINE_JSON: &str = r#"{
  "transformers": [
    {
      "name": "cat",
      "kind": "one_hot",
      "columns": ["grade_term"],
      "categories": [["A_ 36 months", "A_ 60 months", "B_ 36 months", "C_ 60 months"]]
    },
    {
      "name": "num",
      "kind": "standard_scaler",
      "columns": ["accounts_opened_24m", "dti_inv", "fico_sq"],
      "mean": [4.0, 0.07, 490000.0],
      "scale": [3.0, 0.09, 49000.0]
    }
  ]
}"#;

pub const COEFFICIENTS: [f64; 7] = [-1.0, -0.6, -0.3, 0.6, 0.3, -0.4, -0.7];
pub const INTERCEPT: f64 = -1.8;

pub const BACKGROUND_CSV: &str = "\
grade_term,accounts_opened_24m,dti_inv,fico_sq
A_ 36 months,1,0.1,577600
B_ 36 months,5,0.05,462400
C_ 60 months,8,0.04,422500
A_ 60 months,3,0.08,504100
";

pub const PERCENTILES_CSV: &str = "\
feature,min,max,p25,p50,p75
fico_mid,640,850,687,712,742
fico_sq,409600,722500,471969,506944,550564
dti,0,40,11.8,17.9,24.3
dti_inv,0.024999,1000,0.041151,0.055863,0.084739
accounts_opened_24m,0,30,2,4,6
";

/// Fresh, empty models directory under the system temp dir.
pub fn temp_models_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("aura-{tag}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp models dir");
    dir
}

pub fn surrogate_json() -> String {
    serde_json::json!({
        "model_version": VERSION,
        "feature_names": [
            "cat__grade_term_A_ 36 months",
            "cat__grade_term_A_ 60 months",
            "cat__grade_term_B_ 36 months",
            "cat__grade_term_C_ 60 months",
            "num__accounts_opened_24m",
            "num__dti_inv",
            "num__fico_sq"
        ],
        "coefficients": COEFFICIENTS,
        "intercept": INTERCEPT
    })
    .to_string()
}

/// Write every artifact of the fixture model into `dir`.
pub fn write_artifacts(dir: &Path) -> ArtifactPaths {
    let paths = ArtifactPaths::new(dir, VERSION);
    std::fs::write(paths.preprocessor(), PIPELINE_JSON).expect("write pipeline");
    std::fs::write(paths.surrogate(), surrogate_json()).expect("write surrogate");
    std::fs::write(paths.background(), BACKGROUND_CSV).expect("write background");
    std::fs::write(paths.percentiles(), PERCENTILES_CSV).expect("write percentiles");
    ThresholdConfig::bootstrap(&paths.thresholds(), VERSION).expect("bootstrap threshold");
    paths
}

pub fn fixture_models(tag: &str) -> ArtifactPaths {
    write_artifacts(&temp_models_dir(tag))
}

/// {A, 36, 2, 15.0, 750}
pub fn sample_applicant() -> RawApplicantRecord {
    RawApplicantRecord::new(LoanGrade::A, LoanTerm::Months36, 2, 15.0, 750)
        .expect("sample applicant is valid")
}

/// Fixed-probability model with the fixture's coefficients.
pub struct StubModel {
    pub probability:  f64,
    pub coefficients: Vec<f64>,
}

impl StubModel {
    pub fn new(probability: f64) -> Self {
        Self {
            probability,
            coefficients: COEFFICIENTS.to_vec(),
        }
    }
}

impl SurrogateModel for StubModel {
    fn predict_proba(&self, _encoded: &[f64]) -> ScoreResult<f64> {
        Ok(self.probability)
    }

    fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}
