//! Linear explainer: per-column contributions for one encoded row.
//!
//! With an independent masker over a background dataset, the exact
//! attribution of a linear model is
//!
//! ```text
//! contribution_i = coef_i * (x_i - baseline_i)
//! ```
//!
//! where baseline is the column mean of the transformed background rows.
//! Contributions are in log-odds space and sum to the row's log-odds
//! minus the background's expected log-odds.

use crate::{
    applicant::{LoanGrade, LoanTerm, RawApplicantRecord},
    error::{ScoreError, ScoreResult},
    features::{engineer, EngineeredRecord},
    pipeline::FeaturePipeline,
    surrogate::SurrogateModel,
};
use serde::Deserialize;
use std::path::Path;

const ENGINEERED_COLUMNS: [&str; 4] = ["grade_term", "accounts_opened_24m", "dti_inv", "fico_sq"];
const RAW_COLUMNS: [&str; 5] = ["grade", "term", "accounts_opened_24m", "debt_to_income", "fico_mid"];
const RAW_ALIASES: [(&str, &str); 2] = [
    ("accounts_opened_24m", "acc_open_past_24mths"),
    ("debt_to_income", "dti"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct LinearExplainer {
    coefficients: Vec<f64>,
    baseline:     Vec<f64>,
}

impl LinearExplainer {
    pub fn new(coefficients: Vec<f64>, baseline: Vec<f64>) -> ScoreResult<Self> {
        if coefficients.len() != baseline.len() {
            return Err(ScoreError::Resolution(format!(
                "{} coefficients but {} baseline columns",
                coefficients.len(),
                baseline.len()
            )));
        }
        if coefficients.iter().chain(&baseline).any(|v| !v.is_finite()) {
            return Err(ScoreError::Resolution(
                "explainer has a non-finite coefficient or baseline value".into(),
            ));
        }
        Ok(Self { coefficients, baseline })
    }

    /// Fit the baseline from background rows in engineered space.
    pub fn fit(
        model: &dyn SurrogateModel,
        pipeline: &FeaturePipeline,
        background: &[EngineeredRecord],
    ) -> ScoreResult<Self> {
        if background.is_empty() {
            return Err(ScoreError::Resolution("background dataset is empty".into()));
        }
        let width = pipeline.width();
        if model.coefficients().len() != width {
            return Err(ScoreError::Resolution(format!(
                "surrogate has {} coefficients, pipeline emits {} columns",
                model.coefficients().len(),
                width
            )));
        }

        let mut sums = vec![0.0; width];
        for row in background {
            for (sum, x) in sums.iter_mut().zip(pipeline.transform(row)) {
                *sum += x;
            }
        }
        let n = background.len() as f64;
        let baseline = sums.into_iter().map(|s| s / n).collect();

        Self::new(model.coefficients().to_vec(), baseline)
    }

    pub fn baseline(&self) -> &[f64] {
        &self.baseline
    }

    /// Log-odds of the background average relative to the intercept.
    pub fn expected_offset(&self) -> f64 {
        self.coefficients
            .iter()
            .zip(&self.baseline)
            .map(|(c, b)| c * b)
            .sum()
    }

    pub fn contributions(&self, encoded: &[f64]) -> ScoreResult<Vec<f64>> {
        if encoded.len() != self.coefficients.len() {
            return Err(ScoreError::Resolution(format!(
                "encoded row has {} columns, explainer expects {}",
                encoded.len(),
                self.coefficients.len()
            )));
        }
        let contributions: Vec<f64> = self
            .coefficients
            .iter()
            .zip(&self.baseline)
            .zip(encoded)
            .map(|((c, b), x)| c * (x - b))
            .collect();
        if let Some(i) = contributions.iter().position(|c| !c.is_finite()) {
            return Err(ScoreError::Resolution(format!(
                "contribution for encoded column {i} is not finite"
            )));
        }
        Ok(contributions)
    }
}

// ── Background dataset ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawBackgroundRow {
    grade: String,
    term: i64,
    #[serde(alias = "acc_open_past_24mths")]
    accounts_opened_24m: u32,
    #[serde(alias = "dti")]
    debt_to_income: f64,
    fico_mid: u16,
}

/// Load background rows. Rows in engineered space are used as-is; rows in
/// raw applicant space are validated and engineered on load.
pub fn load_background(path: &Path) -> ScoreResult<Vec<EngineeredRecord>> {
    if !path.exists() {
        return Err(ScoreError::ArtifactMissing { path: path.to_path_buf() });
    }
    let invalid = |e: csv::Error| ScoreError::artifact_invalid(path, e.to_string());
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(invalid)?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(invalid)?
        .iter()
        .map(str::to_string)
        .collect();
    let rows = if has_columns(&headers, &ENGINEERED_COLUMNS, &[]) {
        reader
            .deserialize::<EngineeredRecord>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?
    } else if has_columns(&headers, &RAW_COLUMNS, &RAW_ALIASES) {
        log::info!("Background at {} is in raw space; engineering rows", path.display());
        let mut rows = Vec::new();
        for row in reader.deserialize::<RawBackgroundRow>() {
            let row = row.map_err(invalid)?;
            let raw = LoanGrade::from_letter(&row.grade)
                .and_then(|grade| {
                    RawApplicantRecord::new(
                        grade,
                        LoanTerm::from_months(row.term)?,
                        row.accounts_opened_24m,
                        row.debt_to_income,
                        row.fico_mid,
                    )
                })
                .map_err(|e| ScoreError::artifact_invalid(path, e.to_string()))?;
            rows.push(engineer(&raw));
        }
        rows
    } else {
        return Err(ScoreError::artifact_invalid(
            path,
            format!("background columns mismatch; have {headers:?}"),
        ));
    };

    if let Some(line) = rows
        .iter()
        .position(|r| !r.dti_inv.is_finite() || !r.fico_sq.is_finite())
    {
        return Err(ScoreError::artifact_invalid(
            path,
            format!("background row {} has a non-finite value", line + 1),
        ));
    }
    if rows.is_empty() {
        return Err(ScoreError::artifact_invalid(path, "background dataset has no rows"));
    }
    log::debug!("Loaded {} background rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn has_columns(headers: &[String], columns: &[&str], aliases: &[(&str, &str)]) -> bool {
    columns.iter().all(|column| {
        headers.iter().any(|h| {
            h == column
                || aliases
                    .iter()
                    .any(|(name, alias)| name == column && h == alias)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contributions_are_coefficient_times_offset() {
        let explainer = LinearExplainer::new(vec![2.0, -0.5], vec![1.0, 4.0]).expect("widths match");
        let c = explainer.contributions(&[3.0, 2.0]).expect("row width matches");
        assert_eq!(c, vec![4.0, 1.0]);
        assert_eq!(explainer.expected_offset(), 0.0);
    }

    #[test]
    fn non_finite_inputs_are_refused() {
        let err = LinearExplainer::new(vec![1.0, 2.0], vec![f64::NAN, 0.0]).unwrap_err();
        assert!(matches!(err, ScoreError::Resolution(_)));

        let explainer = LinearExplainer::new(vec![1.0, 2.0], vec![0.0, 0.0]).expect("finite");
        let err = explainer.contributions(&[f64::INFINITY, 1.0]).unwrap_err();
        assert!(matches!(err, ScoreError::Resolution(_)));
    }

    #[test]
    fn row_at_baseline_has_zero_contributions() {
        let explainer = LinearExplainer::new(vec![1.5, 3.0], vec![0.2, 0.4]).expect("widths match");
        let c = explainer.contributions(&[0.2, 0.4]).expect("row width matches");
        assert!(c.iter().all(|v| *v == 0.0));
    }
}
