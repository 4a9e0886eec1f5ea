//! Attribution aggregation: encoded-column contributions collapsed onto
//! business features.
//!
//! RULES:
//!   - Contributions are matched to columns by position in the layout.
//!   - An indicator column only speaks for the applicant when it is lit.
//!   - Several columns mapping to one engineered feature collapse to the
//!     contribution with the largest magnitude. Ties keep the first seen.
//!   - Output is ordered by descending absolute contribution, stable.
//!   - At most one row per raw feature key, except grade_term.

use crate::{
    error::{ScoreError, ScoreResult},
    features::{EngineeredFeature, RawFeature},
    pipeline::{ColumnKind, FeatureLayout},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionRow {
    pub encoded_feature_name: String,
    pub feature:              EngineeredFeature,
    pub raw_feature_key:      RawFeature,
    pub contribution_score:   f64,
}

pub fn aggregate(
    layout: &FeatureLayout,
    encoded_row: &[f64],
    contributions: &[f64],
    max_reasons: usize,
) -> ScoreResult<Vec<AttributionRow>> {
    if contributions.len() != layout.len() || encoded_row.len() != layout.len() {
        return Err(ScoreError::Resolution(format!(
            "layout has {} columns, got {} values and {} contributions",
            layout.len(),
            encoded_row.len(),
            contributions.len()
        )));
    }

    let mut rows: Vec<AttributionRow> = Vec::with_capacity(EngineeredFeature::ALL.len());
    for ((column, &value), &contribution) in layout.columns().iter().zip(encoded_row).zip(contributions) {
        if matches!(column.kind, ColumnKind::Indicator { .. }) && value != 1.0 {
            continue;
        }
        let candidate = AttributionRow {
            encoded_feature_name: column.encoded_name.clone(),
            feature:              column.feature,
            raw_feature_key:      column.feature.raw_feature(),
            contribution_score:   contribution,
        };
        match rows.iter_mut().find(|r| r.feature == column.feature) {
            Some(existing) => {
                if candidate.contribution_score.abs() > existing.contribution_score.abs() {
                    *existing = candidate;
                }
            }
            None => rows.push(candidate),
        }
    }

    // sort_by is stable: equal magnitudes keep layout order.
    rows.sort_by(|a, b| {
        b.contribution_score
            .abs()
            .total_cmp(&a.contribution_score.abs())
    });

    let mut seen: Vec<RawFeature> = Vec::new();
    rows.retain(|row| {
        if row.raw_feature_key == RawFeature::GradeTerm {
            return true;
        }
        if seen.contains(&row.raw_feature_key) {
            return false;
        }
        seen.push(row.raw_feature_key);
        true
    });
    rows.truncate(max_reasons);
    Ok(rows)
}
