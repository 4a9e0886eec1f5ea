use aura_core::{
    applicant::{LoanGrade, LoanTerm, RawApplicantRecord},
    features::{canonical_term, engineer, EngineeredFeature, RawFeature, DTI_EPSILON},
};

fn record(grade: LoanGrade, term: LoanTerm, dti: f64, fico: u16) -> RawApplicantRecord {
    RawApplicantRecord::new(grade, term, 3, dti, fico).expect("valid record")
}

#[test]
fn term_strings_match_artifact_categories_byte_for_byte() {
    assert_eq!(canonical_term(LoanTerm::Months36).as_bytes(), b" 36 months");
    assert_eq!(canonical_term(LoanTerm::Months60).as_bytes(), b" 60 months");

    let engineered = engineer(&record(LoanGrade::A, LoanTerm::Months36, 15.0, 750));
    assert_eq!(engineered.grade_term, "A_ 36 months");
    let engineered = engineer(&record(LoanGrade::G, LoanTerm::Months60, 15.0, 750));
    assert_eq!(engineered.grade_term, "G_ 60 months");
}

#[test]
fn derived_values_follow_their_formulas() {
    let engineered = engineer(&record(LoanGrade::C, LoanTerm::Months36, 15.0, 750));
    assert_eq!(engineered.accounts_opened_24m, 3);
    assert_eq!(engineered.fico_sq, 562_500.0);
    assert_eq!(engineered.dti_inv, 1.0 / (15.0 + DTI_EPSILON));
}

#[test]
fn zero_dti_stays_finite() {
    let engineered = engineer(&record(LoanGrade::B, LoanTerm::Months36, 0.0, 700));
    assert!(engineered.dti_inv.is_finite());
    assert!((engineered.dti_inv - 1000.0).abs() < 1e-9, "1 / 1e-3 should be 1000");
}

#[test]
fn engineering_is_deterministic() {
    for grade in LoanGrade::ALL {
        for term in [LoanTerm::Months36, LoanTerm::Months60] {
            let raw = record(grade, term, 21.7, 688);
            assert_eq!(engineer(&raw), engineer(&raw), "{grade} {term:?} must engineer identically");
        }
    }
}

#[test]
fn engineered_features_map_to_business_keys() {
    assert_eq!(EngineeredFeature::DtiInv.raw_feature(), RawFeature::Dti);
    assert_eq!(EngineeredFeature::FicoSq.raw_feature(), RawFeature::FicoMid);
    assert_eq!(EngineeredFeature::GradeTerm.raw_feature(), RawFeature::GradeTerm);
    assert_eq!(
        EngineeredFeature::AccountsOpened24m.raw_feature(),
        RawFeature::AccountsOpened24m
    );
    assert_eq!(RawFeature::Dti.display_name(), "Debt-to-Income Ratio");
    assert_eq!(RawFeature::GradeTerm.display_name(), "Grade & Term");
}
