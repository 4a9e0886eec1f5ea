//! Scoring must be a pure function of the applicant and the artifacts.
//!
//! Two engines over the same artifacts, same applicants.
//! They must produce identical results, and repeated scoring through one
//! engine must never drift.

mod common;

use aura_core::{
    applicant::{LoanGrade, LoanTerm, RawApplicantRecord},
    config::EngineConfig,
    engine::ScoringEngine,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

fn build_engine(models_dir: &std::path::Path) -> ScoringEngine {
    ScoringEngine::build(&EngineConfig::default_test(models_dir)).expect("engine builds")
}

fn applicants(seed: u64, count: usize) -> Vec<RawApplicantRecord> {
    let mut rng = Pcg64::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            RawApplicantRecord::new(
                LoanGrade::ALL[rng.gen_range(0..LoanGrade::ALL.len())],
                if rng.gen_bool(0.3) { LoanTerm::Months60 } else { LoanTerm::Months36 },
                rng.gen_range(0..20),
                rng.gen_range(0.0..50.0),
                rng.gen_range(300..=850),
            )
            .expect("generated applicant is valid")
        })
        .collect()
}

#[test]
fn same_artifacts_produce_identical_results() {
    const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;

    let paths = common::fixture_models("determinism");
    let engine_a = build_engine(&paths.models_dir);
    let engine_b = build_engine(&paths.models_dir);

    for (i, raw) in applicants(SEED, 250).iter().enumerate() {
        let a = engine_a.score(raw).expect("engine_a scores");
        let b = engine_b.score(raw).expect("engine_b scores");
        assert_eq!(a, b, "Results diverged at applicant {i}:\n  A: {a:?}\n  B: {b:?}");

        let again = engine_a.score(raw).expect("engine_a rescoring");
        assert_eq!(a, again, "Rescoring applicant {i} changed the result");
    }
}
