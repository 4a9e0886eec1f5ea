mod common;

use aura_core::{
    error::ScoreError,
    percentile::{PercentileIndex, PercentileTable},
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

fn accounts_index() -> PercentileIndex {
    let mut index = PercentileIndex::empty();
    index.insert(
        "accounts_opened_24m",
        PercentileTable::new(0.0, 50.0, vec![(0.25, 5.0), (0.50, 10.0), (0.75, 20.0)])
            .expect("valid table"),
    );
    index
}

#[test]
fn anchors_pin_bounds_and_median() {
    let index = accounts_index();
    assert_eq!(index.lookup(0.0, "accounts_opened_24m"), Some(0.0));
    assert_eq!(index.lookup(50.0, "accounts_opened_24m"), Some(1.0));
    assert_eq!(index.lookup(10.0, "accounts_opened_24m"), Some(0.5));
    assert_eq!(index.percentile(10.0, "accounts_opened_24m"), Some(50));
}

#[test]
fn unknown_feature_is_none_not_error() {
    let index = accounts_index();
    assert_eq!(index.lookup(3.0, "grade_term"), None);
    assert_eq!(index.percentile(3.0, "income"), None);
}

#[test]
fn lookup_is_monotone_over_random_values() {
    let index = accounts_index();
    let mut rng = Pcg64::seed_from_u64(0x5EED_0001);
    let mut values: Vec<f64> = (0..500).map(|_| rng.gen_range(-10.0..60.0)).collect();
    values.sort_by(f64::total_cmp);

    let mut prev = 0.0;
    for value in values {
        let rank = index
            .lookup(value, "accounts_opened_24m")
            .expect("table exists");
        assert!((0.0..=1.0).contains(&rank), "rank {rank} for {value} out of range");
        assert!(rank >= prev, "rank fell from {prev} to {rank} at {value}");
        prev = rank;
    }
}

#[test]
fn loads_tables_from_csv_file() {
    let dir = common::temp_models_dir("pct");
    let path = dir.join("surrogate_percentiles_v1.csv");
    std::fs::write(&path, common::PERCENTILES_CSV).expect("write percentiles");

    let index = PercentileIndex::load(&path).expect("percentiles load");
    assert_eq!(index.len(), 5);
    assert_eq!(index.percentile(2.0, "accounts_opened_24m"), Some(25));
    assert_eq!(index.percentile(712.0, "fico_mid"), Some(50));
    assert_eq!(index.percentile(900.0, "fico_mid"), Some(100));
}

#[test]
fn missing_file_degrades_to_empty_index() {
    let dir = common::temp_models_dir("pct-missing");
    let index = PercentileIndex::load(&dir.join("absent.csv")).expect("absence is not an error");
    assert!(index.is_empty());
}

#[test]
fn non_monotone_row_is_skipped() {
    let csv = "\
feature,min,max,p25,p50,p75
fico_mid,640,850,687,712,742
dti,0,40,24.3,17.9,11.8
";
    let index = PercentileIndex::from_csv(csv.as_bytes()).expect("csv parses");
    assert!(index.table("fico_mid").is_some());
    assert!(index.table("dti").is_none(), "out-of-order anchors must not load");
    assert_eq!(index.percentile(15.0, "dti"), None);
}

#[test]
fn malformed_file_is_an_artifact_error() {
    let dir = common::temp_models_dir("pct-bad");
    let path = dir.join("surrogate_percentiles_v1.csv");
    std::fs::write(&path, "feature,min,max,p50\nfico_mid,640,high,712\n").expect("write");
    let err = PercentileIndex::load(&path).unwrap_err();
    assert!(matches!(err, ScoreError::ArtifactInvalid { .. }), "got {err}");
}

#[test]
fn p0_and_p100_columns_load_and_rank() {
    let csv = "\
feature,min,max,p0,p50,p100,p150
accounts_opened_24m,0,30,0,4,30,45
";
    let index = PercentileIndex::from_csv(csv.as_bytes()).expect("csv parses");
    let table = index
        .table("accounts_opened_24m")
        .expect("p0/p100 anchors must not drop the row");
    assert_eq!(table.anchors(), &[(0.0, 0.0), (0.5, 4.0), (1.0, 30.0)]);
    assert_eq!(index.percentile(2.0, "accounts_opened_24m"), Some(25));
    assert_eq!(index.percentile(17.0, "accounts_opened_24m"), Some(75));
    assert_eq!(index.percentile(30.0, "accounts_opened_24m"), Some(100));
}
