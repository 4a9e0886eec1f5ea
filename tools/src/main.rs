//! score-runner: headless scoring runner for the loan default engine.
//!
//! Usage:
//!   score-runner --json '{"grade":"A","term":36,"accounts_opened_24m":2,"debt_to_income":15.0,"fico_mid":750}'
//!   score-runner --models-dir ./models --model-version v1 --db predictions.db < applicants.jsonl
//!   score-runner --ipc-mode

use anyhow::{Context, Result};
use aura_core::{
    applicant::RawApplicantRecord,
    config::EngineConfig,
    engine::ScoringEngine,
    prediction::{PredictionRecord, RiskClass},
    store::PredictionStore,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Score {
        applicant: serde_json::Value,
    },
    GetSummary,
    Quit,
}

#[derive(serde::Serialize)]
struct RunSummary {
    model_version:    String,
    threshold:        f64,
    threshold_policy: String,
    scored:           u64,
    high_risk:        usize,
    low_risk:         usize,
    top_reasons:      Vec<(String, u64)>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = EngineConfig::from_env()?;
    if let Some(dir) = string_arg(&args, "--models-dir") {
        config.models_dir = dir.into();
    }
    if let Some(version) = string_arg(&args, "--model-version") {
        config.model_version = version.to_string();
    }
    config.max_reasons = parse_arg(&args, "--max-reasons", config.max_reasons);
    config.near_threshold_band = parse_arg(&args, "--band", config.near_threshold_band);
    config.validate()?;

    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let single = string_arg(&args, "--json");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");

    let store = PredictionStore::open(db)?;
    store.migrate()?;

    let engine = ScoringEngine::build(&config)?;
    if let Err(e) = engine.warm_up() {
        log::warn!("Warm-up failed, artifacts will load on first request: {e}");
    }

    if let Some(doc) = single {
        let record = score_document(&engine, &store, &config, doc)?;
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else if ipc_mode {
        run_ipc_loop(&engine, &store, &config)?;
    } else {
        run_batch(&engine, &store, &config)?;
        print_summary(&engine, &store)?;
    }

    Ok(())
}

fn score_document(
    engine: &ScoringEngine,
    store: &PredictionStore,
    config: &EngineConfig,
    doc: &str,
) -> Result<PredictionRecord> {
    let raw: RawApplicantRecord =
        serde_json::from_str(doc).context("applicant document rejected")?;
    score_record(engine, store, config, &raw)
}

fn score_record(
    engine: &ScoringEngine,
    store: &PredictionStore,
    config: &EngineConfig,
    raw: &RawApplicantRecord,
) -> Result<PredictionRecord> {
    let record = engine.predict(raw, config.near_threshold_band)?;
    store.insert_prediction(&record)?;
    Ok(record)
}

/// One applicant document per stdin line, one prediction per stdout line.
fn run_batch(engine: &ScoringEngine, store: &PredictionStore, config: &EngineConfig) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match score_document(engine, store, config, &line) {
            Ok(record) => writeln!(stdout, "{}", serde_json::to_string(&record)?)?,
            Err(e) => {
                log::warn!("Skipping applicant: {e:#}");
                writeln!(stdout, "{}", serde_json::json!({ "error": format!("{e:#}") }))?;
            }
        }
    }
    stdout.flush()?;
    Ok(())
}

fn run_ipc_loop(engine: &ScoringEngine, store: &PredictionStore, config: &EngineConfig) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Score { applicant } => {
                let outcome = serde_json::from_value::<RawApplicantRecord>(applicant)
                    .context("applicant document rejected")
                    .and_then(|raw| score_record(engine, store, config, &raw));
                match outcome {
                    Ok(record) => writeln!(stdout, "{}", serde_json::to_string(&record)?)?,
                    Err(e) => {
                        let err_json = serde_json::json!({ "error": format!("{e:#}") });
                        writeln!(stdout, "{}", err_json)?;
                    }
                }
            }
            IpcCommand::GetSummary => {
                let summary = build_summary(engine, store)?;
                writeln!(stdout, "{}", serde_json::to_string(&summary)?)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn build_summary(engine: &ScoringEngine, store: &PredictionStore) -> Result<RunSummary> {
    let threshold = engine.threshold();
    Ok(RunSummary {
        model_version:    engine.artifacts().paths().model_version.clone(),
        threshold:        threshold.value,
        threshold_policy: threshold.policy.clone(),
        scored:           store.prediction_count()?,
        high_risk:        store.predictions_by_risk_class(RiskClass::High)?.len(),
        low_risk:         store.predictions_by_risk_class(RiskClass::Low)?.len(),
        top_reasons:      store.top_reason_counts(3)?,
    })
}

fn print_summary(engine: &ScoringEngine, store: &PredictionStore) -> Result<()> {
    let summary = build_summary(engine, store)?;

    eprintln!("=== RUN SUMMARY ===");
    eprintln!("  model version:  {}", summary.model_version);
    eprintln!("  threshold:      {:.3} ({})", summary.threshold, summary.threshold_policy);
    eprintln!("  scored:         {}", summary.scored);
    eprintln!("  high risk:      {}", summary.high_risk);
    eprintln!("  low risk:       {}", summary.low_risk);

    if summary.top_reasons.is_empty() {
        eprintln!("  (No reasons recorded)");
    } else {
        eprintln!("  top reasons:");
        for (code, count) in &summary.top_reasons {
            eprintln!("    {code:<24} {count}");
        }
    }
    if let Some(latest) = store.latest_prediction()? {
        eprintln!(
            "  latest:         {} p={:.4} {}",
            latest.request_id, latest.result.probability_of_default, latest.result.risk_class
        );
    }
    Ok(())
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
