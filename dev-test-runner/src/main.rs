//! Runs the portable JDDF suite files and prints a pass/fail line per case.
//!
//! - `validation.json`: `{ name: { schema, instance, errors } }`
//! - `invalid_schemas.json`: `{ name: schema }`, each must be rejected
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use jddf::{Schema, ValidationError};

#[derive(Parser, Debug)]
struct Settings {
    /// directory holding the suite files
    #[arg(long, default_value = "suite")]
    suite_dir: PathBuf,

    /// only run cases whose name matches this regex
    #[arg(long)]
    filter: Option<String>,

    /// print passing cases too
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Deserialize, Debug)]
struct Case {
    schema: Value,
    instance: Value,
    errors: Vec<ValidationError>,
}

#[derive(Default)]
struct Tally {
    passed: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, name: &str, outcome: Result<(), String>, verbose: bool) {
        match outcome {
            Ok(()) => {
                self.passed += 1;
                if verbose {
                    println!("{} {name}", "PASS".green());
                }
            }
            Err(why) => {
                self.failed += 1;
                println!("{} {name}\n     {why}", "FAIL".red().bold());
            }
        }
    }
}

fn load<T: serde::de::DeserializeOwned>(settings: &Settings, file: &str) -> Result<T> {
    let path = settings.suite_dir.join(file);
    let src = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    jddf::path_de::from_str_with_path(&src).with_context(|| format!("malformed suite file {}", path.display()))
}

fn run_validation_case(case: &Case) -> Result<(), String> {
    let schema = Schema::from_json(&case.schema).map_err(|e| format!("schema did not deserialize: {e}"))?;
    schema.verify().map_err(|e| format!("schema did not verify: {e}"))?;
    let actual = jddf::validate(&schema, &case.instance).map_err(|e| e.to_string())?;
    if actual == case.errors {
        Ok(())
    } else {
        Err(format!(
            "expected {}\n     actual   {}",
            serde_json::to_string(&case.errors).unwrap_or_default(),
            serde_json::to_string(&actual).unwrap_or_default(),
        ))
    }
}

fn run_invalid_schema_case(raw: &Value) -> Result<(), String> {
    match Schema::from_json(raw) {
        Err(_) => Ok(()),
        Ok(schema) => match schema.verify() {
            Err(_) => Ok(()),
            Ok(_) => Err("schema was accepted".to_owned()),
        },
    }
}

fn run(settings: &Settings) -> Result<Tally> {
    let filter = settings
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("bad --filter regex")?;
    let selected = |name: &str| filter.as_ref().is_none_or(|rx| rx.is_match(name));

    let mut tally = Tally::default();

    let cases: Map<String, Value> = load(settings, "validation.json")?;
    for (name, raw) in cases.iter().filter(|(name, _)| selected(name)) {
        let outcome = serde_json::from_value::<Case>(raw.clone())
            .map_err(|e| format!("malformed case: {e}"))
            .and_then(|case| run_validation_case(&case));
        tally.record(name, outcome, settings.verbose);
    }

    let schemas: Map<String, Value> = load(settings, "invalid_schemas.json")?;
    for (name, raw) in schemas.iter().filter(|(name, _)| selected(name)) {
        tally.record(name, run_invalid_schema_case(raw), settings.verbose);
    }

    Ok(tally)
}

fn main() -> ExitCode {
    let settings = Settings::parse();
    match run(&settings) {
        Ok(tally) => {
            println!("—— {} passed, {} failed ——", tally.passed, tally.failed);
            if tally.failed == 0 { ExitCode::SUCCESS } else { ExitCode::from(1) }
        }
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}
