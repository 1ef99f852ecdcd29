//! Minimal CLI: verify a schema, or validate JSON/NDJSON instances against it.
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use jddf::{Schema, ValidateOptions, ValidationError, Validator};

use crate::jq_exec::JqSelector;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// check JDDF schemas and validate JSON documents against them
#[derive(Parser, Debug)]
#[command(name = "jddf", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// deserialize and verify a schema
    Verify(VerifyCmd),
    /// validate instances, one JSON report line per instance
    Validate(ValidateCmd),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema file (JSON)
    #[arg(long, short)]
    schema: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document; every output is validated.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct VerifyCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// echo the schema's normalized wire JSON on success
    #[arg(long)]
    print: bool,
}

#[derive(clap::Parser, Debug)]
struct ValidateCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// ref depth bound; allows at most max_depth - 1 nested refs (0 = unbounded)
    #[arg(long)]
    max_depth: Option<usize>,

    /// stop collecting errors for an instance after this many (0 = unbounded)
    #[arg(long)]
    max_errors: Option<usize>,

    /// output .ndjson report file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One parsed instance plus where it came from.
#[derive(Debug)]
struct Instance {
    source: String,
    index: usize,
    value: Value,
}

#[derive(Serialize, Debug)]
struct Report<'a> {
    source: &'a str,
    index: usize,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [ValidationError]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fatal: Option<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load_schema(&self) -> Result<Schema> {
        let path = self.schema.display().to_string();
        let source = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read schema file ({path})"))?;
        let schema = jddf::path_de::from_str_with_path::<Schema>(&source)
            .with_context(|| format!("malformed schema ({path})"))?;
        schema
            .verify()
            .with_context(|| format!("invalid schema ({path})"))?;
        tracing::info!(schema = %path, form = %schema.form(), "schema verified");
        Ok(schema)
    }
}

impl InputSettings {
    fn load_instances(&self) -> Result<Vec<Instance>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let selector = match self.jq_expr.as_deref() {
            None => None,
            Some(jq_expr) => Some(
                JqSelector::compile(jq_expr).with_context(|| format!("failed to compile jq expression `{jq_expr}`"))?,
            ),
        };
        let mut instances = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let mut index = 0;
            for document in self.read_documents(&source_path)? {
                let document = match self.json_pointer.as_deref() {
                    None => document,
                    Some(pointer) => match document.pointer(pointer) {
                        Some(node) => node.clone(),
                        None => bail!("JSON pointer {pointer} matched nothing in {source_path_str}"),
                    },
                };
                let selected = match selector.as_ref() {
                    None => vec![document],
                    Some(selector) => selector.select(&document).with_context(|| {
                        format!("failed to apply jq expression to source file ({source_path_str})")
                    })?,
                };
                for value in selected {
                    instances.push(Instance { source: source_path_str.clone(), index, value });
                    index += 1;
                }
            }
        }
        tracing::debug!(count = instances.len(), "instances loaded");
        Ok(instances)
    }

    fn read_documents(&self, path: &Path) -> Result<Vec<Value>> {
        let path_str = path.display();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read source file ({path_str})"))?;
        if !self.ndjson {
            let value = serde_json::from_str::<Value>(&source)
                .with_context(|| format!("failed to parse JSON source file ({path_str})"))?;
            return Ok(vec![value]);
        }
        source
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str::<Value>(line)
                    .with_context(|| format!("failed to parse NDJSON line {} of ({path_str})", n + 1))
            })
            .collect()
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Exit status: 0 all valid, 1 some instance invalid.
    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Verify(target) => {
                let schema = target.schema_settings.load_schema()?;
                if target.print {
                    println!("{}", serde_json::to_string_pretty(&schema.to_json()?)?);
                }
                eprintln!("{} {}", "✔".green(), target.schema_settings.schema.display());
                Ok(ExitCode::SUCCESS)
            }
            Command::Validate(target) => Ok(target.execute()?.exit_code()),
        }
    }
}

/// Counts from one `validate` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Summary {
    total: usize,
    invalid: usize,
}

impl Summary {
    fn exit_code(&self) -> ExitCode {
        if self.invalid == 0 { ExitCode::SUCCESS } else { ExitCode::from(1) }
    }
}

impl ValidateCmd {
    fn execute(&self) -> Result<Summary> {
        let schema = self.schema_settings.load_schema()?;
        let instances = self.input_settings.load_instances()?;

        let options = ValidateOptions {
            max_depth: self.max_depth,
            max_errors: self.max_errors,
        };
        let validator = Validator::new(options);

        // schema is frozen from here on; instances are independent
        let outcomes: Vec<_> = instances
            .par_iter()
            .map(|instance| validator.validate(&schema, &instance.value))
            .collect();

        let mut sink: Box<dyn Write> = match self.out.as_ref() {
            Some(out) => {
                if let Some(parent) = out.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Box::new(std::fs::File::create(out)
                    .with_context(|| format!("failed to create {}", out.display()))?)
            }
            None => Box::new(std::io::stdout().lock()),
        };

        let mut invalid = 0usize;
        for (instance, outcome) in instances.iter().zip(&outcomes) {
            let report = match outcome {
                Ok(errors) => Report {
                    source: &instance.source,
                    index: instance.index,
                    valid: errors.is_empty(),
                    errors: Some(errors.as_slice()),
                    fatal: None,
                },
                Err(fatal) => Report {
                    source: &instance.source,
                    index: instance.index,
                    valid: false,
                    errors: None,
                    fatal: Some(fatal.to_string()),
                },
            };
            if !report.valid {
                invalid += 1;
            }
            writeln!(sink, "{}", serde_json::to_string(&report)?)?;
        }
        sink.flush()?;

        let summary = Summary { total: instances.len(), invalid };
        if invalid == 0 {
            eprintln!("{} {} valid", "✔".green(), summary.total);
        } else {
            eprintln!("{} {invalid} of {} invalid", "✘".red(), summary.total);
        }
        Ok(summary)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jddf::MaxDepthExceededError;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        CommandLineInterface::command().debug_assert();
    }

    #[test]
    fn parses_validate_flags() {
        let cli = CommandLineInterface::try_parse_from([
            "jddf", "validate", "--schema", "s.json", "--input", "a.json", "b.json",
            "--max-depth", "16", "--max-errors", "5", "--ndjson",
        ])
        .unwrap();
        let Command::Validate(cmd) = cli.cmd else { panic!("expected validate") };
        assert_eq!(cmd.max_depth, Some(16));
        assert_eq!(cmd.max_errors, Some(5));
        assert!(cmd.input_settings.ndjson);
        assert_eq!(cmd.input_settings.input, ["a.json", "b.json"]);
    }

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["x/y.json"]).unwrap();
        assert_eq!(paths, [PathBuf::from("x/y.json")]);
    }

    #[test]
    fn empty_glob_is_an_error() {
        assert!(resolve_file_path_patterns(["/definitely/not/here/*.json"]).is_err());
    }

    // ---- end-to-end over temp files ----

    fn write(dir: &TempDir, name: &str, contents: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().to_string()
    }

    fn inputs(input: Vec<String>, ndjson: bool) -> InputSettings {
        InputSettings { ndjson, json_pointer: None, jq_expr: None, input }
    }

    fn validate_cmd(args: &[&str]) -> ValidateCmd {
        let cli = CommandLineInterface::try_parse_from(["jddf", "validate"].iter().chain(args)).unwrap();
        let Command::Validate(cmd) = cli.cmd else { panic!("expected validate") };
        cmd
    }

    fn report_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    const PERSON: &str = r#"{"properties": {"name": {"type": "string"}}}"#;

    #[test]
    fn reads_a_plain_json_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write(&dir, "doc.json", "{\n  \"name\": \"Ada\"\n}\n");
        let docs = inputs(vec![doc.clone()], false).read_documents(Path::new(&doc)).unwrap();
        assert_eq!(docs, vec![json!({"name": "Ada"})]);
    }

    #[test]
    fn ndjson_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write(&dir, "docs.ndjson", "{\"a\": 1}\n\n   \n[2]\n\"three\"\n");
        let docs = inputs(vec![doc.clone()], true).read_documents(Path::new(&doc)).unwrap();
        assert_eq!(docs, vec![json!({"a": 1}), json!([2]), json!("three")]);
    }

    #[test]
    fn ndjson_reports_the_broken_line() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write(&dir, "docs.ndjson", "{\"a\": 1}\n\n{\"b\": \n");
        let err = inputs(vec![doc.clone()], true).read_documents(Path::new(&doc)).unwrap_err();
        assert!(format!("{err:#}").contains("NDJSON line 3"), "{err:#}");
    }

    #[test]
    fn json_pointer_selects_a_subnode() {
        let dir = tempfile::tempdir().unwrap();
        let doc = write(&dir, "doc.json", r#"{"data": {"payload": {"name": "Ada"}}}"#);
        let mut settings = inputs(vec![doc.clone()], false);
        settings.json_pointer = Some("/data/payload".into());
        let instances = settings.load_instances().unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].value, json!({"name": "Ada"}));
        assert_eq!(instances[0].source, doc);

        settings.json_pointer = Some("/data/missing".into());
        let err = settings.load_instances().unwrap_err();
        assert!(err.to_string().contains("matched nothing"), "{err}");
    }

    #[test]
    fn jq_fans_out_with_per_source_indices() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(&dir, "a.json", r#"{"items": [1, 2, 3]}"#);
        let second = write(&dir, "b.json", r#"{"items": [4]}"#);
        let mut settings = inputs(vec![first.clone(), second.clone()], false);
        settings.jq_expr = Some(".items[]".into());
        let instances = settings.load_instances().unwrap();
        let seen: Vec<_> = instances.iter().map(|i| (i.source.as_str(), i.index, i.value.clone())).collect();
        assert_eq!(
            seen,
            vec![
                (first.as_str(), 0, json!(1)),
                (first.as_str(), 1, json!(2)),
                (first.as_str(), 2, json!(3)),
                (second.as_str(), 0, json!(4)),
            ]
        );
    }

    #[test]
    fn validate_writes_one_report_line_per_instance() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(&dir, "schema.json", PERSON);
        let docs = write(&dir, "people.ndjson", "{\"name\": \"Ada\"}\n{\"name\": 1}\n");
        let out = dir.path().join("reports").join("out.ndjson");
        let out_str = out.to_string_lossy().to_string();

        let cmd = validate_cmd(&["--schema", &schema, "--input", &docs, "--ndjson", "--out", &out_str]);
        assert_eq!(cmd.execute().unwrap(), Summary { total: 2, invalid: 1 });
        assert_eq!(
            report_lines(&out),
            vec![
                json!({"source": docs, "index": 0, "valid": true, "errors": []}),
                json!({
                    "source": docs, "index": 1, "valid": false,
                    "errors": [{"instancePath": ["name"], "schemaPath": ["properties", "name", "type"]}]
                }),
            ]
        );

        // the full run() path goes through the same report writer
        let cli = CommandLineInterface::try_parse_from([
            "jddf", "validate", "--schema", &schema, "--input", &docs, "--ndjson", "--out", &out_str,
        ])
        .unwrap();
        assert!(cli.run().is_ok());
        assert_eq!(report_lines(&out).len(), 2);
    }

    #[test]
    fn all_valid_input_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(&dir, "schema.json", PERSON);
        let doc = write(&dir, "ok.json", r#"{"name": "Ada"}"#);
        let out = dir.path().join("out.ndjson");

        let cmd = validate_cmd(&["--schema", &schema, "--input", &doc, "--out", &out.to_string_lossy()]);
        let summary = cmd.execute().unwrap();
        assert_eq!(summary, Summary { total: 1, invalid: 0 });
        assert_eq!(format!("{:?}", summary.exit_code()), format!("{:?}", ExitCode::SUCCESS));
        assert_eq!(format!("{:?}", Summary { total: 1, invalid: 1 }.exit_code()), format!("{:?}", ExitCode::from(1)));
    }

    #[test]
    fn depth_limit_becomes_a_fatal_line() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(&dir, "loop.json", r#"{"definitions": {"loop": {"ref": "loop"}}, "ref": "loop"}"#);
        let doc = write(&dir, "any.json", "null");
        let out = dir.path().join("out.ndjson");

        let cmd = validate_cmd(&[
            "--schema", &schema, "--input", &doc, "--max-depth", "1", "--out", &out.to_string_lossy(),
        ]);
        assert_eq!(cmd.execute().unwrap(), Summary { total: 1, invalid: 1 });

        let lines = report_lines(&out);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["valid"], json!(false));
        assert!(lines[0].get("errors").is_none());
        assert_eq!(
            lines[0]["fatal"],
            json!(MaxDepthExceededError { max_depth: 1 }.to_string())
        );
    }
}
