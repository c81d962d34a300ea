//! Purpose: `quarry` CLI entry point for exercising decode strategies on captured bodies.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Every decode goes through `api::Client` so strategy selection matches library use.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod bench;

use bench::{BenchArgs, BenchFormat, run_bench};
use quarry::api::{
    Client, ClientConfig, DecodeError, DecoderKind, Error, ErrorKind, to_exit_code,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

#[derive(Parser)]
#[command(
    name = "quarry",
    version,
    about = "Decode search-service response bodies with pluggable JSON strategies",
    long_about = None,
    after_help = r#"EXAMPLES
  $ quarry decode response.json
  $ quarry --decoder fast-compatible decode --pretty response.json
  $ quarry compare response.json
  $ quarry bench --iterations 5000 response.json

The decoder can also be chosen with QUARRY_DECODER; --decoder wins."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, global = true, value_enum, help = "Decode strategy (default: standard)")]
    decoder: Option<DecoderArg>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode one body and print it as JSON.
    Decode {
        #[arg(help = "Response body file (default: stdin)", value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        #[arg(long, help = "Pretty-print the decoded value")]
        pretty: bool,
    },
    /// Decode one body with every strategy and report whether they agree.
    Compare {
        #[arg(help = "Response body file (default: stdin)", value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },
    /// Time decoding of one body per strategy.
    Bench {
        #[arg(help = "Response body file (default: stdin)", value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        #[arg(long, default_value_t = 1000, help = "Decodes per strategy")]
        iterations: u64,
        #[arg(long, default_value = "table", help = "Output format: json|table|both")]
        format: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum DecoderArg {
    Standard,
    Fast,
    FastCompatible,
    Fastest,
}

impl From<DecoderArg> for DecoderKind {
    fn from(arg: DecoderArg) -> Self {
        match arg {
            DecoderArg::Standard => DecoderKind::Standard,
            DecoderArg::Fast => DecoderKind::Fast,
            DecoderArg::FastCompatible => DecoderKind::FastCompatible,
            DecoderArg::Fastest => DecoderKind::Fastest,
        }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("run `quarry --help` for usage"));
            }
        },
    };

    let config = resolve_config(cli.decoder)?;
    match cli.command {
        Command::Decode { file, pretty } => {
            let payload = read_payload(file.as_deref())?;
            let client = Client::from_config(&config);
            let mut value = Value::Null;
            client
                .decode(&payload, &mut value)
                .map_err(|err| with_input_path(Error::from(err), file.as_deref()))?;
            emit_json(&value, pretty);
            Ok(RunOutcome::ok())
        }
        Command::Compare { file } => {
            let payload = read_payload(file.as_deref())?;
            let (report, consistent) = compare_report(&payload);
            emit_json(&report, false);
            if consistent {
                Ok(RunOutcome::ok())
            } else {
                Ok(RunOutcome::with_code(1))
            }
        }
        Command::Bench {
            file,
            iterations,
            format,
        } => {
            let payload = read_payload(file.as_deref())?;
            let decoders = match cli.decoder {
                Some(arg) => vec![DecoderKind::from(arg)],
                None => DecoderKind::ALL.to_vec(),
            };
            run_bench(
                BenchArgs {
                    payload,
                    iterations,
                    decoders,
                    format: BenchFormat::parse(&format)?,
                },
                env!("CARGO_PKG_VERSION"),
            )?;
            Ok(RunOutcome::ok())
        }
    }
}

fn resolve_config(flag: Option<DecoderArg>) -> Result<ClientConfig, Error> {
    match flag {
        Some(arg) => Ok(ClientConfig::new().with_decoder(arg.into())),
        None => ClientConfig::from_env(),
    }
}

fn read_payload(file: Option<&Path>) -> Result<Vec<u8>, Error> {
    match file {
        Some(path) => std::fs::read(path).map_err(|err| {
            Error::new(map_io_error_kind(&err))
                .with_message("failed to read response body")
                .with_path(path)
                .with_source(err)
        }),
        None => {
            let mut payload = Vec::new();
            io::stdin().read_to_end(&mut payload).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read response body from stdin")
                    .with_source(err)
            })?;
            Ok(payload)
        }
    }
}

fn map_io_error_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}

fn with_input_path(err: Error, file: Option<&Path>) -> Error {
    match file {
        Some(path) => err.with_path(path),
        None => err,
    }
}

/// Decodes with every built-in strategy. Consistent means all strategies
/// agree on success/failure and all successful values are equal.
fn compare_report(payload: &[u8]) -> (Value, bool) {
    let mut results = Vec::new();
    let mut outcomes: Vec<Result<Value, ()>> = Vec::new();
    for kind in DecoderKind::ALL {
        let client = Client::from_config(&ClientConfig::new().with_decoder(kind));
        let mut value = Value::Null;
        match client.decode(payload, &mut value) {
            Ok(()) => {
                results.push(json!({"decoder": kind.as_str(), "ok": true}));
                outcomes.push(Ok(value));
            }
            Err(err) => {
                results.push(json!({
                    "decoder": kind.as_str(),
                    "ok": false,
                    "error": decode_error_json(&err),
                }));
                outcomes.push(Err(()));
            }
        }
    }

    let consistent = outcomes.windows(2).all(|pair| pair[0] == pair[1]);
    let report = json!({
        "bytes": payload.len(),
        "consistent": consistent,
        "results": results,
    });
    (report, consistent)
}

fn decode_error_json(err: &DecodeError) -> Value {
    let mut inner = Map::new();
    inner.insert("category".to_string(), json!(err.category().as_str()));
    inner.insert("message".to_string(), json!(err.message()));
    if let Some(offset) = err.offset() {
        inner.insert("offset".to_string(), json!(offset));
    }
    if let (Some(line), Some(column)) = (err.line(), err.column()) {
        inner.insert("line".to_string(), json!(line));
        inner.insert("column".to_string(), json!(column));
    }
    Value::Object(inner)
}

fn emit_json(value: &Value, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    println!("{}", rendered.unwrap_or_else(|_| "null".to_string()));
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", err.kind()))
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(offset) = err.offset() {
        inner.insert("offset".to_string(), json!(offset));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(path) = err.path() {
        lines.push(format!("path: {}", path.display()));
    }
    if let Some(offset) = err.offset() {
        lines.push(format!("offset: {offset}"));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error: ").to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}
