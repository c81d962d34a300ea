// Benchmark harness for quarry decode strategies.
//
// Purpose:
// - Provide a simple, repeatable baseline for decoding one captured body with each strategy.
// - Emit machine-readable JSON to stdout and a human-readable table to stderr.
//
// Design notes:
// - Decodes into `serde_json::Value` so every strategy does the same work.
// - Keep benchmarks "good enough" for trend tracking, not lab-grade profiling.

use std::hint::black_box;
use std::io::{self, Write};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};

use quarry::api::{Client, ClientConfig, DecoderKind, Error, ErrorKind};

#[derive(Clone, Debug)]
pub struct BenchArgs {
    pub payload: Vec<u8>,
    pub iterations: u64,
    pub decoders: Vec<DecoderKind>,
    pub format: BenchFormat,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BenchFormat {
    Json,
    Table,
    Both,
}

impl BenchFormat {
    pub fn parse(input: &str) -> Result<Self, Error> {
        match input.trim() {
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            "both" => Ok(Self::Both),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message("invalid --format (use json|table|both)")),
        }
    }
}

pub fn run_bench(args: BenchArgs, program_version: &str) -> Result<(), Error> {
    if args.iterations == 0 {
        return Err(Error::new(ErrorKind::Usage).with_message("--iterations must be at least 1"));
    }
    let start = SystemTime::now();

    let results = args
        .decoders
        .iter()
        .map(|kind| bench_decoder(*kind, &args.payload, args.iterations))
        .collect::<Vec<_>>();

    let output = json!({
        "name": "quarry",
        "version": program_version,
        "ts": rfc3339_now(start),
        "system": system_json(),
        "params": {
            "bytes": args.payload.len(),
            "iterations": args.iterations,
            "decoders": args.decoders.iter().map(|kind| kind.as_str()).collect::<Vec<_>>(),
            "debug_build": cfg!(debug_assertions),
        },
        "results": results,
    });

    emit_bench_output(output, args.format)
}

fn bench_decoder(kind: DecoderKind, payload: &[u8], iterations: u64) -> Value {
    let client = Client::from_config(&ClientConfig::new().with_decoder(kind));

    // One untimed decode validates the payload and warms per-thread buffers.
    let mut warmup = Value::Null;
    if let Err(err) = client.decode(payload, &mut warmup) {
        return json!({
            "decoder": kind.as_str(),
            "ok": false,
            "error": err.to_string(),
        });
    }

    let mut failures = 0u64;
    let started = Instant::now();
    for _ in 0..iterations {
        let mut value = Value::Null;
        if black_box(client.decode(black_box(payload), &mut value).is_err()) {
            failures += 1;
        }
        black_box(&value);
    }
    let elapsed = started.elapsed();

    let total_ns = elapsed.as_nanos() as f64;
    let ns_per_op = total_ns / iterations as f64;
    let secs = elapsed.as_secs_f64();
    let mib_per_sec = if secs > 0.0 {
        (payload.len() as f64 * iterations as f64) / (1024.0 * 1024.0) / secs
    } else {
        0.0
    };

    json!({
        "decoder": kind.as_str(),
        "ok": failures == 0,
        "failures": failures,
        "total_ms": elapsed.as_secs_f64() * 1000.0,
        "ns_per_op": ns_per_op,
        "mib_per_sec": mib_per_sec,
    })
}

fn emit_bench_output(value: Value, format: BenchFormat) -> Result<(), Error> {
    match format {
        BenchFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string()));
            Ok(())
        }
        BenchFormat::Table => emit_table(&value),
        BenchFormat::Both => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string()));
            emit_table(&value)
        }
    }
}

fn emit_table(value: &Value) -> Result<(), Error> {
    let mut stderr = io::stderr().lock();
    let mut write_line = |line: String| {
        writeln!(stderr, "{line}").map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write bench table")
                .with_source(err)
        })
    };

    write_line("quarry bench (table)".to_string())?;
    write_line(format!(
        "bytes={} iterations={}",
        value["params"]["bytes"], value["params"]["iterations"]
    ))?;
    write_line(format!(
        "{:<16} {:>12} {:>12} {:>12} {:>9}",
        "decoder", "total_ms", "ns/op", "MiB/s", "failures"
    ))?;

    for row in value["results"].as_array().into_iter().flatten() {
        let decoder = row["decoder"].as_str().unwrap_or("?");
        if let Some(error) = row["error"].as_str() {
            write_line(format!("{decoder:<16} failed: {error}"))?;
            continue;
        }
        write_line(format!(
            "{:<16} {:>12.2} {:>12.0} {:>12.1} {:>9}",
            decoder,
            row["total_ms"].as_f64().unwrap_or_default(),
            row["ns_per_op"].as_f64().unwrap_or_default(),
            row["mib_per_sec"].as_f64().unwrap_or_default(),
            row["failures"].as_u64().unwrap_or_default(),
        ))?;
    }
    Ok(())
}

fn system_json() -> Value {
    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    json!({
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "cpus": cpus,
    })
}

fn rfc3339_now(ts: SystemTime) -> String {
    let dur = ts.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = dur.as_secs() as i64;
    let nsec = dur.subsec_nanos();
    let tm = time::OffsetDateTime::from_unix_timestamp(secs)
        .unwrap_or(time::OffsetDateTime::UNIX_EPOCH);
    let tm = tm.replace_nanosecond(nsec).unwrap_or(tm);
    tm.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::{BenchFormat, bench_decoder, rfc3339_now};
    use quarry::api::{DecoderKind, ErrorKind};
    use std::time::UNIX_EPOCH;

    #[test]
    fn format_parse_accepts_known_values() {
        assert_eq!(BenchFormat::parse("json").expect("json"), BenchFormat::Json);
        assert_eq!(BenchFormat::parse(" both ").expect("both"), BenchFormat::Both);
        let err = BenchFormat::parse("csv").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn bench_row_reports_failure_without_timing() {
        let row = bench_decoder(DecoderKind::Standard, b"not json", 10);
        assert_eq!(row["ok"], false);
        assert!(row.get("ns_per_op").is_none());
    }

    #[test]
    fn bench_row_reports_timing_on_success() {
        let row = bench_decoder(DecoderKind::Fastest, br#"{"a":[1,2,3]}"#, 5);
        assert_eq!(row["ok"], true);
        assert_eq!(row["failures"], 0);
        assert!(row["ns_per_op"].as_f64().is_some());
    }

    #[test]
    fn rfc3339_epoch_is_stable() {
        assert_eq!(rfc3339_now(UNIX_EPOCH), "1970-01-01T00:00:00Z");
    }
}
