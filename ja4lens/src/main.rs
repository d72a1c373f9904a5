// ja4lens/src/main.rs
//
// ja4lens: JA4+ fingerprint lookup, aggregation and risk scoring
//
// Operational modes:
//   search    aggregated profile of one fingerprint
//   suggest   prefix completion against the loaded dataset
//   detect    family of a fingerprint (dataset first, then shape)
//   parse     translate the first section of a JA4 client fingerprint
//   analyze   validate a capture file and run the ja4 extraction tool on it
//   serve     length-prefixed JSON query API over TCP
//   stats     dataset summary
//
// Usage:
//   ja4lens --mode search --query t13d1516h2_8daaf6152771_02713d6af862
//   ja4lens --mode suggest --query t13d --json
//   ja4lens --mode analyze --path capture.pcapng
//   ja4lens --mode serve --listen 0.0.0.0:50051

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ja4lens::ingest::{self, extractor::{ExtractorConfig, Ja4Extractor}};
use ja4lens::query_api::QueryServer;
use ja4lens::report;
use ja4lens::{FingerprintDb, FingerprintFamily, SharedDb};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name    = "ja4lens",
    about   = "JA4+ fingerprint index, aggregation and risk scoring",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[arg(long, value_enum, default_value = "search")]
    mode: Mode,

    #[arg(long, short, help = "Fingerprint or prefix (search/suggest/detect/parse)")]
    query: Option<String>,

    #[arg(long, env = "JA4LENS_DB", default_value = "database.json",
          help = "Fingerprint dataset (JSON array of records)")]
    db: PathBuf,

    #[arg(long, help = "Capture file to analyze (.pcap / .pcapng)")]
    path: Option<PathBuf>,

    #[arg(long, default_value = "127.0.0.1:50051", help = "Query API bind address (serve mode)")]
    listen: String,

    #[arg(long, env = "JA4_SCRIPT_PATH", default_value = ingest::extractor::DEFAULT_SCRIPT,
          help = "Path to the ja4 extraction script")]
    ja4_script: PathBuf,

    #[arg(long, default_value = "python3", help = "Interpreter used to run the extraction script")]
    python: String,

    #[arg(long, default_value = "60", help = "Extraction timeout in seconds")]
    timeout_secs: u64,

    #[arg(long, help = "Emit JSON instead of the terminal report")]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Search,   // aggregated profile
    Suggest,  // prefix completion
    Detect,   // family classification
    Parse,    // JA4 section-a translation
    Analyze,  // capture file → ja4 tool
    Serve,    // TCP query API
    Stats,    // dataset summary
}

impl Cli {
    fn query(&self) -> Result<&str> {
        self.query.as_deref().context("--query is required for this mode")
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn not_found(json: bool, what: &str, input: &str) -> Result<()> {
    if json {
        print_json(&serde_json::json!({ "error": "not_found", "input": input }))
    } else {
        println!("\x1b[93mNo {} found for\x1b[0m {}", what, input);
        Ok(())
    }
}

// ── Modes ─────────────────────────────────────────────────────────────────────

fn run_stats(cli: &Cli, db: &FingerprintDb) -> Result<()> {
    let stats = db.stats();
    if cli.json {
        print_json(&stats)
    } else {
        print!("{}", report::render_stats(&stats));
        Ok(())
    }
}

fn run_lookup(cli: &Cli, db: &FingerprintDb) -> Result<()> {
    let q = cli.query()?;
    match cli.mode {
        Mode::Search => match db.search(q) {
            Some(result) if cli.json => print_json(&result),
            Some(result) => {
                let parsed = match result.fingerprint_type {
                    FingerprintFamily::Ja4 => db.parse_display(&result.fingerprint),
                    _ => None,
                };
                print!("{}", report::render_result(&result, parsed.as_ref()));
                Ok(())
            }
            None => not_found(cli.json, "records", q),
        },
        Mode::Suggest => {
            let items = db.suggest(q);
            if cli.json {
                print_json(&items)
            } else {
                print!("{}", report::render_suggestions(&items));
                Ok(())
            }
        }
        Mode::Detect => match db.detect(q) {
            Some(family) if cli.json => print_json(&serde_json::json!({ "type": family })),
            Some(family) => {
                println!("{family}");
                Ok(())
            }
            None => not_found(cli.json, "fingerprint family", q),
        },
        Mode::Parse => match db.parse_display(q) {
            Some(parsed) if cli.json => print_json(&parsed),
            Some(parsed) => {
                println!("Protocol       {}", parsed.protocol);
                println!("TLS Version    {}", parsed.tls_version);
                println!("SNI            {}", parsed.sni);
                println!("Cipher Suites  {}", parsed.cipher_count);
                println!("Extensions     {}", parsed.extension_count);
                println!("ALPN           {}", parsed.alpn);
                Ok(())
            }
            None => not_found(cli.json, "JA4 translation", q),
        },
        Mode::Stats | Mode::Analyze | Mode::Serve => bail!("mode does not take a dataset query"),
    }
}

async fn run_analyze(cli: &Cli) -> Result<()> {
    let Some(path) = cli.path.as_ref() else {
        bail!("--path is required for analyze mode");
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let format = ingest::validate_upload(&name, &bytes)?;
    info!("Accepted {} ({}, {} bytes)", path.display(), format, bytes.len());

    let extractor = Ja4Extractor::new(ExtractorConfig {
        python:  cli.python.clone(),
        script:  cli.ja4_script.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
        ..ExtractorConfig::default()
    });
    let sessions = extractor.analyze(&bytes).await?;

    if cli.json {
        print_json(&sessions)
    } else {
        print!("{}", report::render_streams(&sessions));
        Ok(())
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
            .add_directive("ja4lens=info".parse()?))
        .with_writer(std::io::stderr)
        .compact().init();

    let cli = Cli::parse();

    if let Mode::Analyze = cli.mode {
        return run_analyze(&cli).await;
    }

    let db = match SharedDb::from_path(&cli.db).load() {
        Ok(db) => db,
        Err(e) => {
            error!("Dataset load failed: {}", e);
            return Err(e).with_context(|| format!("loading {}", cli.db.display()));
        }
    };

    match cli.mode {
        Mode::Serve => {
            let listener = TcpListener::bind(&cli.listen)
                .await
                .with_context(|| format!("binding {}", cli.listen))?;
            eprintln!("  \x1b[90mPress Ctrl+C to stop.\x1b[0m");
            Arc::new(QueryServer::new(db)).serve(listener).await
        }
        Mode::Stats => run_stats(&cli, &db),
        _ => run_lookup(&cli, &db),
    }
}
