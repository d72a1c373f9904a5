// ja4lens/src/ingest/extractor.rs
//
// Out-of-process JA4+ extraction.
//
// The upstream ja4 tool reads a capture file and writes one JSON object per
// session. We run it exactly once per upload:
//
//   <python> <script> <work_dir>/<uuid>.pcap -J -f <work_dir>/<uuid>.json
//
// Bounds (enforced here, never inside the engine):
//   - wall-clock timeout, child killed when it fires
//   - stdout / stderr each capped; overflowing either fails the run
// Temp files are removed on every exit path. A failed run reports the tool's
// stderr (or the exit status) and is not retried.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::IngestError;
use crate::ingest::validate_magic;

pub const DEFAULT_SCRIPT:     &str = "../ja4-github-repo/python/ja4.py";
pub const DEFAULT_TIMEOUT:    Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_OUTPUT: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub python:     String,
    pub script:     PathBuf,
    pub timeout:    Duration,
    pub max_output: usize,
    pub work_dir:   PathBuf,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            python:     "python3".into(),
            script:     PathBuf::from(DEFAULT_SCRIPT),
            timeout:    DEFAULT_TIMEOUT,
            max_output: DEFAULT_MAX_OUTPUT,
            work_dir:   std::env::temp_dir(),
        }
    }
}

// ── Temp files ────────────────────────────────────────────────────────────────

struct ScratchFiles {
    capture: PathBuf,
    output:  PathBuf,
}

impl ScratchFiles {
    fn new(dir: &Path) -> Self {
        let id = Uuid::new_v4();
        Self {
            capture: dir.join(format!("{id}.pcap")),
            output:  dir.join(format!("{id}.json")),
        }
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.capture);
        let _ = std::fs::remove_file(&self.output);
    }
}

// ── Extractor ─────────────────────────────────────────────────────────────────

pub struct Ja4Extractor {
    cfg: ExtractorConfig,
}

impl Ja4Extractor {
    pub fn new(cfg: ExtractorConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.cfg
    }

    /// Run the tool over `capture` and return its per-session records.
    pub async fn analyze(&self, capture: &[u8]) -> Result<Vec<Value>, IngestError> {
        let format = validate_magic(capture)?;
        info!("Analyzing {} capture: {} bytes", format, capture.len());

        let files = ScratchFiles::new(&self.cfg.work_dir);
        tokio::fs::write(&files.capture, capture).await?;

        let mut child = Command::new(&self.cfg.python)
            .arg(&self.cfg.script)
            .arg(&files.capture)
            .arg("-J")
            .arg("-f")
            .arg(&files.output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(IngestError::Spawn)?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let cap    = self.cfg.max_output;

        let run = async {
            let (_out, err) = tokio::try_join!(read_capped(stdout, cap), read_capped(stderr, cap))?;
            let status = child.wait().await?;
            Ok::<_, IngestError>((status, err))
        };

        let outcome = tokio::time::timeout(self.cfg.timeout, run).await;
        let (status, stderr) = match outcome {
            Ok(res) => res?,
            Err(_) => {
                let _ = child.start_kill();
                warn!("Extraction tool timed out after {:?}", self.cfg.timeout);
                return Err(IngestError::Timeout(self.cfg.timeout));
            }
        };

        if !status.success() {
            let diag = String::from_utf8_lossy(&stderr).trim().to_string();
            return Err(IngestError::ToolFailed(if diag.is_empty() {
                format!("extraction tool exited with {status}")
            } else {
                diag
            }));
        }

        let json = tokio::fs::read_to_string(&files.output).await?;
        let sessions = match serde_json::from_str::<Value>(&json)? {
            Value::Array(items) => items,
            single => vec![single],
        };
        debug!("Extraction produced {} session records", sessions.len());
        Ok(sessions)
    }
}

async fn read_capped<R>(src: Option<R>, cap: usize) -> Result<Vec<u8>, IngestError>
where
    R: AsyncRead + Unpin,
{
    let Some(src) = src else { return Ok(Vec::new()) };
    let mut buf = Vec::new();
    src.take(cap as u64 + 1).read_to_end(&mut buf).await?;
    if buf.len() > cap {
        return Err(IngestError::OutputTooLarge(cap));
    }
    Ok(buf)
}
