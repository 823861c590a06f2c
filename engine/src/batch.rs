//! Line-oriented batch processing. Each physical line of the job source is
//! parsed, resolved, dispatched, and recorded before the next one is read.
//! A bad line never aborts the batch; it is recorded and the loop moves on.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use color_eyre::Result;
use log::debug;

use crate::backend::ImageBackend;
use crate::request::{GenerationRequest, JobSpec, RequestDefaults, ensure_parent};

/// Outcome of one physical line, numbered 1-based so diagnostics map back
/// to the literal file. Blank lines produce no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRecord {
    Saved { line: usize, path: PathBuf },
    Failed { line: usize, reason: String },
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub success: usize,
    pub failed: usize,
    pub records: Vec<LineRecord>,
}

/// Runs every job in `source` sequentially. `report` receives each record
/// as soon as it is produced, so callers can stream progress output.
///
/// Only a read error on the source itself aborts the run; per-line errors
/// (bad JSON, missing prompt, dispatch failures) are recorded and skipped.
pub async fn run_batch<R, F>(
    source: R,
    defaults: &RequestDefaults,
    backend: &dyn ImageBackend,
    mut report: F,
) -> Result<BatchSummary>
where
    R: BufRead,
    F: FnMut(&LineRecord),
{
    let mut summary = BatchSummary::default();

    for (index, raw_line) in source.lines().enumerate() {
        let line_number = index + 1;
        let raw_line = raw_line?;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let record = process_line(line_number, line, defaults, backend).await;
        match &record {
            LineRecord::Saved { .. } => summary.success += 1,
            LineRecord::Failed { .. } => summary.failed += 1,
        }
        report(&record);
        summary.records.push(record);
    }

    Ok(summary)
}

async fn process_line(
    line_number: usize,
    line: &str,
    defaults: &RequestDefaults,
    backend: &dyn ImageBackend,
) -> LineRecord {
    let job: JobSpec = match serde_json::from_str(line) {
        Ok(job) => job,
        Err(err) => {
            return LineRecord::Failed {
                line: line_number,
                reason: format!("invalid JSON: {err}"),
            };
        }
    };

    let request = match job.resolve_request(defaults) {
        Ok(request) => request,
        Err(err) => {
            return LineRecord::Failed {
                line: line_number,
                reason: err.to_string(),
            };
        }
    };
    let out_path = job.resolve_output(defaults);

    match dispatch(&request, &out_path, backend).await {
        Ok(()) => LineRecord::Saved {
            line: line_number,
            path: out_path,
        },
        Err(err) => LineRecord::Failed {
            line: line_number,
            reason: format!("failed: {err}"),
        },
    }
}

/// Sends a resolved request to the backend and writes the returned bytes
/// to `out_path`, creating parent directories as needed.
pub async fn dispatch(
    request: &GenerationRequest,
    out_path: &Path,
    backend: &dyn ImageBackend,
) -> Result<()> {
    debug!("Dispatching prompt {:?} -> {}", request.prompt, out_path.display());
    let bytes = backend.generate(request).await?;
    ensure_parent(out_path)?;
    std::fs::write(out_path, &bytes)?;
    Ok(())
}
