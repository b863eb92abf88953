//! Bounded-concurrency batch probing.

use std::path::PathBuf;
use std::sync::Arc;

use rp_core::{display_name, is_supported_format, Error, MediaMetadata};
use rp_probe::Prober;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Outcome of [`probe_batch`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Successful records, in input order.
    pub files: Vec<MediaMetadata>,
    /// `"<file name>: <error>"` for every failed file, in input order.
    pub errors: Vec<String>,
}

/// Probe every path with at most `concurrency` parses in flight.
///
/// Each probe runs on the blocking pool. Paths without a supported video
/// extension are reported as errors and never probed. A failure is recorded
/// and never stops the rest of the batch.
pub async fn probe_batch(
    prober: Arc<dyn Prober>,
    paths: Vec<PathBuf>,
    concurrency: usize,
) -> BatchReport {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let total = paths.len();

    let mut names = Vec::with_capacity(total);
    let mut handles = Vec::with_capacity(total);

    for path in paths {
        let sem = semaphore.clone();
        let prober = prober.clone();
        names.push(display_name(&path));

        if !is_supported_format(&path) {
            warn!(path = %path.display(), "skipping unsupported format");
            let err = Error::Validation(match path.extension() {
                Some(ext) => format!("unsupported format: .{}", ext.to_string_lossy()),
                None => "unsupported format: no extension".to_string(),
            });
            handles.push(tokio::spawn(async move { Err(err) }));
            continue;
        }

        handles.push(tokio::spawn(async move {
            let _permit = sem
                .acquire_owned()
                .await
                .map_err(|e| Error::Probe(format!("probe queue closed: {e}")))?;

            debug!(path = %path.display(), "probing");
            tokio::task::spawn_blocking(move || prober.probe(&path))
                .await
                .map_err(|e| Error::Probe(format!("probe task failed: {e}")))?
        }));
    }

    let mut report = BatchReport::default();
    for (name, outcome) in names.into_iter().zip(futures::future::join_all(handles).await) {
        match outcome {
            Ok(Ok(meta)) => report.files.push(meta),
            Ok(Err(e)) => report.errors.push(format!("{name}: {e}")),
            Err(e) => report.errors.push(format!("{name}: probe task failed: {e}")),
        }
    }

    info!(
        total,
        probed = report.files.len(),
        failed = report.errors.len(),
        "batch probe complete"
    );
    report
}
