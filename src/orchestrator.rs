use futures::future::join_all;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::ExtractionError;
use crate::metrics::{BATCH_LATENCY, BATCH_SIZE, EXTRACTIONS_TOTAL, EXTRACTION_FAILURES};
use crate::models::{BatchResult, ExtractedFields, Outcome, WorkItem};

/// Runs one extraction per item concurrently and waits for all of them.
///
/// Every item gets its own task, so an error, a timeout or even a panic in one
/// extraction only fails that item. `result[i]` always belongs to `items[i]`,
/// whatever order the tasks finish in.
pub async fn run_batch<F, Fut>(
    items: Vec<WorkItem>,
    extract: F,
    timeout: Option<Duration>,
) -> BatchResult
where
    F: Fn(WorkItem) -> Fut,
    Fut: Future<Output = Result<ExtractedFields, ExtractionError>> + Send + 'static,
{
    let start_time = Instant::now();
    let total = items.len();
    BATCH_SIZE.observe(total as f64);
    tracing::info!(images = total, ?timeout, "dispatching batch");

    let (labels, handles): (Vec<_>, Vec<_>) = items
        .into_iter()
        .map(|item| {
            let label = (item.index, item.filename.clone());
            let call = extract(item);
            let handle = tokio::spawn(async move {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, call)
                        .await
                        .unwrap_or(Err(ExtractionError::Timeout(limit))),
                    None => call.await,
                }
            });
            (label, handle)
        })
        .unzip();

    // join barrier - nothing returns until every task is terminal
    let finished = join_all(handles).await;

    let outcomes: Vec<Outcome> = labels
        .into_iter()
        .zip(finished)
        .map(|((index, filename), result)| {
            let result = result.unwrap_or_else(|e| Err(ExtractionError::Panicked(e.to_string())));
            match result {
                Ok(fields) => {
                    EXTRACTIONS_TOTAL.inc();
                    Outcome::Extracted(fields)
                }
                Err(e) => {
                    EXTRACTION_FAILURES.inc();
                    tracing::warn!(index, file = %filename, error = %e, "extraction failed");
                    Outcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        })
        .collect();

    let batch = BatchResult(outcomes);
    BATCH_LATENCY.observe(start_time.elapsed().as_secs_f64());
    tracing::info!(
        images = total,
        failed = batch.failed(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "batch complete"
    );
    batch
}
