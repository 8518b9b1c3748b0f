//! Size-observed batching
//!
//! [`SizedBatch`] is a simpler coordinator variant: instead of reservation
//! accounting, callers observe the queue length directly and decide when to
//! process. Useful when one orchestrator knows exactly how many submissions
//! to expect and wants a full report of outputs and errors back, in
//! addition to the per-submission outcome futures.

use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tracing::debug;

use crate::core::batch::coordinator::PendingOutcome;
use crate::core::batch::processor::BatchProcessor;
use crate::core::batch::types::BatchOutcome;
use crate::utils::error::{BatchError, Result};

struct SizedSubmission<I, O> {
    input: I,
    slot: oneshot::Sender<Result<O>>,
}

struct SizedShared<I, O> {
    queue: Mutex<Vec<SizedSubmission<I, O>>>,
    /// Broadcasts the queue length after every enqueue
    len_tx: watch::Sender<usize>,
}

/// Positional report of a processed batch.
///
/// `outputs[i]` is `Some` exactly when submission `i` succeeded, and
/// `errors[i]` is `Some` exactly when it failed.
#[derive(Debug, Clone)]
pub struct ProcessReport<O> {
    /// True if at least one submission was tagged as failed
    pub has_errors: bool,
    /// Success payloads by queue position
    pub outputs: Vec<Option<O>>,
    /// Error payloads by queue position
    pub errors: Vec<Option<BatchError>>,
}

/// A batch whose readiness is observed by queue length.
///
/// Handles are cheap to clone and share one queue. [`SizedBatch::process`]
/// consumes the handle; a batch is processed at most once.
pub struct SizedBatch<I, O> {
    shared: Arc<SizedShared<I, O>>,
    processor: Arc<dyn BatchProcessor<I, O>>,
}

impl<I, O> Clone for SizedBatch<I, O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            processor: Arc::clone(&self.processor),
        }
    }
}

impl<I, O> SizedBatch<I, O>
where
    I: Send + 'static,
    O: Send + Clone + 'static,
{
    /// Create a batch driven by the given processor.
    pub fn new<P>(processor: P) -> Self
    where
        P: BatchProcessor<I, O> + 'static,
    {
        let (len_tx, _) = watch::channel(0);
        Self {
            shared: Arc::new(SizedShared {
                queue: Mutex::new(Vec::new()),
                len_tx,
            }),
            processor: Arc::new(processor),
        }
    }

    /// Add an input to the batch, waking any length watchers.
    pub fn add(&self, input: I) -> PendingOutcome<O> {
        let (slot, receiver) = oneshot::channel();

        let mut queue = self.shared.queue.lock();
        queue.push(SizedSubmission { input, slot });
        // send_modify stores the new length even while nobody is
        // subscribed, so a watcher arriving later still sees it. Publishing
        // under the queue lock keeps parallel adds in order.
        self.shared.len_tx.send_modify(|len| *len = queue.len());
        drop(queue);

        PendingOutcome::new(receiver)
    }

    /// Number of submissions currently queued.
    pub fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// True if nothing has been queued yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Suspend until the queue holds exactly `len` submissions.
    ///
    /// Resolves immediately if the queue is already that size.
    pub async fn wait_for_len(&self, len: usize) {
        let mut len_rx = self.shared.len_tx.subscribe();
        // wait_for checks the current value before suspending
        let _ = len_rx.wait_for(|&current| current == len).await;
    }

    /// Process the queue, settling every submission and returning a
    /// positional report of outputs and errors.
    ///
    /// A processor failure or a result/queue length mismatch is returned as
    /// an error; the queued submissions are dropped unsettled in that case
    /// and their outcome futures resolve to [`BatchError::Abandoned`].
    pub async fn process(self) -> Result<ProcessReport<O>> {
        let (inputs, slots): (Vec<I>, Vec<oneshot::Sender<Result<O>>>) = {
            let mut queue = self.shared.queue.lock();
            mem::take(&mut *queue)
                .into_iter()
                .map(|submission| (submission.input, submission.slot))
                .unzip()
        };

        debug!(submissions = inputs.len(), "processing sized batch");

        let outcomes = self.processor.process(inputs).await?;

        if outcomes.len() != slots.len() {
            return Err(BatchError::LengthMismatch {
                expected: slots.len(),
                actual: outcomes.len(),
            });
        }

        let mut report = ProcessReport {
            has_errors: false,
            outputs: Vec::with_capacity(outcomes.len()),
            errors: Vec::with_capacity(outcomes.len()),
        };

        for (outcome, slot) in outcomes.into_iter().zip(slots) {
            match outcome {
                BatchOutcome::Output(output) => {
                    let _ = slot.send(Ok(output.clone()));
                    report.outputs.push(Some(output));
                    report.errors.push(None);
                }
                BatchOutcome::Error(error) => {
                    report.has_errors = true;
                    let _ = slot.send(Err(error.clone()));
                    report.outputs.push(None);
                    report.errors.push(Some(error));
                }
            }
        }

        Ok(report)
    }
}
