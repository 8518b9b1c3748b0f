//! The batch coordinator
//!
//! A [`Batch`] accumulates submissions from many independent callers, then
//! combines all of them into a single processor invocation and routes each
//! individual outcome back to the caller that submitted it.
//!
//! The coordinator tracks two counters: the number of slots *reserved*
//! (every `add`/`add_with` call) and the number of submissions actually
//! *enqueued*. [`Batch::run`] suspends until the two are equal, which is
//! what allows a thunk handed to [`Batch::add_with`] to await arbitrary
//! work before enqueuing without the batch firing prematurely.

use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tracing::{debug, trace};

use crate::core::batch::processor::BatchProcessor;
use crate::core::batch::types::BatchOutcome;
use crate::utils::error::{BatchError, Result};

/// Lifecycle of a batch. One batch is single-use: it accumulates, runs
/// once, and settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Accumulating,
    Processing,
    Settled,
}

/// One queued submission: its input and the single-assignment slot its
/// outcome is delivered through.
struct Submission<I, O> {
    input: I,
    slot: oneshot::Sender<Result<O>>,
}

struct BatchState<I, O> {
    queue: Vec<Submission<I, O>>,
    /// Slots reserved by `add`/`add_with` calls
    expected: usize,
    /// Submissions actually enqueued; never exceeds `expected`
    actual: usize,
    phase: Phase,
}

impl<I, O> Default for BatchState<I, O> {
    fn default() -> Self {
        Self {
            queue: Vec::new(),
            expected: 0,
            actual: 0,
            phase: Phase::default(),
        }
    }
}

struct Shared<I, O> {
    state: Mutex<BatchState<I, O>>,
    /// Fired by the enqueue that fills the last outstanding reservation
    ready: Notify,
}

impl<I, O> Shared<I, O> {
    fn reserve(&self) {
        let mut state = self.state.lock();
        state.expected += 1;
    }

    fn enqueue(&self, input: I) -> PendingOutcome<O> {
        let (slot, receiver) = oneshot::channel();

        let mut state = self.state.lock();
        if state.phase == Phase::Accumulating {
            state.queue.push(Submission { input, slot });
            state.actual += 1;
            debug_assert!(state.actual <= state.expected);
            if state.actual == state.expected {
                self.ready.notify_one();
            }
        } else {
            // The batch already ran; settle this slot immediately.
            let _ = slot.send(Err(BatchError::Consumed));
        }

        PendingOutcome { receiver }
    }
}

/// Future resolving to one submission's outcome.
///
/// Exactly one of success or failure is ever delivered. If the batch is
/// dropped without running, this resolves to [`BatchError::Abandoned`].
#[must_use = "a pending outcome does nothing unless awaited"]
pub struct PendingOutcome<O> {
    receiver: oneshot::Receiver<Result<O>>,
}

impl<O> PendingOutcome<O> {
    pub(crate) fn new(receiver: oneshot::Receiver<Result<O>>) -> Self {
        Self { receiver }
    }
}

impl<O> Future for PendingOutcome<O> {
    type Output = Result<O>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(BatchError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Single-use handle for enqueuing a reserved submission.
///
/// Handed to the thunk given to [`Batch::add_with`]. The reservation it
/// stands for is already counted; if the thunk never calls
/// [`Enqueuer::enqueue`], the batch never reaches readiness and `run` waits
/// forever.
pub struct Enqueuer<I, O> {
    shared: Arc<Shared<I, O>>,
}

impl<I, O> Enqueuer<I, O> {
    /// Enqueue the input this reservation was made for, returning the
    /// submission's pending outcome.
    pub fn enqueue(self, input: I) -> PendingOutcome<O> {
        self.shared.enqueue(input)
    }
}

/// Combines many logical operations into one processor invocation.
///
/// A batch is single-use: submissions accumulate until [`Batch::run`] is
/// called and every reservation is filled, the processor runs exactly once
/// over the queued inputs in enqueue order, and each outcome is routed back
/// to its submission. Handles are cheap to clone; all clones share the same
/// queue.
///
/// ```
/// use coalesce_rs::{Batch, BatchOutcome, Result};
///
/// async fn echo(inputs: Vec<i32>) -> Result<Vec<BatchOutcome<i32>>> {
///     Ok(inputs.into_iter().map(BatchOutcome::Output).collect())
/// }
///
/// # tokio_test::block_on(async {
/// let batch: Batch<i32, i32> = Batch::new(echo);
/// let first = batch.add(1);
/// let second = batch.add(2);
/// assert!(batch.run().await.unwrap());
/// assert_eq!(first.await.unwrap(), 1);
/// assert_eq!(second.await.unwrap(), 2);
/// # });
/// ```
pub struct Batch<I, O> {
    shared: Arc<Shared<I, O>>,
    processor: Arc<dyn BatchProcessor<I, O>>,
}

impl<I, O> Clone for Batch<I, O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            processor: Arc::clone(&self.processor),
        }
    }
}

impl<I, O> Batch<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Create a batch driven by the given processor.
    pub fn new<P>(processor: P) -> Self
    where
        P: BatchProcessor<I, O> + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BatchState::default()),
                ready: Notify::new(),
            }),
            processor: Arc::new(processor),
        }
    }

    /// Add an input to the batch.
    ///
    /// Reserves a slot and enqueues the submission immediately. The
    /// returned future resolves or rejects once the batch has run. Adding
    /// to a batch that already ran settles the slot with
    /// [`BatchError::Consumed`].
    pub fn add(&self, input: I) -> PendingOutcome<O> {
        self.shared.reserve();
        self.shared.enqueue(input)
    }

    /// Reserve a slot now, enqueue later.
    ///
    /// The slot is reserved when this method is called, so [`Batch::run`]
    /// will wait for it even though the enqueue happens inside the thunk,
    /// possibly after the thunk has awaited other work. The returned future
    /// yields whatever the thunk returns, which is typically the
    /// [`PendingOutcome`] produced by [`Enqueuer::enqueue`] but may be the
    /// result of further chained work.
    ///
    /// ```
    /// use coalesce_rs::{Batch, BatchOutcome, Result};
    ///
    /// async fn echo(inputs: Vec<i32>) -> Result<Vec<BatchOutcome<i32>>> {
    ///     Ok(inputs.into_iter().map(BatchOutcome::Output).collect())
    /// }
    ///
    /// # tokio_test::block_on(async {
    /// let batch: Batch<i32, i32> = Batch::new(echo);
    /// let pending = batch.add_with(|enqueuer| async move {
    ///     // Look something up first, then enqueue.
    ///     enqueuer.enqueue(7)
    /// });
    /// let (pending, ran) = tokio::join!(pending, batch.run());
    /// assert!(ran.unwrap());
    /// assert_eq!(pending.await.unwrap(), 7);
    /// # });
    /// ```
    pub fn add_with<F, Fut>(&self, thunk: F) -> Fut
    where
        F: FnOnce(Enqueuer<I, O>) -> Fut,
        Fut: Future,
    {
        self.shared.reserve();
        thunk(Enqueuer {
            shared: Arc::clone(&self.shared),
        })
    }

    /// Run the batch.
    ///
    /// Suspends until every reserved slot has been filled (immediately if
    /// none are outstanding; a batch with zero submissions is valid and
    /// ready at once), invokes the processor exactly once with the queued
    /// inputs in enqueue order, and settles every submission's outcome.
    ///
    /// Returns `Ok(true)` if every submission resolved, `Ok(false)` if the
    /// processor ran but tagged at least one submission as failed. A
    /// processor failure or a result/queue length mismatch rejects every
    /// pending submission with the same error and returns that error here.
    pub async fn run(self) -> Result<bool> {
        loop {
            let ready = self.shared.ready.notified();
            {
                let state = self.shared.state.lock();
                if state.actual == state.expected {
                    break;
                }
                trace!(
                    expected = state.expected,
                    actual = state.actual,
                    "waiting for outstanding reservations"
                );
            }
            ready.await;
        }

        let (inputs, slots): (Vec<I>, Vec<oneshot::Sender<Result<O>>>) = {
            let mut state = self.shared.state.lock();
            if state.phase != Phase::Accumulating {
                return Err(BatchError::Consumed);
            }
            state.phase = Phase::Processing;
            mem::take(&mut state.queue)
                .into_iter()
                .map(|submission| (submission.input, submission.slot))
                .unzip()
        };

        debug!(submissions = inputs.len(), "dispatching batch to processor");

        let outcomes = match self.processor.process(inputs).await {
            Ok(outcomes) => outcomes,
            Err(error) => {
                self.settle();
                for slot in slots {
                    let _ = slot.send(Err(error.clone()));
                }
                return Err(error);
            }
        };

        if outcomes.len() != slots.len() {
            let error = BatchError::LengthMismatch {
                expected: slots.len(),
                actual: outcomes.len(),
            };
            self.settle();
            for slot in slots {
                let _ = slot.send(Err(error.clone()));
            }
            return Err(error);
        }

        let mut is_success = true;
        for (outcome, slot) in outcomes.into_iter().zip(slots) {
            match outcome {
                BatchOutcome::Output(output) => {
                    let _ = slot.send(Ok(output));
                }
                BatchOutcome::Error(error) => {
                    is_success = false;
                    let _ = slot.send(Err(error));
                }
            }
        }
        self.settle();

        debug!(is_success, "batch settled");
        Ok(is_success)
    }

    fn settle(&self) {
        self.shared.state.lock().phase = Phase::Settled;
    }
}
