//! Tests for request batching

#[cfg(test)]
mod tests {
    use crate::core::batch::{Batch, BatchOutcome, SizedBatch};
    use crate::utils::error::{BatchError, Result};
    use serde_json::json;

    async fn echo(inputs: Vec<i32>) -> Result<Vec<BatchOutcome<i32>>> {
        Ok(inputs.into_iter().map(BatchOutcome::Output).collect())
    }

    async fn reject_evens(inputs: Vec<i32>) -> Result<Vec<BatchOutcome<i32>>> {
        Ok(inputs
            .into_iter()
            .map(|n| {
                if n % 2 == 0 {
                    BatchOutcome::Error(BatchError::Submission(json!(n)))
                } else {
                    BatchOutcome::Output(n)
                }
            })
            .collect())
    }

    async fn explode(_inputs: Vec<i32>) -> Result<Vec<BatchOutcome<i32>>> {
        Err(BatchError::Processor("Jikes!".to_string()))
    }

    async fn short_changed(_inputs: Vec<i32>) -> Result<Vec<BatchOutcome<i32>>> {
        Ok(vec![BatchOutcome::Output(1)])
    }

    // Batch coordinator tests

    #[tokio::test]
    async fn running_an_empty_batch() {
        let batch: Batch<i32, i32> = Batch::new(echo);
        assert!(batch.run().await.unwrap());
    }

    #[tokio::test]
    async fn running_resolves_outcomes_positionally() {
        let batch: Batch<i32, i32> = Batch::new(echo);
        let first = batch.add(1);
        let second = batch.add(2);

        assert!(batch.run().await.unwrap());
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(second.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn running_waits_for_all_thunks_to_enqueue() {
        async fn expecting_one_two(inputs: Vec<i32>) -> Result<Vec<BatchOutcome<i32>>> {
            // Both thunk submissions must be queued before the processor fires.
            assert_eq!(inputs, vec![1, 2]);
            Ok(inputs.into_iter().map(BatchOutcome::Output).collect())
        }

        let batch: Batch<i32, i32> = Batch::new(expecting_one_two);

        // Both reservations are made synchronously; neither is enqueued yet.
        let first = batch.add_with(|enqueuer| async move {
            tokio::task::yield_now().await; // Simulates a delay.
            enqueuer.enqueue(1)
        });
        let second = batch.add_with(|enqueuer| async move {
            tokio::task::yield_now().await; // Simulates a delay.
            enqueuer.enqueue(2)
        });

        let (first, second, is_success) = tokio::join!(first, second, batch.clone().run());
        assert!(is_success.unwrap());
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(second.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn running_rejects_tagged_failures_only() {
        let batch: Batch<i32, i32> = Batch::new(reject_evens);
        let first = batch.add(1);
        let second = batch.add(2);
        let third = batch.add(3);

        assert!(!batch.run().await.unwrap());
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(second.await.unwrap_err(), BatchError::Submission(json!(2)));
        assert_eq!(third.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn running_rejects_everything_when_processor_fails() {
        let batch: Batch<i32, i32> = Batch::new(explode);
        let first = batch.add(1);
        let second = batch.add(2);

        let expected = BatchError::Processor("Jikes!".to_string());
        assert_eq!(batch.run().await.unwrap_err(), expected);
        assert_eq!(first.await.unwrap_err(), expected);
        assert_eq!(second.await.unwrap_err(), expected);
    }

    #[tokio::test]
    async fn running_rejects_everything_on_length_mismatch() {
        let batch: Batch<i32, i32> = Batch::new(short_changed);
        let first = batch.add(1);
        let second = batch.add(2);

        let expected = BatchError::LengthMismatch {
            expected: 2,
            actual: 1,
        };
        assert_eq!(batch.run().await.unwrap_err(), expected);
        assert_eq!(first.await.unwrap_err(), expected);
        assert_eq!(second.await.unwrap_err(), expected);
    }

    #[tokio::test]
    async fn adding_after_run_settles_with_consumed() {
        let batch: Batch<i32, i32> = Batch::new(echo);
        let stale = batch.clone();

        assert!(batch.run().await.unwrap());

        let late = stale.add(3);
        assert_eq!(late.await.unwrap_err(), BatchError::Consumed);
    }

    #[tokio::test]
    async fn running_twice_is_an_error() {
        let batch: Batch<i32, i32> = Batch::new(echo);
        let again = batch.clone();

        assert!(batch.run().await.unwrap());
        assert_eq!(again.run().await.unwrap_err(), BatchError::Consumed);
    }

    #[tokio::test]
    async fn dropping_the_batch_abandons_submissions() {
        let batch: Batch<i32, i32> = Batch::new(echo);
        let pending = batch.add(1);

        drop(batch);
        assert_eq!(pending.await.unwrap_err(), BatchError::Abandoned);
    }

    // Loosely-tagged response triage

    #[test]
    fn from_response_picks_tagged_output() {
        let outcome = BatchOutcome::from_response(json!({ "output": { "id": 7 } }));
        assert_eq!(outcome, BatchOutcome::Output(json!({ "id": 7 })));
    }

    #[test]
    fn from_response_picks_tagged_error() {
        let outcome = BatchOutcome::from_response(json!({ "error": "nope" }));
        assert_eq!(
            outcome,
            BatchOutcome::Error(BatchError::Submission(json!("nope")))
        );
    }

    #[test]
    fn from_response_falls_back_to_raw_values() {
        // Processors may return plain values instead of tagged records.
        let outcome = BatchOutcome::from_response(json!(42));
        assert_eq!(outcome, BatchOutcome::Output(json!(42)));

        let outcome = BatchOutcome::from_response(json!({ "title": "Dune" }));
        assert_eq!(outcome, BatchOutcome::Output(json!({ "title": "Dune" })));
    }

    #[test]
    fn from_response_ignores_null_tags() {
        let outcome = BatchOutcome::from_response(json!({ "output": null, "error": null }));
        assert_eq!(
            outcome,
            BatchOutcome::Output(json!({ "output": null, "error": null }))
        );
    }

    // Sized batch tests

    #[tokio::test]
    async fn sized_batch_tracks_length() {
        let batch: SizedBatch<i32, i32> = SizedBatch::new(echo);
        assert!(batch.is_empty());

        let _first = batch.add(1);
        let _second = batch.add(2);
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn sized_batch_wakes_length_watchers() {
        let batch: SizedBatch<i32, i32> = SizedBatch::new(echo);

        let watcher = {
            let batch = batch.clone();
            tokio::spawn(async move { batch.wait_for_len(2).await })
        };

        let first = batch.add(1);
        let second = batch.add(2);
        watcher.await.unwrap();

        let report = batch.process().await.unwrap();
        assert!(!report.has_errors);
        assert_eq!(report.outputs, vec![Some(1), Some(2)]);
        assert_eq!(report.errors, vec![None, None]);
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(second.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn sized_batch_wait_resolves_when_size_already_reached() {
        let batch: SizedBatch<i32, i32> = SizedBatch::new(echo);
        let _first = batch.add(1);
        let _second = batch.add(2);

        // Subscribing only after the queue filled up must still resolve.
        tokio::time::timeout(std::time::Duration::from_secs(1), batch.wait_for_len(2))
            .await
            .expect("queue already holds two submissions");
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn sized_batch_reports_errors_positionally() {
        let batch: SizedBatch<i32, i32> = SizedBatch::new(reject_evens);
        let first = batch.add(1);
        let second = batch.add(2);

        let report = batch.process().await.unwrap();
        assert!(report.has_errors);
        assert_eq!(report.outputs, vec![Some(1), None]);
        assert_eq!(
            report.errors,
            vec![None, Some(BatchError::Submission(json!(2)))]
        );
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(second.await.unwrap_err(), BatchError::Submission(json!(2)));
    }

    #[tokio::test]
    async fn sized_batch_length_mismatch_abandons_submissions() {
        let batch: SizedBatch<i32, i32> = SizedBatch::new(short_changed);
        let first = batch.add(1);
        let second = batch.add(2);

        let error = batch.process().await.unwrap_err();
        assert_eq!(
            error,
            BatchError::LengthMismatch {
                expected: 2,
                actual: 1,
            }
        );
        assert_eq!(first.await.unwrap_err(), BatchError::Abandoned);
        assert_eq!(second.await.unwrap_err(), BatchError::Abandoned);
    }
}
