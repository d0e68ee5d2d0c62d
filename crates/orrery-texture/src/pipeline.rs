//! Asynchronous matting pipeline: offloads decode-adjacent pixel work to a
//! worker pool so the render thread never blocks on matting cost.
//!
//! The render thread submits owned image snapshots and drains finished
//! results once per frame. A result is published into the caller's cache in a
//! single step, so no reader ever observes a partially matted buffer; until
//! then the body renders with a placeholder. Each key is matted at most once:
//! duplicate submissions for an in-flight key are rejected here, and the
//! caller's cache check covers already-published keys.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use tracing::debug;

use crate::image_data::RgbaImage;
use crate::matte::{MattedImage, MattingParams, matte};

/// A self-contained matting task: an owned pixel snapshot, no shared state.
pub struct MattingTask {
    /// Texture cache key the result publishes under.
    pub key: String,
    /// Decoded source image.
    pub image: RgbaImage,
}

/// A completed matting task.
pub struct MattingResult {
    pub key: String,
    pub matted: MattedImage,
}

/// Worker pool running [`matte`] off the render thread.
pub struct MattingPipeline {
    task_sender: Option<crossbeam_channel::Sender<MattingTask>>,
    result_receiver: crossbeam_channel::Receiver<MattingResult>,
    worker_handles: Vec<JoinHandle<()>>,
    budget: usize,
    in_flight: Arc<AtomicUsize>,
    /// Keys submitted but not yet drained. Render-thread-only bookkeeping.
    pending: HashSet<String>,
}

impl MattingPipeline {
    /// Spawn `worker_count` matting workers sharing fixed `params`.
    ///
    /// `budget` bounds in-flight tasks, which bounds the memory held by
    /// image snapshots waiting in the channel.
    pub fn new(worker_count: usize, budget: usize, params: MattingParams) -> Self {
        let (task_tx, task_rx) = crossbeam_channel::bounded::<MattingTask>(budget);
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let rx = task_rx.clone();
            let tx = result_tx.clone();
            let flight = Arc::clone(&in_flight);

            handles.push(std::thread::spawn(move || {
                while let Ok(task) = rx.recv() {
                    let matted = matte(&task.image, &params);
                    // A send error means the pipeline was dropped mid-flight;
                    // the late result is simply abandoned.
                    let _ = tx.send(MattingResult {
                        key: task.key,
                        matted,
                    });
                    flight.fetch_sub(1, Ordering::Relaxed);
                }
            }));
        }

        Self {
            task_sender: Some(task_tx),
            result_receiver: result_rx,
            worker_handles: handles,
            budget,
            in_flight,
            pending: HashSet::new(),
        }
    }

    /// Submit a matting task. Returns `false` if the key is already in
    /// flight, the budget is exhausted, or the pipeline has shut down.
    pub fn submit(&mut self, key: &str, image: RgbaImage) -> bool {
        let sender = match &self.task_sender {
            Some(s) => s,
            None => return false,
        };
        if self.pending.contains(key) {
            debug!("matting already in flight for '{key}', skipping resubmit");
            return false;
        }
        if self.in_flight.load(Ordering::Relaxed) >= self.budget {
            return false;
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let task = MattingTask {
            key: key.to_string(),
            image,
        };
        if sender.send(task).is_err() {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        self.pending.insert(key.to_string());
        true
    }

    /// Drain all completed results. Called once per frame on the render
    /// thread; the caller publishes each result into its cache whole.
    pub fn drain_results(&mut self) -> Vec<MattingResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_receiver.try_recv() {
            self.pending.remove(&result.key);
            results.push(result);
        }
        results
    }

    /// Whether a key is submitted but not yet drained.
    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains(key)
    }

    /// Number of tasks queued or being processed by workers.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Shut down the workers. In-flight work may finish or be abandoned;
    /// its results are never queried again.
    pub fn shutdown(&mut self) {
        // Dropping the sender closes the channel and ends the worker loops.
        self.task_sender.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for MattingPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matte::MatteOutcome;

    fn uniform_background_image() -> RgbaImage {
        let mut img = RgbaImage::solid(16, 16, [4, 4, 8, 255]);
        for y in 5..11 {
            for x in 5..11 {
                img.set_pixel(x, y, [220, 180, 60, 255]);
            }
        }
        img
    }

    fn wait_for_results(pipeline: &mut MattingPipeline, count: usize) -> Vec<MattingResult> {
        let mut received = Vec::new();
        let start = std::time::Instant::now();
        while received.len() < count {
            received.extend(pipeline.drain_results());
            assert!(
                start.elapsed().as_secs() < 5,
                "timed out waiting for matting results"
            );
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        received
    }

    /// A submitted task produces a matted result under the same key.
    #[test]
    fn test_submitted_task_produces_matted_result() {
        let mut pipeline = MattingPipeline::new(2, 8, MattingParams::default());
        assert!(pipeline.submit("earth", uniform_background_image()));

        let results = wait_for_results(&mut pipeline, 1);
        assert_eq!(results[0].key, "earth");
        assert_eq!(results[0].matted.outcome, MatteOutcome::Matted);
        assert_eq!(results[0].matted.image.pixel(0, 0)[3], 0);
    }

    /// Duplicate submissions for an in-flight key are rejected, so matting
    /// runs exactly once per key no matter how many callers race to it.
    #[test]
    fn test_duplicate_submission_rejected_while_pending() {
        let mut pipeline = MattingPipeline::new(1, 8, MattingParams::default());
        assert!(pipeline.submit("mars", uniform_background_image()));
        for _ in 0..4 {
            assert!(!pipeline.submit("mars", uniform_background_image()));
        }

        let results = wait_for_results(&mut pipeline, 1);
        assert_eq!(results.len(), 1);

        // Drained: key is free again (the caller's cache check is what
        // prevents re-matting a published key).
        assert!(!pipeline.is_pending("mars"));
    }

    /// Results for all distinct submitted keys arrive, none lost or mixed up.
    #[test]
    fn test_all_keys_arrive() {
        let mut pipeline = MattingPipeline::new(4, 16, MattingParams::default());
        let keys = ["sun", "mercury", "venus", "earth", "mars"];
        for key in keys {
            assert!(pipeline.submit(key, uniform_background_image()));
        }

        let results = wait_for_results(&mut pipeline, keys.len());
        let mut got: Vec<String> = results.into_iter().map(|r| r.key).collect();
        got.sort();
        let mut expected: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        expected.sort();
        assert_eq!(got, expected);
    }

    /// The budget bounds how many snapshots can be queued at once.
    #[test]
    fn test_budget_limits_in_flight_tasks() {
        let mut pipeline = MattingPipeline::new(1, 2, MattingParams::default());
        let mut accepted = 0;
        for i in 0..20 {
            if pipeline.submit(&format!("body-{i}"), uniform_background_image()) {
                accepted += 1;
            }
        }
        assert!(
            accepted <= 4,
            "budget should bound submissions, got {accepted}"
        );
    }

    /// Shutdown joins workers; submissions afterwards are rejected.
    #[test]
    fn test_shutdown_rejects_further_work() {
        let mut pipeline = MattingPipeline::new(2, 8, MattingParams::default());
        pipeline.shutdown();
        assert!(!pipeline.submit("late", uniform_background_image()));
    }
}
