//! Concurrent batch upload orchestration.
//!
//! The orchestrator owns candidate payloads and a shared `BatchState`, drives
//! the transport fan-out, and feeds every outcome through the pure `reduce`
//! transition. All per-file requests in a batch run concurrently and are
//! joined without short-circuiting: one failure never aborts its siblings.

use crate::batch::{
    reduce, BatchEvent, BatchState, CandidateMeta, PROGRESS_CAP_IN_FLIGHT, PROGRESS_DISPATCHED,
};
use crate::transport::UploadTransport;
use futures::future::join_all;
use pixbin_core::ImageFormat;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PROGRESS_TICK_INTERVAL: Duration = Duration::from_millis(250);
const PROGRESS_TICK_STEP: i8 = 15;

/// A file selected for upload, not yet validated or sent.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Candidate {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Read a candidate from disk, inferring the content type from the
    /// file extension.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        let content_type = content_type_for(&file_name)
            .ok_or_else(|| anyhow::anyhow!("Unrecognized image extension: {}", file_name))?;

        Ok(Self {
            file_name,
            content_type: content_type.to_string(),
            data,
        })
    }

    fn meta(&self) -> CandidateMeta {
        CandidateMeta {
            file_name: self.file_name.clone(),
            size_bytes: self.data.len() as u64,
        }
    }
}

fn content_type_for(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit('.').next()?.to_ascii_lowercase();
    let format = match extension.as_str() {
        "jpg" | "jpeg" => ImageFormat::Jpeg,
        "png" => ImageFormat::Png,
        "gif" => ImageFormat::Gif,
        "webp" => ImageFormat::WebP,
        "svg" => ImageFormat::Svg,
        _ => return None,
    };
    Some(format.mime_type())
}

/// Drives batches of concurrent uploads against an `UploadTransport`.
///
/// Cheap to clone; clones share batch state, so a new submission from any
/// handle invalidates a prior batch's in-flight results.
pub struct UploadOrchestrator<T> {
    transport: Arc<T>,
    state: Arc<Mutex<BatchState>>,
    candidates: Arc<Mutex<Vec<Candidate>>>,
}

impl<T> Clone for UploadOrchestrator<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            state: self.state.clone(),
            candidates: self.candidates.clone(),
        }
    }
}

impl<T: UploadTransport> UploadOrchestrator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            state: Arc::new(Mutex::new(BatchState::default())),
            candidates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of the current batch state.
    pub fn state(&self) -> BatchState {
        self.state.lock().unwrap().clone()
    }

    fn apply(&self, event: BatchEvent) {
        let mut state = self.state.lock().unwrap();
        let next = reduce(std::mem::take(&mut *state), event);
        *state = next;
    }

    /// Submit a new batch. Replaces any previous batch; results still in
    /// flight from the old batch are discarded when they arrive.
    ///
    /// Returns the settled batch state.
    pub async fn upload_batch(&self, candidates: Vec<Candidate>) -> BatchState {
        // Generation bump, submission, and the payload swap happen under one
        // lock hold: two racing submissions must never observe the same
        // generation, or the loser's in-flight events would pass the stale
        // checks and corrupt the winner's file entries.
        let (generation, indices) = {
            let mut state = self.state.lock().unwrap();
            let generation = state.generation + 1;
            let next = reduce(
                std::mem::take(&mut *state),
                BatchEvent::BatchSubmitted {
                    generation,
                    candidates: candidates.iter().map(Candidate::meta).collect(),
                },
            );
            *state = next;
            *self.candidates.lock().unwrap() = candidates;
            (generation, state.pending_indices())
        };

        self.dispatch(generation, indices).await;

        self.apply(BatchEvent::AllSettled { generation });
        self.state()
    }

    /// Re-dispatch exactly the files that failed in the current batch.
    /// Skipped duplicates and successes are left untouched.
    pub async fn retry_failed(&self) -> BatchState {
        let (generation, indices) = {
            let state = self.state.lock().unwrap();
            (state.generation, state.failed_indices())
        };

        if indices.is_empty() {
            return self.state();
        }

        self.dispatch(generation, indices).await;

        self.apply(BatchEvent::AllSettled { generation });
        self.state()
    }

    /// Fan out one request per index and join all outcomes. Individual
    /// failures are recorded per file, never propagated.
    ///
    /// The transport reports no byte-level progress, so each in-flight request
    /// is raced against a ticker that advances the file's progress in capped
    /// steps until the outcome arrives.
    async fn dispatch(&self, generation: u64, indices: Vec<usize>) {
        let uploads = indices.into_iter().map(|index| {
            let candidate = {
                let candidates = self.candidates.lock().unwrap();
                candidates.get(index).cloned()
            };

            async move {
                let Some(mut candidate) = candidate else {
                    return;
                };

                self.apply(BatchEvent::FileDispatched { generation, index });

                let data = std::mem::take(&mut candidate.data);
                let upload =
                    self.transport
                        .upload(&candidate.file_name, &candidate.content_type, data);
                tokio::pin!(upload);

                let mut ticker = tokio::time::interval(PROGRESS_TICK_INTERVAL);
                let mut percent = PROGRESS_DISPATCHED;
                let result = loop {
                    tokio::select! {
                        result = &mut upload => break result,
                        _ = ticker.tick() => {
                            percent = percent
                                .saturating_add(PROGRESS_TICK_STEP)
                                .min(PROGRESS_CAP_IN_FLIGHT);
                            self.apply(BatchEvent::ProgressTick {
                                generation,
                                index,
                                percent,
                            });
                        }
                    }
                };

                match result {
                    Ok(response) => {
                        tracing::debug!(
                            file = %candidate.file_name,
                            url = %response.url,
                            "Upload succeeded"
                        );
                        self.apply(BatchEvent::FileSucceeded {
                            generation,
                            index,
                            response,
                        });
                    }
                    Err(error) => {
                        tracing::warn!(
                            file = %candidate.file_name,
                            error = %error,
                            "Upload failed"
                        );
                        self.apply(BatchEvent::FileFailed {
                            generation,
                            index,
                            error,
                        });
                    }
                }
            }
        });

        join_all(uploads).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchPhase, FileStatus};
    use crate::error::UploadError;
    use async_trait::async_trait;
    use chrono::Utc;
    use pixbin_core::UploadResponse;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Scriptable transport: per-file outcomes plus a call counter.
    #[derive(Default)]
    struct MockTransport {
        failures: Mutex<HashMap<String, UploadError>>,
        calls: AtomicUsize,
        gate: Option<Arc<tokio::sync::Notify>>,
    }

    impl MockTransport {
        fn failing(names: &[(&str, UploadError)]) -> Self {
            Self {
                failures: Mutex::new(
                    names
                        .iter()
                        .map(|(n, e)| (n.to_string(), e.clone()))
                        .collect(),
                ),
                ..Default::default()
            }
        }

        fn clear_failures(&self) {
            self.failures.lock().unwrap().clear();
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UploadTransport for MockTransport {
        async fn upload(
            &self,
            file_name: &str,
            _content_type: &str,
            data: Vec<u8>,
        ) -> Result<UploadResponse, UploadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            if let Some(error) = self.failures.lock().unwrap().get(file_name) {
                return Err(error.clone());
            }

            Ok(UploadResponse {
                id: Uuid::new_v4(),
                url: format!("memory://uploads/{}", file_name),
                file_name: file_name.to_string(),
                original_name: file_name.to_string(),
                size: data.len() as u64,
                original_size: data.len() as u64,
                content_type: "image/png".to_string(),
                optimized: false,
                uploaded_at: Utc::now(),
            })
        }
    }

    fn candidate(name: &str, size: usize) -> Candidate {
        Candidate::new(name, "image/png", vec![0u8; size])
    }

    #[tokio::test]
    async fn test_batch_uploads_all_files() {
        let orchestrator = UploadOrchestrator::new(MockTransport::default());

        let state = orchestrator
            .upload_batch(vec![candidate("a.png", 10), candidate("b.png", 20)])
            .await;

        assert_eq!(state.phase, BatchPhase::Completed);
        assert_eq!(state.succeeded_count(), 2);
        assert_eq!(state.results.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicates_cause_exactly_one_network_call() {
        let orchestrator = UploadOrchestrator::new(MockTransport::default());

        let state = orchestrator
            .upload_batch(vec![candidate("a.png", 10), candidate("a.png", 10)])
            .await;

        assert_eq!(orchestrator.transport.call_count(), 1);
        assert_eq!(state.succeeded_count(), 1);
        assert_eq!(state.skipped_duplicate_count(), 1);
        assert_eq!(state.results.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_retained_and_do_not_abort_siblings() {
        let transport = MockTransport::failing(&[
            ("b.png", UploadError::Server("disk full".to_string())),
            ("d.png", UploadError::Network("timeout".to_string())),
        ]);
        let orchestrator = UploadOrchestrator::new(transport);

        let state = orchestrator
            .upload_batch(vec![
                candidate("a.png", 10),
                candidate("b.png", 20),
                candidate("c.png", 30),
                candidate("d.png", 40),
                candidate("e.png", 50),
            ])
            .await;

        assert_eq!(state.phase, BatchPhase::PartiallyFailed);
        assert_eq!(state.succeeded_count(), 3);
        assert_eq!(state.failed_count(), 2);
        assert_eq!(state.failed_indices(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_retry_resends_only_the_failed_subset() {
        let transport =
            MockTransport::failing(&[("b.png", UploadError::Server("boom".to_string()))]);
        let orchestrator = UploadOrchestrator::new(transport);

        orchestrator
            .upload_batch(vec![candidate("a.png", 10), candidate("b.png", 20)])
            .await;
        assert_eq!(orchestrator.transport.call_count(), 2);

        orchestrator.transport.clear_failures();
        let state = orchestrator.retry_failed().await;

        // Exactly one more request: the previously failed file
        assert_eq!(orchestrator.transport.call_count(), 3);
        assert_eq!(state.phase, BatchPhase::Completed);
        assert_eq!(state.succeeded_count(), 2);
        assert_eq!(state.failed_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_with_no_failures_is_a_no_op() {
        let orchestrator = UploadOrchestrator::new(MockTransport::default());
        orchestrator.upload_batch(vec![candidate("a.png", 10)]).await;
        assert_eq!(orchestrator.transport.call_count(), 1);

        let state = orchestrator.retry_failed().await;

        assert_eq!(orchestrator.transport.call_count(), 1);
        assert_eq!(state.phase, BatchPhase::Completed);
    }

    #[tokio::test]
    async fn test_new_batch_discards_in_flight_results_of_old_batch() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let transport = MockTransport {
            gate: Some(gate.clone()),
            ..Default::default()
        };
        let orchestrator = UploadOrchestrator::new(transport);

        // First batch blocks inside the transport
        let first = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.upload_batch(vec![candidate("old.png", 10)]).await })
        };
        while orchestrator.transport.call_count() == 0 {
            tokio::task::yield_now().await;
        }

        // Second batch supersedes it and blocks too
        let second = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.upload_batch(vec![candidate("new.png", 20)]).await })
        };
        while orchestrator.transport.call_count() < 2 {
            tokio::task::yield_now().await;
        }

        // Release both in-flight requests
        gate.notify_waiters();
        let _ = first.await.expect("first batch task");
        let _ = second.await.expect("second batch task");

        let state = orchestrator.state();
        assert_eq!(state.files.len(), 1);
        assert_eq!(state.files[0].file_name, "new.png");
        // Only the new batch's result is recorded; the old one was stale
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.results[0].file_name, "new.png");
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_advances_while_request_in_flight() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let transport = MockTransport {
            gate: Some(gate.clone()),
            ..Default::default()
        };
        let orchestrator = UploadOrchestrator::new(transport);

        let task = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.upload_batch(vec![candidate("a.png", 10)]).await })
        };
        while orchestrator.transport.call_count() == 0 {
            tokio::task::yield_now().await;
        }
        let dispatched = orchestrator.state().files[0].progress;

        // Let the ticker fire several times while the request is blocked
        tokio::time::advance(Duration::from_secs(2)).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        let snapshot = orchestrator.state();
        assert_eq!(snapshot.files[0].status, FileStatus::Uploading);
        assert!(
            snapshot.files[0].progress > dispatched,
            "progress should advance during flight: {} -> {}",
            dispatched,
            snapshot.files[0].progress
        );
        assert!(snapshot.files[0].progress <= 95);

        gate.notify_waiters();
        let state = task.await.expect("batch task");
        assert_eq!(state.files[0].progress, 100);
        assert_eq!(state.phase, BatchPhase::Completed);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_never_merge_batches() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let transport = MockTransport {
            gate: Some(gate.clone()),
            ..Default::default()
        };
        let orchestrator = UploadOrchestrator::new(transport);

        // Two handles submit at the same time; each batch must get its own
        // generation, so exactly one survives and the other is discarded whole.
        let tasks: Vec<_> = (0..2usize)
            .map(|i| {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    orchestrator
                        .upload_batch(vec![candidate(&format!("file-{}.png", i), 10 + i)])
                        .await
                })
            })
            .collect();
        while orchestrator.transport.call_count() < 2 {
            tokio::task::yield_now().await;
        }

        gate.notify_waiters();
        for task in tasks {
            task.await.expect("batch task");
        }

        let state = orchestrator.state();
        assert_eq!(state.files.len(), 1);
        assert_eq!(state.results.len(), 1);
        // The surviving result belongs to the surviving batch, never to the
        // superseded one
        assert_eq!(state.results[0].file_name, state.files[0].file_name);
        assert_eq!(state.phase, BatchPhase::Completed);
    }

    #[test]
    fn test_candidate_content_type_inference() {
        assert_eq!(content_type_for("photo.JPG"), Some("image/jpeg"));
        assert_eq!(content_type_for("icon.svg"), Some("image/svg+xml"));
        assert_eq!(content_type_for("anim.webp"), Some("image/webp"));
        assert_eq!(content_type_for("notes.txt"), None);
        assert_eq!(content_type_for("noextension"), None);
    }

    #[test]
    fn test_failed_status_retains_error() {
        let state = reduce(
            reduce(
                BatchState::default(),
                BatchEvent::BatchSubmitted {
                    generation: 1,
                    candidates: vec![CandidateMeta {
                        file_name: "a.png".to_string(),
                        size_bytes: 10,
                    }],
                },
            ),
            BatchEvent::FileFailed {
                generation: 1,
                index: 0,
                error: UploadError::RateLimited {
                    retry_after_secs: Some(60),
                },
            },
        );

        match &state.files[0].status {
            FileStatus::Failed(UploadError::RateLimited { retry_after_secs }) => {
                assert_eq!(*retry_after_secs, Some(60));
            }
            other => panic!("Expected rate-limited failure, got {:?}", other),
        }
    }
}
