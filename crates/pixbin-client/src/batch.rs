//! Batch upload state machine.
//!
//! All batch bookkeeping goes through a pure `reduce(state, event) -> state`
//! transition function with no I/O, so every aggregation rule (deduplication,
//! stale-batch discarding, duplicate-result guarding, final classification) is
//! testable without a network or a runtime.
//!
//! Events carry the generation of the batch they belong to. A new submission
//! bumps the generation and replaces all prior state; events from an abandoned
//! batch no longer match and are ignored rather than corrupting the new batch.

use crate::error::UploadError;
use pixbin_core::UploadResponse;
use std::collections::HashSet;
use uuid::Uuid;

/// Sentinel progress value for failed files.
pub const PROGRESS_FAILED: i8 = -1;
/// Synthetic in-flight progress never reaches 100 until the server confirms.
pub(crate) const PROGRESS_CAP_IN_FLIGHT: i8 = 95;
pub(crate) const PROGRESS_DISPATCHED: i8 = 10;

/// Batch lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPhase {
    #[default]
    Idle,
    Preparing,
    Uploading,
    Completed,
    PartiallyFailed,
}

/// Per-file lifecycle within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Pending,
    Uploading,
    Succeeded,
    Failed(UploadError),
    SkippedDuplicate,
}

/// Identity of a candidate as submitted. Payload bytes stay with the
/// orchestrator; the state machine tracks metadata only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMeta {
    pub file_name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub file_name: String,
    pub size_bytes: u64,
    pub status: FileStatus,
    /// 0-100 while pending/in flight, 100 on success, -1 on failure.
    pub progress: i8,
}

/// Complete batch state. Replaced wholesale on each new submission.
#[derive(Debug, Clone, Default)]
pub struct BatchState {
    pub generation: u64,
    pub phase: BatchPhase,
    pub files: Vec<FileEntry>,
    pub results: Vec<UploadResponse>,
    seen_ids: HashSet<Uuid>,
}

impl BatchState {
    pub fn succeeded_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Succeeded)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Failed(_)))
            .count()
    }

    pub fn skipped_duplicate_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::SkippedDuplicate)
            .count()
    }

    /// Indices of files waiting for dispatch.
    pub fn pending_indices(&self) -> Vec<usize> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.status == FileStatus::Pending)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of files eligible for explicit retry.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| matches!(f.status, FileStatus::Failed(_)))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Everything that can happen to a batch.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// A new batch replaces whatever came before it.
    BatchSubmitted {
        generation: u64,
        candidates: Vec<CandidateMeta>,
    },
    FileDispatched {
        generation: u64,
        index: usize,
    },
    ProgressTick {
        generation: u64,
        index: usize,
        percent: i8,
    },
    FileSucceeded {
        generation: u64,
        index: usize,
        response: UploadResponse,
    },
    FileFailed {
        generation: u64,
        index: usize,
        error: UploadError,
    },
    /// Every in-flight request of this generation has settled.
    AllSettled {
        generation: u64,
    },
}

/// Pure transition function. Events whose generation does not match the
/// current batch are ignored (stale results from an abandoned batch).
pub fn reduce(mut state: BatchState, event: BatchEvent) -> BatchState {
    match event {
        BatchEvent::BatchSubmitted {
            generation,
            candidates,
        } => {
            if generation <= state.generation && state.generation != 0 {
                return state;
            }

            // Intra-batch dedup by (name, size): first occurrence survives,
            // later ones are reported but never dispatched.
            let mut seen: HashSet<(String, u64)> = HashSet::new();
            let files = candidates
                .into_iter()
                .map(|c| {
                    let duplicate = !seen.insert((c.file_name.clone(), c.size_bytes));
                    FileEntry {
                        file_name: c.file_name,
                        size_bytes: c.size_bytes,
                        status: if duplicate {
                            FileStatus::SkippedDuplicate
                        } else {
                            FileStatus::Pending
                        },
                        progress: 0,
                    }
                })
                .collect();

            BatchState {
                generation,
                phase: BatchPhase::Preparing,
                files,
                results: Vec::new(),
                seen_ids: HashSet::new(),
            }
        }

        BatchEvent::FileDispatched { generation, index } => {
            if generation != state.generation {
                return state;
            }
            if let Some(entry) = state.files.get_mut(index) {
                entry.status = FileStatus::Uploading;
                entry.progress = PROGRESS_DISPATCHED;
            }
            state.phase = BatchPhase::Uploading;
            state
        }

        BatchEvent::ProgressTick {
            generation,
            index,
            percent,
        } => {
            if generation != state.generation {
                return state;
            }
            if let Some(entry) = state.files.get_mut(index) {
                if entry.status == FileStatus::Uploading {
                    entry.progress = percent.clamp(entry.progress, PROGRESS_CAP_IN_FLIGHT);
                }
            }
            state
        }

        BatchEvent::FileSucceeded {
            generation,
            index,
            response,
        } => {
            if generation != state.generation {
                return state;
            }
            if let Some(entry) = state.files.get_mut(index) {
                entry.status = FileStatus::Succeeded;
                entry.progress = 100;
            }
            // Guard against duplicate success callbacks for the same logical
            // upload: the server-assigned id is inserted at most once.
            if state.seen_ids.insert(response.id) {
                state.results.push(response);
            }
            state
        }

        BatchEvent::FileFailed {
            generation,
            index,
            error,
        } => {
            if generation != state.generation {
                return state;
            }
            if let Some(entry) = state.files.get_mut(index) {
                entry.status = FileStatus::Failed(error);
                entry.progress = PROGRESS_FAILED;
            }
            state
        }

        BatchEvent::AllSettled { generation } => {
            if generation != state.generation {
                return state;
            }
            state.phase = if state.failed_count() > 0 {
                BatchPhase::PartiallyFailed
            } else {
                BatchPhase::Completed
            };
            state
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn meta(name: &str, size: u64) -> CandidateMeta {
        CandidateMeta {
            file_name: name.to_string(),
            size_bytes: size,
        }
    }

    fn response(id: Uuid) -> UploadResponse {
        UploadResponse {
            id,
            url: "memory://uploads/a.png".to_string(),
            file_name: "a.png".to_string(),
            original_name: "a.png".to_string(),
            size: 90,
            original_size: 100,
            content_type: "image/png".to_string(),
            optimized: true,
            uploaded_at: Utc::now(),
        }
    }

    fn submitted(candidates: Vec<CandidateMeta>) -> BatchState {
        reduce(
            BatchState::default(),
            BatchEvent::BatchSubmitted {
                generation: 1,
                candidates,
            },
        )
    }

    #[test]
    fn test_submission_dedups_by_name_and_size() {
        let state = submitted(vec![
            meta("a.png", 100),
            meta("a.png", 100),
            meta("a.png", 200), // same name, different size: not a duplicate
            meta("b.png", 100),
        ]);

        assert_eq!(state.pending_indices(), vec![0, 2, 3]);
        assert_eq!(state.skipped_duplicate_count(), 1);
        assert_eq!(state.files[1].status, FileStatus::SkippedDuplicate);
        assert_eq!(state.phase, BatchPhase::Preparing);
    }

    #[test]
    fn test_new_batch_replaces_previous_results() {
        let mut state = submitted(vec![meta("a.png", 100)]);
        state = reduce(
            state,
            BatchEvent::FileSucceeded {
                generation: 1,
                index: 0,
                response: response(Uuid::new_v4()),
            },
        );
        assert_eq!(state.results.len(), 1);

        let state = reduce(
            state,
            BatchEvent::BatchSubmitted {
                generation: 2,
                candidates: vec![meta("c.png", 300)],
            },
        );
        assert!(state.results.is_empty());
        assert_eq!(state.files.len(), 1);
        assert_eq!(state.generation, 2);
    }

    #[test]
    fn test_stale_generation_events_are_ignored() {
        let state = submitted(vec![meta("a.png", 100)]);
        let state = reduce(
            state,
            BatchEvent::BatchSubmitted {
                generation: 2,
                candidates: vec![meta("b.png", 200)],
            },
        );

        // A success from the abandoned generation-1 batch arrives late
        let state = reduce(
            state,
            BatchEvent::FileSucceeded {
                generation: 1,
                index: 0,
                response: response(Uuid::new_v4()),
            },
        );

        assert!(state.results.is_empty());
        assert_eq!(state.files[0].status, FileStatus::Pending);
    }

    #[test]
    fn test_duplicate_success_id_recorded_once() {
        let state = submitted(vec![meta("a.png", 100), meta("b.png", 200)]);
        let id = Uuid::new_v4();

        let state = reduce(
            state,
            BatchEvent::FileSucceeded {
                generation: 1,
                index: 0,
                response: response(id),
            },
        );
        let state = reduce(
            state,
            BatchEvent::FileSucceeded {
                generation: 1,
                index: 1,
                response: response(id),
            },
        );

        assert_eq!(state.succeeded_count(), 2);
        assert_eq!(state.results.len(), 1);
    }

    #[test]
    fn test_result_aggregation_is_commutative() {
        let base = submitted(vec![meta("a.png", 100), meta("b.png", 200)]);
        let id_a = Uuid::new_v4();
        let id_b = Uuid::new_v4();

        let success = |i: usize, id: Uuid| BatchEvent::FileSucceeded {
            generation: 1,
            index: i,
            response: response(id),
        };

        let ab = reduce(reduce(base.clone(), success(0, id_a)), success(1, id_b));
        let ba = reduce(reduce(base, success(1, id_b)), success(0, id_a));

        assert_eq!(ab.succeeded_count(), ba.succeeded_count());
        let mut ids_ab: Vec<Uuid> = ab.results.iter().map(|r| r.id).collect();
        let mut ids_ba: Vec<Uuid> = ba.results.iter().map(|r| r.id).collect();
        ids_ab.sort();
        ids_ba.sort();
        assert_eq!(ids_ab, ids_ba);
    }

    #[test]
    fn test_all_settled_classifies_outcome() {
        let state = submitted(vec![meta("a.png", 100), meta("b.png", 200)]);
        let state = reduce(
            state,
            BatchEvent::FileSucceeded {
                generation: 1,
                index: 0,
                response: response(Uuid::new_v4()),
            },
        );
        let state = reduce(
            state,
            BatchEvent::FileFailed {
                generation: 1,
                index: 1,
                error: UploadError::Server("boom".to_string()),
            },
        );
        let state = reduce(state, BatchEvent::AllSettled { generation: 1 });

        assert_eq!(state.phase, BatchPhase::PartiallyFailed);
        assert_eq!(state.failed_indices(), vec![1]);
        assert_eq!(state.files[1].progress, PROGRESS_FAILED);
    }

    #[test]
    fn test_batch_with_no_failures_completes() {
        let state = submitted(vec![meta("a.png", 100)]);
        let state = reduce(
            state,
            BatchEvent::FileSucceeded {
                generation: 1,
                index: 0,
                response: response(Uuid::new_v4()),
            },
        );
        let state = reduce(state, BatchEvent::AllSettled { generation: 1 });

        assert_eq!(state.phase, BatchPhase::Completed);
    }

    #[test]
    fn test_progress_advances_monotonically_and_pins() {
        let state = submitted(vec![meta("a.png", 100)]);
        let state = reduce(
            state,
            BatchEvent::FileDispatched {
                generation: 1,
                index: 0,
            },
        );
        assert_eq!(state.files[0].progress, 10);

        let state = reduce(
            state,
            BatchEvent::ProgressTick {
                generation: 1,
                index: 0,
                percent: 50,
            },
        );
        assert_eq!(state.files[0].progress, 50);

        // Ticks never move backwards and never claim completion
        let state = reduce(
            state,
            BatchEvent::ProgressTick {
                generation: 1,
                index: 0,
                percent: 30,
            },
        );
        assert_eq!(state.files[0].progress, 50);
        let state = reduce(
            state,
            BatchEvent::ProgressTick {
                generation: 1,
                index: 0,
                percent: 100,
            },
        );
        assert_eq!(state.files[0].progress, 95);

        let state = reduce(
            state,
            BatchEvent::FileSucceeded {
                generation: 1,
                index: 0,
                response: response(Uuid::new_v4()),
            },
        );
        assert_eq!(state.files[0].progress, 100);
    }
}
