//! Batch upload client for the Pixbin API.
//!
//! Uploads batches of files concurrently through an `UploadTransport`, with a
//! pure state machine (`batch::reduce`) tracking per-file lifecycle,
//! intra-batch deduplication, and explicit retry of failed files.

pub mod batch;
pub mod error;
pub mod orchestrator;
pub mod transport;

pub use batch::{BatchPhase, BatchState, FileStatus};
pub use error::UploadError;
pub use orchestrator::{Candidate, UploadOrchestrator};
pub use transport::{HttpTransport, UploadTransport};
