//! Shared application state.

use std::sync::Arc;

use pixbin_core::Config;
use pixbin_processing::{ImageOptimizer, ImageValidator};
use pixbin_storage::Storage;

/// State shared across all request handlers.
///
/// Validator and optimizer are stateless apart from their configuration, so a
/// single instance of each serves all concurrent requests.
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub validator: ImageValidator,
    pub optimizer: ImageOptimizer,
}

impl AppState {
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        let validator = ImageValidator::new(config.upload.max_file_size_bytes);
        Self {
            config,
            storage,
            validator,
            optimizer: ImageOptimizer::default(),
        }
    }
}
