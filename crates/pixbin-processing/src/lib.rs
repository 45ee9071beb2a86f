//! Pixbin Processing Library
//!
//! Content validation (declared-type vs actual-byte-format checking) and
//! format-aware image optimization.

pub mod optimizer;
pub mod sniff;
pub mod validator;

pub use optimizer::{ImageOptimizer, OptimizedImage};
pub use validator::{ImageValidator, ValidationError};
