//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that interacts with external systems:
//! - Environment runtimes (Kubernetes pod exec / local container exec)
//! - Runtime secrets (media bucket discovery)
//! - Media object storage (aws s3 sync)

pub mod media;
pub mod runtime;
pub mod secrets;

// Re-export commonly used types
pub use media::MediaSync;
pub use runtime::{RuntimeBackend, RuntimeHandle, RuntimeRole};
pub use secrets::SecretResolver;
