//! Backend Error Module
//!
//! This module defines the error type returned by HTTP handlers and its
//! conversion into a JSON response.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - BackendError and status mapping
//! └── conversion.rs - IntoResponse implementation
//! ```
//!
//! Lower layers keep their own errors (`SharedError`, `StoreError`,
//! `TaskError`); `?` lifts them into `BackendError` in handlers.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::BackendError;
