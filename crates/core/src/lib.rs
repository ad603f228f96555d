//! Shared vocabulary for differentially private network-flow synthesis.
//!
//! This crate holds the error taxonomy used by the accounting engine and the
//! pipeline orchestrator, plus the names of the pipeline stages.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod stage;

pub use error::{BoxError, DpError, DpErrorKind, Result};
pub use stage::Stage;

/// Common imports for downstream users.
pub mod prelude {
    pub use crate::{BoxError, DpError, DpErrorKind, Result, Stage};
}
