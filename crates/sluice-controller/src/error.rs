use sluice_core::{EventKind, PolicyError};
use thiserror::Error;

/// Top-level controller failures.
#[derive(Error, Debug)]
pub enum ControllerError {
    /// A protected handler faulted; dispatch must not continue against
    /// possibly-corrupted policy state.
    #[error("fatal fault in {kind} handler: {source}")]
    HandlerFault {
        /// Event whose handler faulted
        kind: EventKind,
        /// The underlying engine fault
        #[source]
        source: PolicyError,
    },

    /// The journal's backing store could not be reached at startup
    #[error(transparent)]
    Store(#[from] sluice_journal::StoreError),

    /// The signal bridge could not be installed
    #[error("signal bridge error: {0}")]
    Signal(#[from] std::io::Error),
}
