use thiserror::Error;

/// Failures surfaced to callers of result-bearing bridge calls and to the
/// host's load-failure hook.
///
/// A call made before the runtime is ready is not an error: it is queued
/// and dispatched once the runtime signals readiness.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The runtime failed to load earlier; this bridge will never dispatch again.
    #[error("editor runtime is unavailable")]
    RuntimeUnavailable,

    /// The runtime rejected the call or could not execute it.
    #[error("editor runtime call failed: {0}")]
    Transport(String),

    /// The runtime failed to initialise or navigate.
    #[error("editor runtime failed to load: {0}")]
    LoadFailure(String),

    /// The runtime answered with a value of the wrong shape.
    #[error("unexpected reply from editor runtime: {0}")]
    InvalidResponse(String),

    /// The bridge was torn down before the call resolved.
    #[error("bridge closed")]
    Closed,
}

pub type BridgeResult<T> = Result<T, BridgeError>;
