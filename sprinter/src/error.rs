use thiserror::Error;

/// Cycle-level preconditions surfaced to the host before any dispatch is
/// attempted. Per-request failures are never reported here; they end up as
/// error-valued outcomes inside the result sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no requests to send")]
    EmptySet,

    #[error("no base request loaded to duplicate")]
    NoTemplate,

    #[error("selection contained no requests")]
    EmptySelection,
}
