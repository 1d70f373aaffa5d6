use thiserror::Error;

/// Errors surfaced by the hook primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("target {0:#x} already has a redirect installed")]
    AlreadyInstalled(usize),

    #[error("target {0:#x} has no installed redirect")]
    NotInstalled(usize),

    #[error("redirect allocation failed")]
    AllocationFailed,

    #[error("interception is unsupported on this target")]
    Unsupported,
}
