//! Kernel error taxonomy.

use core::fmt;

/// Recoverable failures surfaced to callers of the process and scheduling
/// APIs. Invariant violations are not represented here; those panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// No free process slot, or the page budget is exhausted.
    ResourceExhausted,
    /// No process with the requested pid.
    NotFound,
    /// The caller has no children to reap.
    NoChildren,
    /// The caller was marked killed while blocked.
    Killed,
    /// A static priority outside `[0, 100]`.
    InvalidPriority,
    /// A non-blocking wait found live children but nothing to reap.
    WouldBlock,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            KernelError::ResourceExhausted => "out of resources",
            KernelError::NotFound => "no such process",
            KernelError::NoChildren => "no children",
            KernelError::Killed => "killed",
            KernelError::InvalidPriority => "priority out of range",
            KernelError::WouldBlock => "operation would block",
        };
        f.write_str(msg)
    }
}

pub type KResult<T> = Result<T, KernelError>;
