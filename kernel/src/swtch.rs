//! Context-switch collaborator seam.
//!
//! The core never saves or restores registers itself. It names execution
//! contexts with opaque [`ContextId`] tokens and delegates the actual
//! suspend/resume to a [`ContextSwitch`] implementation supplied at startup.
//! The `std` feature ships two: a thread-backed switcher and a no-op one.

use alloc::boxed::Box;

/// Continuation installed by [`ContextSwitch::prepare`].
pub type Entry = Box<dyn FnOnce() + Send>;

/// An execution context the switcher can suspend and resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextId {
    /// The scheduler context of CPU `.0`.
    Cpu(usize),
    /// The context bound to process table slot `.0`.
    Proc(usize),
}

/// Mechanism for suspending one context and resuming another.
///
/// Process locks are handed across `switch` and `retire`; implementations
/// only move control, they never touch kernel state.
#[cfg_attr(test, mockall::automock)]
pub trait ContextSwitch: Send + Sync {
    /// Bind a fresh continuation to `ctx`. `entry` runs when `ctx` is first
    /// switched to.
    fn prepare(&self, ctx: ContextId, entry: Entry);

    /// Suspend `from` and resume `to`. Returns when `from` is next resumed.
    fn switch(&self, from: ContextId, to: ContextId);

    /// Final switch out of `from`: resume `to` and discard `from`'s
    /// continuation. `from` is never resumed again.
    fn retire(&self, from: ContextId, to: ContextId);

    /// Nothing was runnable on `cpu` this pass.
    fn idle(&self, _cpu: ContextId) {}
}
