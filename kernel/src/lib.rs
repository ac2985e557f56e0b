//! Process scheduling and lifecycle core.
//!
//! A fixed-size process table, the six-state process lifecycle
//! (fork/exit/wait/kill plus sleep/wakeup channels), tick-driven time
//! accounting, and per-CPU scheduler loops driving one of four policies:
//! first-come first-served, round-robin, priority-based, and a multi-level
//! feedback queue.
//!
//! The crate owns no hardware. Saving and restoring execution contexts is
//! delegated to a [`ContextSwitch`] collaborator; the `std` feature ships a
//! thread-backed one in [`sim`] so the whole kernel runs and is tested on a
//! host.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod error;
mod kernel;
pub mod mm;
pub mod process;
pub mod procfs;
pub mod sched;
#[cfg(feature = "std")]
pub mod sim;
pub mod swtch;
pub mod sync;
pub mod time;

pub use error::{KResult, KernelError};
pub use kernel::{Config, Kernel};
pub use process::{
    Handle, Kctx, Pid, ProcBody, ProcName, ProcState, WaitFlags, NOFILE, NPROC, ROOT_PID,
};
pub use procfs::ProcStat;
pub use sched::{SchedPolicy, MLFQ_SLICE, NCPU, NQUEUE};
pub use swtch::{ContextId, ContextSwitch};
