//! Process table, lifecycle, and the sleep/wakeup channel mechanism.

mod manager;
pub mod proc;
pub(crate) mod table;

pub use manager::{Kctx, ProcBody};
pub use proc::{Handle, ProcName, ProcState};

/// Process identifier. Monotonically increasing, never reused.
pub type Pid = usize;

/// Fixed size of the process table.
pub const NPROC: usize = 64;

/// Open-resource slots per process.
pub const NOFILE: usize = 16;

/// Pid of the first spawned process. It may never exit.
pub const ROOT_PID: Pid = 1;

bitflags::bitflags! {
    /// Options for [`Kctx::wait_flags`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WaitFlags: u32 {
        /// Return instead of blocking when no child has exited yet.
        const NOHANG = 1 << 0;
    }
}
