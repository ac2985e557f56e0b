//! Per-process control block.
//!
//! Each table slot is a [`Proc`]: an index fixed at construction plus the
//! lock-guarded mutable half, [`ProcExcl`]. Everything that changes over a
//! process's life sits behind that one per-slot lock.

use alloc::sync::Arc;

use crate::mm::{MemImage, TrapPage};
use crate::sched::NQUEUE;
use crate::sync::SpinLock;

use super::{Pid, NOFILE};

/// Fixed-capacity process name.
pub type ProcName = heapless::String<16>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Unused,
    Used,
    Sleeping,
    Runnable,
    Running,
    Zombie,
}

impl ProcState {
    /// Fixed-width tag used by the process dump.
    pub(crate) fn tag(self) -> &'static str {
        match self {
            ProcState::Unused => "unused",
            ProcState::Used => "used  ",
            ProcState::Sleeping => "sleep ",
            ProcState::Runnable => "runble",
            ProcState::Running => "run   ",
            ProcState::Zombie => "zombie",
        }
    }
}

/// Opaque reference to an open resource owned by an external layer.
/// Cloning duplicates the reference (fork), dropping closes it (exit).
#[derive(Debug, Clone)]
pub struct Handle(Arc<usize>);

impl Handle {
    pub fn new(id: usize) -> Self {
        Handle(Arc::new(id))
    }

    pub fn id(&self) -> usize {
        *self.0
    }

    /// Live references to the underlying resource.
    pub fn refs(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

/// Scheduling bookkeeping. Fields for all policies live side by side;
/// allocation seeds the ones the configured policy reads.
#[derive(Debug, Clone)]
pub struct SchedInfo {
    /// Static priority. 60 at allocation under priority scheduling, -1
    /// elsewhere.
    pub static_priority: i64,
    /// Dynamic priority, recomputed every tick. Lower is better.
    pub dynamic_priority: i64,
    pub niceness: i64,
    /// Current feedback-queue level, 0 (highest) through `NQUEUE - 1`.
    pub queue: usize,
    /// Ticks consumed at the current level since entering it.
    pub level_ticks: [u64; NQUEUE],
    /// Lifetime ticks consumed per level.
    pub level_ticks_total: [u64; NQUEUE],
    /// Distinct dispatches, counted on identity change only.
    pub dispatches: u64,
}

impl SchedInfo {
    pub(crate) fn unused() -> Self {
        Self {
            static_priority: -1,
            dynamic_priority: -1,
            niceness: -1,
            queue: 0,
            level_ticks: [0; NQUEUE],
            level_ticks_total: [0; NQUEUE],
            dispatches: 0,
        }
    }
}

/// Tick-granularity timing statistics.
#[derive(Debug, Clone, Default)]
pub struct TimeStats {
    /// Tick of allocation.
    pub created: u64,
    /// Tick of exit, 0 until then.
    pub exited: u64,
    /// Ticks spent running.
    pub run: u64,
    /// Ticks spent sleeping.
    pub io_wait: u64,
    /// Lifetime ticks spent runnable.
    pub wait_total: u64,
    /// Ticks spent runnable since the last dispatch, wakeup, or level
    /// change. Drives feedback-queue aging.
    pub wait_since_dispatch: u64,
}

/// The lock-guarded half of a PCB.
pub struct ProcExcl {
    pub pid: Pid,
    pub name: ProcName,
    pub state: ProcState,
    /// Sleep channel, nonzero while `Sleeping`.
    pub chan: usize,
    pub killed: bool,
    /// Exit status, valid while `Zombie`.
    pub xstate: i32,
    /// CPU currently executing this process.
    pub running_on: Option<usize>,
    pub trapframe: Option<TrapPage>,
    pub mem: Option<MemImage>,
    pub ofile: [Option<Handle>; NOFILE],
    pub cwd: Option<Handle>,
    pub sched: SchedInfo,
    pub times: TimeStats,
}

impl ProcExcl {
    fn unused() -> Self {
        const NO_HANDLE: Option<Handle> = None;
        Self {
            pid: 0,
            name: ProcName::new(),
            state: ProcState::Unused,
            chan: 0,
            killed: false,
            xstate: 0,
            running_on: None,
            trapframe: None,
            mem: None,
            ofile: [NO_HANDLE; NOFILE],
            cwd: None,
            sched: SchedInfo::unused(),
            times: TimeStats::default(),
        }
    }
}

/// One process table slot.
pub struct Proc {
    pub slot: usize,
    pub excl: SpinLock<ProcExcl>,
}

impl Proc {
    pub(crate) fn new(slot: usize) -> Self {
        Self {
            slot,
            excl: SpinLock::new(ProcExcl::unused()),
        }
    }

    /// Channel key for sleepers waiting on this process. The address is
    /// compared, never dereferenced.
    pub fn chan(&self) -> usize {
        self as *const Proc as usize
    }
}

pub(crate) fn make_name(s: &str) -> ProcName {
    let mut name = ProcName::new();
    for c in s.chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    name
}
