//! Kernel instance: the process table, per-CPU state, clock, and the
//! collaborators everything else hangs off.

use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::mm::MemGate;
use crate::process::table::ProcTable;
use crate::process::Pid;
use crate::sched::{Cpu, SchedPolicy, NCPU};
use crate::swtch::ContextSwitch;
use crate::sync::Mutex;

/// Startup configuration, consumed once by [`Kernel::new`].
#[derive(Debug, Clone)]
pub struct Config {
    pub policy: SchedPolicy,
    pub ncpu: usize,
    /// Ticks a runnable process may wait undispatched before the feedback
    /// queue promotes it one level.
    pub mlfq_wait_limit: u64,
    /// Page budget for all address spaces and trapframes. `None` means
    /// unlimited.
    pub mem_pages: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: SchedPolicy::RoundRobin,
            ncpu: 1,
            mlfq_wait_limit: 500,
            mem_pages: None,
        }
    }
}

pub struct Kernel {
    pub(crate) cfg: Config,
    pub(crate) table: ProcTable,
    pub(crate) cpus: Vec<Cpu>,
    pub(crate) ticks: AtomicU64,
    pub(crate) gate: Arc<MemGate>,
    pub(crate) swtch: Arc<dyn ContextSwitch>,
    /// Pid of the most recent dispatch on any CPU. Dispatch counts bump
    /// only when this changes.
    pub(crate) last_dispatched: Mutex<Option<Pid>>,
    pub(crate) halted: AtomicBool,
    pub(crate) me: Weak<Kernel>,
}

impl Kernel {
    pub fn new(cfg: Config, swtch: Arc<dyn ContextSwitch>) -> Arc<Kernel> {
        assert!(
            cfg.ncpu >= 1 && cfg.ncpu <= NCPU,
            "cpu count out of range: {}",
            cfg.ncpu
        );
        let gate = MemGate::new(cfg.mem_pages);
        Arc::new_cyclic(|me| Kernel {
            cpus: (0..cfg.ncpu).map(Cpu::new).collect(),
            cfg,
            table: ProcTable::new(),
            ticks: AtomicU64::new(0),
            gate,
            swtch,
            last_dispatched: Mutex::new(None),
            halted: AtomicBool::new(false),
            me: me.clone(),
        })
    }

    /// Current tick count.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Ask every scheduler loop to return once its current pass finishes.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
        log::info!("halt requested");
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn policy(&self) -> SchedPolicy {
        self.cfg.policy
    }

    pub(crate) fn arc(&self) -> Arc<Kernel> {
        self.me.upgrade().expect("kernel dropped while in use")
    }
}
