//! Per-CPU scheduler core.
//!
//! Each CPU runs [`Kernel::run`]: pick a runnable process under the
//! configured policy, hand its lock across the context switch, and take the
//! lock back when the process switches out. A process enters the scheduler
//! only through [`Kernel::sched`], holding exactly its own lock with its
//! state already moved off `Running`.

pub mod policy;

pub use policy::{SchedPolicy, MLFQ_SLICE, NQUEUE};

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::kernel::Kernel;
use crate::process::proc::{ProcExcl, ProcState};
use crate::process::NPROC;
use crate::swtch::ContextId;
use crate::sync::SpinGuard;

/// Hard cap on configurable CPUs.
pub const NCPU: usize = 8;

const CPU_IDLE: usize = usize::MAX;

/// Per-CPU scheduler state.
pub struct Cpu {
    pub id: usize,
    running: AtomicUsize,
}

impl Cpu {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            running: AtomicUsize::new(CPU_IDLE),
        }
    }

    /// Slot of the process this CPU is executing, if any.
    pub fn current(&self) -> Option<usize> {
        match self.running.load(Ordering::Acquire) {
            CPU_IDLE => None,
            slot => Some(slot),
        }
    }

    fn set_current(&self, slot: Option<usize>) {
        self.running.store(slot.unwrap_or(CPU_IDLE), Ordering::Release);
    }
}

impl Kernel {
    /// Scheduler loop for one CPU. Returns after [`Kernel::halt`].
    pub fn run(&self, cpu_id: usize) {
        let cpu = &self.cpus[cpu_id];
        log::debug!("cpu {} entering scheduler", cpu.id);
        while !self.is_halted() {
            let dispatched = match self.cfg.policy {
                SchedPolicy::RoundRobin => self.round_robin_pass(cpu),
                policy => match policy.select(&self.table) {
                    Some(slot) => self.dispatch(cpu, slot),
                    None => false,
                },
            };
            if !dispatched {
                self.swtch.idle(ContextId::Cpu(cpu.id));
            }
        }
        log::debug!("cpu {} leaving scheduler", cpu.id);
    }

    fn round_robin_pass(&self, cpu: &Cpu) -> bool {
        let mut any = false;
        for slot in 0..NPROC {
            if self.is_halted() {
                break;
            }
            if self.dispatch(cpu, slot) {
                any = true;
            }
        }
        any
    }

    /// Lock `slot`, re-check it is still runnable, and switch into it.
    /// Returns whether the process actually ran.
    fn dispatch(&self, cpu: &Cpu, slot: usize) -> bool {
        let proc = self.table.proc(slot);
        let mut excl = proc.excl.lock();
        if excl.state != ProcState::Runnable {
            return false;
        }
        assert!(
            cpu.current().is_none(),
            "cpu {} dispatching while occupied",
            cpu.id
        );
        excl.state = ProcState::Running;
        excl.running_on = Some(cpu.id);
        excl.times.wait_since_dispatch = 0;
        cpu.set_current(Some(slot));
        {
            let mut last = self.last_dispatched.lock();
            if *last != Some(excl.pid) {
                excl.sched.dispatches += 1;
                *last = Some(excl.pid);
            }
        }
        log::trace!("cpu {} dispatching pid {}", cpu.id, excl.pid);

        // The process resumes holding its own lock.
        excl.hand_off();
        self.swtch.switch(ContextId::Cpu(cpu.id), ContextId::Proc(slot));

        // The process handed the lock back when it switched out.
        let mut excl = unsafe { proc.excl.resume_hand_off() };
        excl.running_on = None;
        drop(excl);
        cpu.set_current(None);
        true
    }

    /// Switch from the process in `slot` to its CPU's scheduler. The caller
    /// passes in its own guard, with state already moved off `Running`, and
    /// must hold no other lock. On return the caller has been redispatched
    /// and owns its lock again via hand-off.
    pub(crate) fn sched(&self, slot: usize, guard: SpinGuard<'_, ProcExcl>) {
        if guard.state == ProcState::Running {
            panic!("sched: pid {} still running", guard.pid);
        }
        let Some(cpu) = guard.running_on else {
            panic!("sched: pid {} has no cpu", guard.pid);
        };
        guard.hand_off();
        self.swtch.switch(ContextId::Proc(slot), ContextId::Cpu(cpu));
    }

    /// Cooperative yield of the process in `slot`.
    pub(crate) fn yield_slot(&self, slot: usize) {
        let proc = self.table.proc(slot);
        let mut excl = proc.excl.lock();
        assert_eq!(
            excl.state,
            ProcState::Running,
            "yield from a process that is not running"
        );
        excl.state = ProcState::Runnable;
        self.sched(slot, excl);
        drop(unsafe { proc.excl.resume_hand_off() });
    }
}
