//! Tick accounting.
//!
//! An external timer calls [`Kernel::clock_tick`] once per tick. Every
//! process is charged for the state it is in, and its dynamic priority is
//! recomputed, whatever the configured policy. Feedback-queue aging runs
//! after the accounting pass.

use core::sync::atomic::Ordering;

use crate::kernel::Kernel;
use crate::process::proc::ProcState;
use crate::sched::SchedPolicy;

impl Kernel {
    pub fn clock_tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        for proc in self.table.iter() {
            let mut excl = proc.excl.lock();
            match excl.state {
                ProcState::Running => {
                    excl.times.run += 1;
                    if self.cfg.policy == SchedPolicy::Mlfq {
                        let q = excl.sched.queue;
                        excl.sched.level_ticks[q] += 1;
                        excl.sched.level_ticks_total[q] += 1;
                    }
                }
                ProcState::Sleeping => excl.times.io_wait += 1,
                ProcState::Runnable => {
                    excl.times.wait_total += 1;
                    excl.times.wait_since_dispatch += 1;
                }
                _ => {}
            }
            let (nice, dp) = recompute(
                excl.sched.static_priority,
                excl.times.io_wait,
                excl.times.run,
            );
            excl.sched.niceness = nice;
            excl.sched.dynamic_priority = dp;
        }
        self.cfg.policy.on_tick(&self.table, self.cfg.mlfq_wait_limit);
    }
}

/// `nice = 10·iowait/(iowait+run)`, 5 when the denominator is zero;
/// `dp = clamp(sp − nice + 5, 0, 100)`.
pub(crate) fn recompute(sp: i64, io_wait: u64, run: u64) -> (i64, i64) {
    let nice = if io_wait + run == 0 {
        5
    } else {
        (10 * io_wait / (io_wait + run)) as i64
    };
    (nice, (sp - nice + 5).clamp(0, 100))
}
