//! Scheduling policies: selection rules and per-tick aging.

use crate::process::proc::ProcState;
use crate::process::table::ProcTable;
use crate::process::{Pid, NPROC};

/// Feedback-queue level count.
pub const NQUEUE: usize = 5;

/// Time slice, in ticks, per feedback-queue level.
pub const MLFQ_SLICE: [u64; NQUEUE] = [1, 2, 4, 8, 16];

/// Pids at or below this are the early system processes that first-come
/// first-served scheduling keeps out of its comparator.
pub(crate) const SYSTEM_PIDS: Pid = 2;

static_assertions::const_assert_eq!(MLFQ_SLICE.len(), NQUEUE);
static_assertions::const_assert!(NPROC > 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedPolicy {
    /// Non-preemptive, earliest creation tick first.
    Fcfs,
    /// Table-order pass, every runnable process in turn.
    RoundRobin,
    /// Lowest dynamic priority first.
    Pbs,
    /// Multi-level feedback queue, lowest level first.
    Mlfq,
}

impl SchedPolicy {
    /// One selection pass over the table: lock, inspect, release each slot,
    /// never nesting process locks. Returns the winning slot, which must be
    /// re-locked and re-checked before dispatch.
    pub(crate) fn select(self, table: &ProcTable) -> Option<usize> {
        match self {
            SchedPolicy::Fcfs => fcfs_select(table),
            SchedPolicy::Pbs => pbs_select(table),
            SchedPolicy::Mlfq => mlfq_select(table),
            SchedPolicy::RoundRobin => {
                unreachable!("round-robin dispatches in table order")
            }
        }
    }

    /// Per-tick aging hook, run after the accounting pass.
    pub(crate) fn on_tick(self, table: &ProcTable, wait_limit: u64) {
        if self != SchedPolicy::Mlfq {
            return;
        }
        // Demote anything that exhausted its level's slice.
        for proc in table.iter() {
            let mut excl = proc.excl.lock();
            if excl.state != ProcState::Runnable {
                continue;
            }
            let q = excl.sched.queue;
            if excl.sched.level_ticks[q] >= MLFQ_SLICE[q] {
                excl.sched.level_ticks[q] = 0;
                excl.times.wait_since_dispatch = 0;
                if q + 1 < NQUEUE {
                    excl.sched.queue = q + 1;
                    log::trace!("pid {} demoted to queue {}", excl.pid, q + 1);
                }
            }
        }
        // Promote anything starved past the wait limit.
        for proc in table.iter() {
            let mut excl = proc.excl.lock();
            if excl.state != ProcState::Runnable {
                continue;
            }
            if excl.times.wait_since_dispatch > wait_limit {
                let q = excl.sched.queue;
                excl.times.wait_since_dispatch = 0;
                excl.sched.level_ticks[q] = 0;
                if q > 0 {
                    excl.sched.queue = q - 1;
                    log::trace!("pid {} promoted to queue {}", excl.pid, q - 1);
                }
            }
        }
    }
}

/// Earliest creation tick among runnable processes with pid above the
/// system range. When only system processes are runnable, fall back to
/// table order so init and its helpers still run.
fn fcfs_select(table: &ProcTable) -> Option<usize> {
    let mut best: Option<(u64, usize)> = None;
    let mut fallback: Option<usize> = None;
    for proc in table.iter() {
        let excl = proc.excl.lock();
        if excl.state != ProcState::Runnable {
            continue;
        }
        if excl.pid > SYSTEM_PIDS {
            if best.is_none_or(|(created, _)| excl.times.created < created) {
                best = Some((excl.times.created, proc.slot));
            }
        } else if fallback.is_none() {
            fallback = Some(proc.slot);
        }
    }
    best.map(|(_, slot)| slot).or(fallback)
}

/// Lowest dynamic priority; ties broken by fewest dispatches, then earliest
/// creation. Tuple order encodes exactly that.
fn pbs_select(table: &ProcTable) -> Option<usize> {
    let mut best: Option<((i64, u64, u64), usize)> = None;
    for proc in table.iter() {
        let excl = proc.excl.lock();
        if excl.state != ProcState::Runnable {
            continue;
        }
        let key = (
            excl.sched.dynamic_priority,
            excl.sched.dispatches,
            excl.times.created,
        );
        if best.is_none_or(|(k, _)| key < k) {
            best = Some((key, proc.slot));
        }
    }
    best.map(|(_, slot)| slot)
}

/// Lowest queue level first, table order within a level.
fn mlfq_select(table: &ProcTable) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for proc in table.iter() {
        let excl = proc.excl.lock();
        if excl.state != ProcState::Runnable {
            continue;
        }
        if best.is_none_or(|(q, _)| excl.sched.queue < q) {
            best = Some((excl.sched.queue, proc.slot));
        }
    }
    best.map(|(_, slot)| slot)
}
