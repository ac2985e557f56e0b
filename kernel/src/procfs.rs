//! Observability: per-process snapshots, the operator-facing process dump,
//! and a whole-table consistency check for tests.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use crate::kernel::Kernel;
use crate::process::proc::{ProcName, ProcState};
use crate::process::Pid;
use crate::sched::{SchedPolicy, NCPU, NQUEUE};

/// Point-in-time copy of one process's externally interesting fields.
#[derive(Debug, Clone)]
pub struct ProcStat {
    pub pid: Pid,
    pub name: ProcName,
    pub state: ProcState,
    pub killed: bool,
    pub static_priority: i64,
    pub dynamic_priority: i64,
    pub niceness: i64,
    pub queue: usize,
    pub level_ticks_total: [u64; NQUEUE],
    pub dispatches: u64,
    pub created: u64,
    pub exited: u64,
    pub run: u64,
    pub io_wait: u64,
    pub wait_total: u64,
    pub wait_since_dispatch: u64,
}

impl Kernel {
    /// Snapshot of one process, `None` if the pid is gone.
    pub fn stat(&self, pid: Pid) -> Option<ProcStat> {
        let (_, excl) = self.table.lock_pid(pid)?;
        Some(ProcStat {
            pid: excl.pid,
            name: excl.name.clone(),
            state: excl.state,
            killed: excl.killed,
            static_priority: excl.sched.static_priority,
            dynamic_priority: excl.sched.dynamic_priority,
            niceness: excl.sched.niceness,
            queue: excl.sched.queue,
            level_ticks_total: excl.sched.level_ticks_total,
            dispatches: excl.sched.dispatches,
            created: excl.times.created,
            exited: excl.times.exited,
            run: excl.times.run,
            io_wait: excl.times.io_wait,
            wait_total: excl.times.wait_total,
            wait_since_dispatch: excl.times.wait_since_dispatch,
        })
    }

    /// Snapshots of every occupied slot, in table order.
    pub fn stats(&self) -> Vec<ProcStat> {
        self.table
            .iter()
            .filter_map(|proc| {
                let excl = proc.excl.lock();
                if excl.state == ProcState::Unused {
                    return None;
                }
                let pid = excl.pid;
                drop(excl);
                self.stat(pid)
            })
            .collect()
    }

    /// Formatted process table. Columns follow the configured policy:
    /// priority scheduling shows the dynamic priority, the feedback queue
    /// shows the level and since-dispatch wait, the rest show lifetime wait.
    pub fn procdump(&self) -> String {
        let mut out = String::new();
        match self.cfg.policy {
            SchedPolicy::Pbs | SchedPolicy::Mlfq => {
                let _ = writeln!(out, "PID Priority State rtime wtime nrun");
            }
            _ => {
                let _ = writeln!(out, "PID State rtime wtime nrun");
            }
        }
        for proc in self.table.iter() {
            let excl = proc.excl.lock();
            if excl.state == ProcState::Unused {
                continue;
            }
            let _ = match self.cfg.policy {
                SchedPolicy::Pbs => writeln!(
                    out,
                    "{:<4} {:<8} {} {:<5} {:<5} {}",
                    excl.pid,
                    excl.sched.dynamic_priority,
                    excl.state.tag(),
                    excl.times.run,
                    excl.times.wait_total,
                    excl.sched.dispatches,
                ),
                SchedPolicy::Mlfq => writeln!(
                    out,
                    "{:<4} {:<8} {} {:<5} {:<5} {}",
                    excl.pid,
                    excl.sched.queue,
                    excl.state.tag(),
                    excl.times.run,
                    excl.times.wait_since_dispatch,
                    excl.sched.dispatches,
                ),
                _ => writeln!(
                    out,
                    "{:<4} {} {:<5} {:<5} {}",
                    excl.pid,
                    excl.state.tag(),
                    excl.times.run,
                    excl.times.wait_total,
                    excl.sched.dispatches,
                ),
            };
        }
        out
    }

    /// Whole-table consistency check. Panics on violation; meant for tests
    /// and debug builds.
    pub fn validate(&self) {
        let mut running_per_cpu = [0usize; NCPU];
        for proc in self.table.iter() {
            let excl = proc.excl.lock();
            match excl.state {
                ProcState::Unused => {
                    assert_eq!(excl.pid, 0, "unused slot keeps a pid");
                    assert!(
                        excl.trapframe.is_none() && excl.mem.is_none(),
                        "unused slot holds memory"
                    );
                }
                ProcState::Sleeping => {
                    assert_ne!(excl.chan, 0, "pid {} sleeping on null channel", excl.pid);
                }
                ProcState::Running => {
                    let cpu = excl
                        .running_on
                        .unwrap_or_else(|| panic!("pid {} running on no cpu", excl.pid));
                    running_per_cpu[cpu] += 1;
                    assert!(
                        excl.trapframe.is_some(),
                        "pid {} running without a trapframe",
                        excl.pid
                    );
                }
                ProcState::Zombie => {
                    assert!(
                        excl.trapframe.is_none() && excl.mem.is_none(),
                        "pid {} zombie holds memory",
                        excl.pid
                    );
                }
                ProcState::Runnable | ProcState::Used => {
                    assert!(
                        excl.trapframe.is_some(),
                        "pid {} has no trapframe",
                        excl.pid
                    );
                }
            }
            if self.cfg.policy == SchedPolicy::Pbs && excl.state != ProcState::Unused {
                assert!(
                    (0..=100).contains(&excl.sched.dynamic_priority),
                    "pid {} priority out of range",
                    excl.pid
                );
            }
        }
        for count in running_per_cpu {
            assert!(count <= 1, "two processes running on one cpu");
        }
        for cpu in &self.cpus {
            if let Some(slot) = cpu.current() {
                let excl = self.table.proc(slot).excl.lock();
                // The process may have switched out between the two reads;
                // only a process still Running must agree with its CPU.
                if excl.state == ProcState::Running {
                    assert_eq!(
                        excl.running_on,
                        Some(cpu.id),
                        "cpu {} and pid {} disagree",
                        cpu.id,
                        excl.pid
                    );
                }
            }
        }
    }
}
