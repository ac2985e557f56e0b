//! Process lifecycle: spawn, fork, exit, wait, kill, and the sleep/wakeup
//! channel mechanism.
//!
//! Locking protocol: the table's `parents` lock (the ordering lock) is
//! always taken before any per-process lock. A process lock is handed
//! across every context switch; see `sync::SpinGuard::hand_off`.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::error::{KResult, KernelError};
use crate::kernel::Kernel;
use crate::mm::{MemImage, TrapPage, PAGE_SIZE};
use crate::sched::SchedPolicy;
use crate::swtch::ContextId;
use crate::sync::SpinGuard;

use super::proc::{make_name, Handle, ProcExcl, ProcState, SchedInfo, TimeStats};
use super::{Pid, WaitFlags, ROOT_PID};

/// A process body. Its return value becomes the exit status.
pub type ProcBody = Box<dyn FnOnce(&Kctx) -> i32 + Send + 'static>;

/// Handle passed to a process body; every process-side operation goes
/// through it.
pub struct Kctx {
    kern: Arc<Kernel>,
    slot: usize,
    pid: Pid,
}

impl Kctx {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kern
    }

    /// Create a child running `body`. Returns the child pid to this caller;
    /// the child starts with a zeroed return register and copies of this
    /// process's address space, handles, and name.
    pub fn fork<F>(&self, body: F) -> KResult<Pid>
    where
        F: FnOnce(&Kctx) -> i32 + Send + 'static,
    {
        self.kern.fork(self.slot, Box::new(body))
    }

    /// Block until a child exits, reap it, and return its pid. The status
    /// is written through `status` when supplied.
    pub fn wait(&self, status: Option<&mut i32>) -> KResult<Pid> {
        self.kern.wait(self.slot, WaitFlags::empty(), status)
    }

    pub fn wait_flags(&self, flags: WaitFlags, status: Option<&mut i32>) -> KResult<Pid> {
        self.kern.wait(self.slot, flags, status)
    }

    /// Give up the CPU for one scheduling round.
    pub fn yield_now(&self) {
        self.kern.yield_slot(self.slot);
    }

    /// Sleep on `chan`, atomically releasing `guard`'s lock; reacquires it
    /// before returning. Spurious returns are possible; callers re-check
    /// their condition in a loop.
    pub fn sleep<'a, T>(
        &self,
        chan: usize,
        guard: SpinGuard<'a, T>,
    ) -> SpinGuard<'a, T> {
        self.kern.sleep(self.slot, chan, guard)
    }

    /// Wake every process sleeping on `chan` except the caller.
    pub fn wakeup(&self, chan: usize) {
        self.kern.wakeup_except(chan, Some(self.slot));
    }

    pub fn kill(&self, pid: Pid) -> KResult<()> {
        self.kern.kill(pid)
    }

    pub fn set_priority(&self, pid: Pid, sp: i64) -> KResult<i64> {
        self.kern.set_priority_from(Some(self.slot), pid, sp)
    }

    /// Whether this process has been marked killed. Long-running bodies
    /// poll this and exit on their own.
    pub fn killed(&self) -> bool {
        self.kern.table.proc(self.slot).excl.lock().killed
    }

    /// Install an open-resource handle in the first free slot and return
    /// its descriptor index.
    pub fn install_handle(&self, handle: Handle) -> KResult<usize> {
        let mut excl = self.kern.table.proc(self.slot).excl.lock();
        for (fd, entry) in excl.ofile.iter_mut().enumerate() {
            if entry.is_none() {
                *entry = Some(handle);
                return Ok(fd);
            }
        }
        Err(KernelError::ResourceExhausted)
    }

    /// Duplicate the handle at descriptor `fd` into the first free slot
    /// and return the new descriptor index. Both descriptors reference the
    /// same underlying resource.
    pub fn dup_handle(&self, fd: usize) -> KResult<usize> {
        let mut excl = self.kern.table.proc(self.slot).excl.lock();
        let Some(handle) = excl.ofile.get(fd).and_then(|h| h.clone()) else {
            return Err(KernelError::NotFound);
        };
        for (new_fd, entry) in excl.ofile.iter_mut().enumerate() {
            if entry.is_none() {
                *entry = Some(handle);
                return Ok(new_fd);
            }
        }
        Err(KernelError::ResourceExhausted)
    }
}

impl Kernel {
    /// Create a process from nothing. The first spawn becomes the root
    /// process (pid 1), which may never exit; later spawns become children
    /// of the root so their exits are reapable.
    pub fn spawn<F>(&self, name: &str, body: F) -> KResult<Pid>
    where
        F: FnOnce(&Kctx) -> i32 + Send + 'static,
    {
        let (slot, mut excl) = self.alloc_proc().ok_or(KernelError::ResourceExhausted)?;
        excl.name = make_name(name);
        let pid = excl.pid;
        match MemImage::create(&self.gate, 1) {
            Some(image) => excl.mem = Some(image),
            None => {
                self.freeproc(&mut excl);
                return Err(KernelError::ResourceExhausted);
            }
        }
        if let Some(tp) = excl.trapframe.as_mut() {
            tp.tf.epc = 0;
            tp.tf.sp = PAGE_SIZE;
        }
        drop(excl);
        if pid != ROOT_PID {
            let mut parents = self.table.parents.lock();
            parents[slot] = Some(ROOT_PID);
        }
        self.bind_entry(slot, Box::new(body));
        self.table.proc(slot).excl.lock().state = ProcState::Runnable;
        log::info!("spawned {:?} pid={}", name, pid);
        Ok(pid)
    }

    /// Scan for an `Unused` slot. On success the slot comes back still
    /// locked, with a fresh pid, policy defaults, and a trapframe.
    fn alloc_proc(&self) -> Option<(usize, SpinGuard<'_, ProcExcl>)> {
        for proc in self.table.iter() {
            let mut excl = proc.excl.lock();
            if excl.state != ProcState::Unused {
                continue;
            }
            let pid = self.table.alloc_pid();
            excl.pid = pid;
            excl.state = ProcState::Used;
            excl.killed = false;
            excl.xstate = 0;
            excl.chan = 0;
            excl.running_on = None;
            excl.times = TimeStats {
                created: self.ticks(),
                ..TimeStats::default()
            };
            excl.sched = alloc_sched_info(self.cfg.policy, pid);
            self.table.index_insert(pid, proc.slot);
            match TrapPage::create(&self.gate) {
                Some(tp) => excl.trapframe = Some(tp),
                None => {
                    self.freeproc(&mut excl);
                    return None;
                }
            }
            return Some((proc.slot, excl));
        }
        None
    }

    /// Release everything hanging off a PCB and return the slot to
    /// `Unused`. Caller holds the slot's lock.
    fn freeproc(&self, excl: &mut ProcExcl) {
        excl.trapframe = None;
        excl.mem = None;
        for entry in excl.ofile.iter_mut() {
            *entry = None;
        }
        excl.cwd = None;
        if excl.pid != 0 {
            self.table.index_remove(excl.pid);
        }
        excl.pid = 0;
        excl.name.clear();
        excl.chan = 0;
        excl.killed = false;
        excl.xstate = 0;
        excl.running_on = None;
        excl.sched = SchedInfo::unused();
        excl.state = ProcState::Unused;
    }

    /// Register the first-dispatch continuation for `slot`. The scheduler
    /// hands the new process its own lock across the first switch; the
    /// wrapper releases it, runs the body, and exits with its status.
    fn bind_entry(&self, slot: usize, body: ProcBody) {
        let kern = self.arc();
        self.swtch.prepare(
            ContextId::Proc(slot),
            Box::new(move || {
                let pid = {
                    let excl = unsafe { kern.table.proc(slot).excl.resume_hand_off() };
                    excl.pid
                };
                let ctx = Kctx {
                    kern: kern.clone(),
                    slot,
                    pid,
                };
                let status = body(&ctx);
                kern.exit(&ctx, status);
            }),
        );
    }

    pub(crate) fn fork(&self, parent_slot: usize, body: ProcBody) -> KResult<Pid> {
        // Snapshot what the child inherits, under the parent's lock only.
        // Duplicating the address space charges the page budget; if the
        // child allocation fails below, dropping the copy refunds it.
        let parent = self.table.proc(parent_slot);
        let (ppid, name, mem, tf, ofile, cwd) = {
            let excl = parent.excl.lock();
            let mem = match excl.mem.as_ref() {
                Some(image) => match image.duplicate() {
                    Some(copy) => Some(copy),
                    None => return Err(KernelError::ResourceExhausted),
                },
                None => None,
            };
            (
                excl.pid,
                excl.name.clone(),
                mem,
                excl.trapframe.as_ref().map(|tp| tp.tf),
                excl.ofile.clone(),
                excl.cwd.clone(),
            )
        };

        let Some((child_slot, mut child)) = self.alloc_proc() else {
            return Err(KernelError::ResourceExhausted);
        };
        let child_pid = child.pid;
        child.name = name;
        child.mem = mem;
        if let (Some(tf), Some(tp)) = (tf, child.trapframe.as_mut()) {
            tp.tf = tf;
            // Fork returns 0 in the child.
            tp.tf.a0 = 0;
        }
        child.ofile = ofile;
        child.cwd = cwd;
        drop(child);

        {
            let mut parents = self.table.parents.lock();
            parents[child_slot] = Some(ppid);
        }

        self.bind_entry(child_slot, body);
        self.table.proc(child_slot).excl.lock().state = ProcState::Runnable;
        log::debug!("pid {} forked pid {}", ppid, child_pid);
        Ok(child_pid)
    }

    /// Terminate the calling process with `status`. Does not return.
    pub fn exit(&self, ctx: &Kctx, status: i32) {
        self.do_exit(ctx.slot, status);
    }

    pub(crate) fn do_exit(&self, slot: usize, status: i32) {
        let proc = self.table.proc(slot);
        let pid = {
            let mut excl = proc.excl.lock();
            if excl.pid == ROOT_PID {
                panic!("root process exiting with status {status}");
            }
            // Close open resources before touching the ordering lock.
            let closed: Vec<Option<Handle>> =
                excl.ofile.iter_mut().map(|f| f.take()).collect();
            let cwd = excl.cwd.take();
            let pid = excl.pid;
            drop(excl);
            drop(closed);
            drop(cwd);
            pid
        };

        let mut parents = self.table.parents.lock();

        // Hand our children to the root process, waking it in case it is
        // blocked reaping.
        let mut orphaned = false;
        for link in parents.iter_mut() {
            if *link == Some(pid) {
                *link = Some(ROOT_PID);
                orphaned = true;
            }
        }
        if orphaned {
            if let Some(root_slot) = self.table.slot_of(ROOT_PID) {
                self.wakeup_except(self.table.proc(root_slot).chan(), Some(slot));
            }
        }

        // Wake a parent blocked in wait.
        if let Some(ppid) = parents[slot] {
            if let Some(parent_slot) = self.table.slot_of(ppid) {
                self.wakeup_except(self.table.proc(parent_slot).chan(), Some(slot));
            }
        }

        let mut excl = proc.excl.lock();
        excl.xstate = status;
        excl.times.exited = self.ticks();
        // A zombie keeps only its slot and exit status.
        excl.trapframe = None;
        excl.mem = None;
        excl.state = ProcState::Zombie;
        let cpu = excl.running_on.unwrap_or_else(|| {
            panic!("exit: pid {pid} has no cpu");
        });
        drop(parents);
        log::debug!("pid {} exited with status {}", pid, status);

        // Final switch out. The scheduler releases our lock; this context
        // is never resumed.
        excl.hand_off();
        self.swtch
            .retire(ContextId::Proc(slot), ContextId::Cpu(cpu));
    }

    pub(crate) fn wait(
        &self,
        slot: usize,
        flags: WaitFlags,
        mut status: Option<&mut i32>,
    ) -> KResult<Pid> {
        let me = self.table.proc(slot);
        let my_pid = me.excl.lock().pid;
        let mut parents = self.table.parents.lock();
        loop {
            let mut have_children = false;
            for child_slot in 0..super::NPROC {
                if parents[child_slot] != Some(my_pid) {
                    continue;
                }
                have_children = true;
                let child = self.table.proc(child_slot);
                let mut excl = child.excl.lock();
                if excl.state == ProcState::Zombie {
                    let child_pid = excl.pid;
                    if let Some(out) = status.as_deref_mut() {
                        *out = excl.xstate;
                    }
                    self.freeproc(&mut excl);
                    parents[child_slot] = None;
                    log::debug!("pid {} reaped pid {}", my_pid, child_pid);
                    return Ok(child_pid);
                }
            }
            if !have_children {
                return Err(KernelError::NoChildren);
            }
            if me.excl.lock().killed {
                return Err(KernelError::Killed);
            }
            if flags.contains(WaitFlags::NOHANG) {
                return Err(KernelError::WouldBlock);
            }
            // Sleep on our own channel; exiting children wake it. The
            // ordering lock doubles as the condition lock.
            parents = self.sleep(slot, me.chan(), parents);
        }
    }

    /// Sleep on `chan`, atomically releasing `guard`'s lock. Takes the
    /// caller's own lock before dropping the condition lock, so a wakeup
    /// between the condition check and the switch cannot be lost.
    pub(crate) fn sleep<'a, T>(
        &self,
        slot: usize,
        chan: usize,
        guard: SpinGuard<'a, T>,
    ) -> SpinGuard<'a, T> {
        debug_assert!(chan != 0, "sleep on the null channel");
        let proc = self.table.proc(slot);
        let condition = guard.spinlock();

        let mut excl = proc.excl.lock();
        drop(guard);
        excl.chan = chan;
        excl.state = ProcState::Sleeping;
        self.sched(slot, excl);

        // Woken: the scheduler handed our lock back.
        let mut excl = unsafe { proc.excl.resume_hand_off() };
        excl.chan = 0;
        drop(excl);
        condition.lock()
    }

    /// Wake every process sleeping on `chan`, skipping `skip`.
    pub(crate) fn wakeup_except(&self, chan: usize, skip: Option<usize>) {
        for proc in self.table.iter() {
            if Some(proc.slot) == skip {
                continue;
            }
            let mut excl = proc.excl.lock();
            if excl.state == ProcState::Sleeping && excl.chan == chan {
                excl.state = ProcState::Runnable;
                excl.times.wait_since_dispatch = 0;
            }
        }
    }

    /// Wake every process sleeping on `chan`.
    pub fn wakeup(&self, chan: usize) {
        self.wakeup_except(chan, None);
    }

    /// Mark `pid` killed. A sleeping victim is made runnable so it can
    /// observe the flag; the kill takes effect at the victim's next
    /// cooperative check.
    pub fn kill(&self, pid: Pid) -> KResult<()> {
        let Some((_, mut excl)) = self.table.lock_pid(pid) else {
            return Err(KernelError::NotFound);
        };
        excl.killed = true;
        if excl.state == ProcState::Sleeping {
            excl.state = ProcState::Runnable;
            excl.times.wait_since_dispatch = 0;
        }
        log::debug!("pid {} marked killed", pid);
        Ok(())
    }

    /// Set `pid`'s static priority, resetting its niceness to the default.
    /// Returns the previous static priority.
    pub fn set_priority(&self, pid: Pid, sp: i64) -> KResult<i64> {
        self.set_priority_from(None, pid, sp)
    }

    pub(crate) fn set_priority_from(
        &self,
        caller: Option<usize>,
        pid: Pid,
        sp: i64,
    ) -> KResult<i64> {
        if !(0..=100).contains(&sp) {
            return Err(KernelError::InvalidPriority);
        }
        let (slot, old_sp, old_dp, new_dp) = {
            let Some((slot, mut excl)) = self.table.lock_pid(pid) else {
                return Err(KernelError::NotFound);
            };
            let old_sp = excl.sched.static_priority;
            let old_dp = excl.sched.dynamic_priority;
            excl.sched.static_priority = sp;
            excl.sched.niceness = 5;
            excl.sched.dynamic_priority = sp.clamp(0, 100);
            (slot, old_sp, old_dp, excl.sched.dynamic_priority)
        };
        // A caller that just worsened its own priority gives up the CPU so
        // the change takes effect immediately.
        if caller == Some(slot) && new_dp > old_dp {
            self.yield_slot(slot);
        }
        Ok(old_sp)
    }
}

/// Per-policy scheduling defaults at allocation time.
fn alloc_sched_info(policy: SchedPolicy, pid: Pid) -> SchedInfo {
    let mut info = SchedInfo::unused();
    if policy == SchedPolicy::Pbs {
        info.static_priority = 60;
        info.niceness = 5;
        info.dynamic_priority = if pid <= crate::sched::policy::SYSTEM_PIDS {
            1
        } else {
            60
        };
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Config;
    use crate::process::NPROC;
    use crate::sim::NoopSwitch;

    fn kernel() -> Arc<Kernel> {
        Kernel::new(Config::default(), NoopSwitch::new())
    }

    fn kernel_with(cfg: Config) -> Arc<Kernel> {
        Kernel::new(cfg, NoopSwitch::new())
    }

    #[test]
    fn spawn_fills_table_then_fails() {
        let kern = kernel();
        for i in 0..NPROC {
            kern.spawn("p", |_| 0).unwrap_or_else(|e| {
                panic!("spawn {i} failed: {e}");
            });
        }
        assert_eq!(kern.spawn("p", |_| 0), Err(KernelError::ResourceExhausted));
    }

    #[test]
    fn spawn_unwinds_when_page_budget_fails_mid_alloc() {
        // Two pages per process (trapframe + image): budget 3 admits one
        // process, then fails the second one's image allocation.
        let kern = kernel_with(Config {
            mem_pages: Some(3),
            ..Config::default()
        });
        kern.spawn("init", |_| 0).unwrap();
        assert_eq!(kern.spawn("p", |_| 0), Err(KernelError::ResourceExhausted));
        // The failed slot unwound completely.
        let slot = kern.table.slot_of(2);
        assert!(slot.is_none());
        assert_eq!(kern.gate.pages_in_use(), 2);
        kern.validate();
    }

    #[test]
    fn secondary_spawns_are_children_of_root() {
        let kern = kernel();
        let root = kern.spawn("init", |_| 0).unwrap();
        let sh = kern.spawn("sh", |_| 0).unwrap();
        let root_slot = kern.table.slot_of(root).unwrap();
        let sh_slot = kern.table.slot_of(sh).unwrap();
        assert_eq!(kern.table.parents.lock()[root_slot], None);
        assert_eq!(kern.table.parents.lock()[sh_slot], Some(root));

        // Once it exits, the root can reap it like any forked child.
        {
            let mut excl = kern.table.proc(sh_slot).excl.lock();
            excl.trapframe = None;
            excl.mem = None;
            excl.xstate = 5;
            excl.state = ProcState::Zombie;
        }
        let mut status = 0;
        let reaped = kern
            .wait(root_slot, WaitFlags::empty(), Some(&mut status))
            .unwrap();
        assert_eq!(reaped, sh);
        assert_eq!(status, 5);
        assert_eq!(kern.table.slot_of(sh), None);
    }

    #[test]
    fn fork_duplicates_handles_and_links_parent() {
        let kern = kernel();
        let root = kern.spawn("init", |_| 0).unwrap();
        let root_slot = kern.table.slot_of(root).unwrap();
        let handle = Handle::new(7);
        kern.table.proc(root_slot).excl.lock().ofile[0] = Some(handle.clone());
        assert_eq!(handle.refs(), 2);

        let child = kern.fork(root_slot, Box::new(|_| 0)).unwrap();
        let child_slot = kern.table.slot_of(child).unwrap();
        assert_eq!(handle.refs(), 3);
        assert_eq!(kern.table.parents.lock()[child_slot], Some(root));
        let excl = kern.table.proc(child_slot).excl.lock();
        assert_eq!(excl.state, ProcState::Runnable);
        assert_eq!(excl.trapframe.as_ref().unwrap().tf.a0, 0);
        assert_eq!(excl.name.as_str(), "init");
    }

    #[test]
    fn fork_fails_cleanly_when_budget_exhausted() {
        let kern = kernel_with(Config {
            mem_pages: Some(2),
            ..Config::default()
        });
        let root = kern.spawn("init", |_| 0).unwrap();
        let root_slot = kern.table.slot_of(root).unwrap();
        assert_eq!(
            kern.fork(root_slot, Box::new(|_| 0)),
            Err(KernelError::ResourceExhausted)
        );
        assert_eq!(kern.gate.pages_in_use(), 2);
        kern.validate();
    }

    #[test]
    fn wait_reports_no_children() {
        let kern = kernel();
        let root = kern.spawn("init", |_| 0).unwrap();
        let slot = kern.table.slot_of(root).unwrap();
        assert_eq!(
            kern.wait(slot, WaitFlags::empty(), None),
            Err(KernelError::NoChildren)
        );
    }

    #[test]
    fn nohang_wait_returns_would_block() {
        let kern = kernel();
        let root = kern.spawn("init", |_| 0).unwrap();
        let slot = kern.table.slot_of(root).unwrap();
        kern.fork(slot, Box::new(|_| 0)).unwrap();
        assert_eq!(
            kern.wait(slot, WaitFlags::NOHANG, None),
            Err(KernelError::WouldBlock)
        );
    }

    #[test]
    fn wait_reaps_zombie_and_frees_slot() {
        let kern = kernel();
        let root = kern.spawn("init", |_| 0).unwrap();
        let root_slot = kern.table.slot_of(root).unwrap();
        let child = kern.fork(root_slot, Box::new(|_| 0)).unwrap();
        let child_slot = kern.table.slot_of(child).unwrap();
        {
            let mut excl = kern.table.proc(child_slot).excl.lock();
            excl.trapframe = None;
            excl.mem = None;
            excl.xstate = 42;
            excl.state = ProcState::Zombie;
        }
        let mut status = 0;
        let reaped = kern
            .wait(root_slot, WaitFlags::empty(), Some(&mut status))
            .unwrap();
        assert_eq!(reaped, child);
        assert_eq!(status, 42);
        assert_eq!(kern.table.slot_of(child), None);
        assert_eq!(
            kern.table.proc(child_slot).excl.lock().state,
            ProcState::Unused
        );
        kern.validate();
    }

    #[test]
    fn kill_unknown_pid_is_not_found() {
        let kern = kernel();
        assert_eq!(kern.kill(99), Err(KernelError::NotFound));
    }

    #[test]
    fn kill_wakes_a_sleeper() {
        let kern = kernel();
        let pid = kern.spawn("init", |_| 0).unwrap();
        let slot = kern.table.slot_of(pid).unwrap();
        {
            let mut excl = kern.table.proc(slot).excl.lock();
            excl.state = ProcState::Sleeping;
            excl.chan = 0xBEEF;
        }
        kern.kill(pid).unwrap();
        let excl = kern.table.proc(slot).excl.lock();
        assert!(excl.killed);
        assert_eq!(excl.state, ProcState::Runnable);
    }

    #[test]
    fn wakeup_only_matches_channel() {
        let kern = kernel();
        let a = kern.spawn("a", |_| 0).unwrap();
        let b = kern.spawn("b", |_| 0).unwrap();
        for (pid, chan) in [(a, 0x10), (b, 0x20)] {
            let slot = kern.table.slot_of(pid).unwrap();
            let mut excl = kern.table.proc(slot).excl.lock();
            excl.state = ProcState::Sleeping;
            excl.chan = chan;
        }
        kern.wakeup(0x10);
        let a_slot = kern.table.slot_of(a).unwrap();
        let b_slot = kern.table.slot_of(b).unwrap();
        assert_eq!(kern.table.proc(a_slot).excl.lock().state, ProcState::Runnable);
        assert_eq!(kern.table.proc(b_slot).excl.lock().state, ProcState::Sleeping);
    }

    #[test]
    fn set_priority_validates_and_returns_old() {
        let kern = kernel_with(Config {
            policy: SchedPolicy::Pbs,
            ..Config::default()
        });
        let pid = kern.spawn("init", |_| 0).unwrap();
        assert_eq!(kern.set_priority(pid, 101), Err(KernelError::InvalidPriority));
        assert_eq!(kern.set_priority(99, 50), Err(KernelError::NotFound));
        assert_eq!(kern.set_priority(pid, 30).unwrap(), 60);
        assert_eq!(kern.set_priority(pid, 80).unwrap(), 30);
        let stat = kern.stat(pid).unwrap();
        assert_eq!(stat.static_priority, 80);
        assert_eq!(stat.dynamic_priority, 80);
        assert_eq!(stat.niceness, 5);
    }

    #[test]
    #[should_panic(expected = "root process exiting")]
    fn root_exit_is_fatal() {
        let kern = kernel();
        let root = kern.spawn("init", |_| 0).unwrap();
        let slot = kern.table.slot_of(root).unwrap();
        kern.do_exit(slot, 0);
    }

    #[test]
    fn pid_reuse_never_happens_across_respawn() {
        let kern = kernel();
        let root = kern.spawn("init", |_| 0).unwrap();
        let root_slot = kern.table.slot_of(root).unwrap();
        let first = kern.fork(root_slot, Box::new(|_| 0)).unwrap();
        let child_slot = kern.table.slot_of(first).unwrap();
        {
            let mut excl = kern.table.proc(child_slot).excl.lock();
            excl.trapframe = None;
            excl.mem = None;
            excl.state = ProcState::Zombie;
        }
        kern.wait(root_slot, WaitFlags::empty(), None).unwrap();
        let second = kern.fork(root_slot, Box::new(|_| 0)).unwrap();
        assert!(second > first);
    }
}
