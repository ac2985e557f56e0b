//! Fixed-capacity process arena.
//!
//! Lock order: the `parents` lock is the ordering lock. It is always
//! acquired before any per-process lock and guards every parent link. The
//! pid index is a leaf lock, never held while acquiring anything else.

use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::sync::{Mutex, SpinGuard, SpinLock};

use super::proc::Proc;
use super::{Pid, NPROC};

pub struct ProcTable {
    procs: Vec<Proc>,
    /// Parent links, indexed by child slot. The ordering lock.
    pub(crate) parents: SpinLock<[Option<Pid>; NPROC]>,
    next_pid: SpinLock<Pid>,
    pid_index: Mutex<HashMap<Pid, usize>>,
}

impl ProcTable {
    pub fn new() -> Self {
        Self {
            procs: (0..NPROC).map(Proc::new).collect(),
            parents: SpinLock::new([None; NPROC]),
            next_pid: SpinLock::new(0),
            pid_index: Mutex::new(HashMap::new()),
        }
    }

    pub fn proc(&self, slot: usize) -> &Proc {
        &self.procs[slot]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proc> {
        self.procs.iter()
    }

    pub(crate) fn alloc_pid(&self) -> Pid {
        let mut next = self.next_pid.lock();
        *next += 1;
        *next
    }

    pub(crate) fn index_insert(&self, pid: Pid, slot: usize) {
        self.pid_index.lock().insert(pid, slot);
    }

    pub(crate) fn index_remove(&self, pid: Pid) {
        self.pid_index.lock().remove(&pid);
    }

    /// Slot currently holding `pid`. The slot's lock is not taken; callers
    /// must re-check the pid after locking.
    pub fn slot_of(&self, pid: Pid) -> Option<usize> {
        self.pid_index.lock().get(&pid).copied()
    }

    /// Lock a slot's exclusive half by pid, verifying the slot was not
    /// recycled in between.
    pub(crate) fn lock_pid(
        &self,
        pid: Pid,
    ) -> Option<(usize, SpinGuard<'_, super::proc::ProcExcl>)> {
        let slot = self.slot_of(pid)?;
        let excl = self.procs[slot].excl.lock();
        if excl.pid != pid {
            return None;
        }
        Some((slot, excl))
    }
}
