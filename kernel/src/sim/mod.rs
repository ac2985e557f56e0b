//! Host-side context switchers.
//!
//! [`ThreadSwitch`] realizes each context as an OS thread parked on a flag,
//! giving the scheduler real suspend/resume semantics on a development
//! machine. [`NoopSwitch`] registers nothing and is used by tests and
//! benches that only exercise the tables.

use std::boxed::Box;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::swtch::{ContextId, ContextSwitch};

#[derive(Default)]
struct Flag {
    run: Mutex<bool>,
    cv: Condvar,
}

impl Flag {
    fn post(&self) {
        let mut run = self.run.lock().unwrap();
        *run = true;
        self.cv.notify_one();
    }

    fn take(&self) {
        let mut run = self.run.lock().unwrap();
        while !*run {
            run = self.cv.wait(run).unwrap();
        }
        *run = false;
    }
}

/// Continuations as parked threads: `switch` posts the target's flag and
/// blocks on its own.
#[derive(Default)]
pub struct ThreadSwitch {
    flags: Mutex<HashMap<ContextId, Arc<Flag>>>,
}

impl ThreadSwitch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn flag(&self, ctx: ContextId) -> Arc<Flag> {
        self.flags
            .lock()
            .unwrap()
            .entry(ctx)
            .or_default()
            .clone()
    }
}

impl ContextSwitch for ThreadSwitch {
    fn prepare(&self, ctx: ContextId, entry: Box<dyn FnOnce() + Send>) {
        // A retired slot can be recycled; always start from a fresh flag.
        let flag = Arc::new(Flag::default());
        self.flags.lock().unwrap().insert(ctx, flag.clone());
        thread::spawn(move || {
            flag.take();
            entry();
        });
    }

    fn switch(&self, from: ContextId, to: ContextId) {
        let wait_on = self.flag(from);
        self.flag(to).post();
        wait_on.take();
    }

    fn retire(&self, from: ContextId, to: ContextId) {
        self.flags.lock().unwrap().remove(&from);
        self.flag(to).post();
    }

    fn idle(&self, _cpu: ContextId) {
        thread::yield_now();
    }
}

/// Switcher that never runs anything. Dispatching through it is a bug.
pub struct NoopSwitch;

impl NoopSwitch {
    pub fn new() -> Arc<Self> {
        Arc::new(NoopSwitch)
    }
}

impl ContextSwitch for NoopSwitch {
    fn prepare(&self, _ctx: ContextId, _entry: Box<dyn FnOnce() + Send>) {}

    fn switch(&self, _from: ContextId, _to: ContextId) {
        panic!("no-op switcher asked to run a process");
    }

    fn retire(&self, _from: ContextId, _to: ContextId) {}
}
