//! End-to-end lifecycle tests on the thread-backed context switcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use krill::sim::ThreadSwitch;
use krill::sync::SpinLock;
use krill::{Config, Handle, Kernel, KernelError, ProcState};

const TIMEOUT: Duration = Duration::from_secs(10);

/// Start one scheduler thread for a single-CPU kernel.
fn start_cpu(kern: &Arc<Kernel>) -> thread::JoinHandle<()> {
    let kern = kern.clone();
    thread::spawn(move || kern.run(0))
}

#[test]
fn fork_then_wait_returns_child_pid_and_status() {
    let kern = Kernel::new(Config::default(), ThreadSwitch::new());
    let (tx, rx) = mpsc::channel();
    kern.spawn("init", move |ctx| {
        let child = ctx.fork(|_| 7).unwrap();
        let mut status = 0;
        let reaped = ctx.wait(Some(&mut status)).unwrap();
        tx.send((child, reaped, status)).unwrap();
        ctx.kernel().halt();
        loop {
            ctx.yield_now();
        }
    })
    .unwrap();
    let cpu = start_cpu(&kern);
    let (child, reaped, status) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(reaped, child);
    assert_eq!(status, 7);
    cpu.join().unwrap();
}

#[test]
fn exit_closes_inherited_handles() {
    let kern = Kernel::new(Config::default(), ThreadSwitch::new());
    let handle = Handle::new(3);
    let (tx, rx) = mpsc::channel();
    let inherited = handle.clone();
    kern.spawn("init", move |ctx| {
        ctx.install_handle(inherited.clone()).unwrap();
        // Child inherits a copy of the descriptor table.
        ctx.fork(|_| 0).unwrap();
        ctx.wait(None).unwrap();
        // The child's copy was closed at exit; ours remains.
        tx.send(inherited.refs()).unwrap();
        ctx.kernel().halt();
        loop {
            ctx.yield_now();
        }
    })
    .unwrap();
    let cpu = start_cpu(&kern);
    // Outer clone + the root body's copy + the installed descriptor. The
    // child's inherited copy is gone; before the reap it was a fourth.
    let refs_after_reap = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(refs_after_reap, 3);
    assert_eq!(handle.refs(), 3);
    cpu.join().unwrap();
}

#[test]
fn dup_handle_shares_the_underlying_resource() {
    let kern = Kernel::new(Config::default(), ThreadSwitch::new());
    let handle = Handle::new(4);
    let (tx, rx) = mpsc::channel();
    let installed = handle.clone();
    kern.spawn("init", move |ctx| {
        let fd = ctx.install_handle(installed.clone()).unwrap();
        let dup = ctx.dup_handle(fd).unwrap();
        let bad = ctx.dup_handle(7);
        tx.send((fd, dup, bad, installed.refs())).unwrap();
        ctx.kernel().halt();
        loop {
            ctx.yield_now();
        }
    })
    .unwrap();
    let cpu = start_cpu(&kern);
    let (fd, dup, bad, refs) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!((fd, dup), (0, 1));
    assert_eq!(bad, Err(KernelError::NotFound));
    // Outer clone + the body's copy + two descriptor table entries.
    assert_eq!(refs, 4);
    cpu.join().unwrap();
}

#[test]
fn kill_is_observed_at_next_cooperative_check() {
    let kern = Kernel::new(Config::default(), ThreadSwitch::new());
    let (tx, rx) = mpsc::channel();
    kern.spawn("init", move |ctx| {
        let child = ctx
            .fork(|ctx| loop {
                if ctx.killed() {
                    return 3;
                }
                ctx.yield_now();
            })
            .unwrap();
        // Let the child start spinning before killing it.
        ctx.yield_now();
        ctx.kill(child).unwrap();
        let mut status = 0;
        let reaped = ctx.wait(Some(&mut status)).unwrap();
        tx.send((child, reaped, status)).unwrap();
        ctx.kernel().halt();
        loop {
            ctx.yield_now();
        }
    })
    .unwrap();
    let cpu = start_cpu(&kern);
    let (child, reaped, status) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(reaped, child);
    assert_eq!(status, 3);
    cpu.join().unwrap();
}

#[test]
fn kill_wakes_a_sleeping_child() {
    let kern = Kernel::new(Config::default(), ThreadSwitch::new());
    let cond = Arc::new(SpinLock::new(false));
    let chan = 0xD00D;
    let (tx, rx) = mpsc::channel();
    let sleeper_cond = cond.clone();
    kern.spawn("init", move |ctx| {
        let child = ctx
            .fork(move |ctx| {
                let mut ready = sleeper_cond.lock();
                while !*ready {
                    ready = ctx.sleep(chan, ready);
                    if ctx.killed() {
                        return 9;
                    }
                }
                0
            })
            .unwrap();
        // Wait until the child is actually asleep, then kill it. The kill
        // itself must make it runnable again; nobody posts the condition.
        while ctx.kernel().stat(child).map(|s| s.state) != Some(ProcState::Sleeping) {
            ctx.yield_now();
        }
        ctx.kill(child).unwrap();
        let mut status = 0;
        ctx.wait(Some(&mut status)).unwrap();
        tx.send(status).unwrap();
        ctx.kernel().halt();
        loop {
            ctx.yield_now();
        }
    })
    .unwrap();
    let cpu = start_cpu(&kern);
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), 9);
    cpu.join().unwrap();
}

#[test]
fn killed_parent_unblocks_from_wait_with_an_error() {
    let kern = Kernel::new(Config::default(), ThreadSwitch::new());
    let grandchild = Arc::new(SpinLock::new(0));
    let (tx, rx) = mpsc::channel();
    let gc_in_root = grandchild.clone();
    kern.spawn("init", move |ctx| {
        let gc = gc_in_root.clone();
        // Middle blocks in wait on a child that never exits; killing the
        // middle must fail the wait instead of leaving it asleep forever.
        let middle = ctx
            .fork(move |ctx| {
                let pid = ctx
                    .fork(|ctx| loop {
                        if ctx.killed() {
                            return 0;
                        }
                        ctx.yield_now();
                    })
                    .unwrap();
                *gc.lock() = pid;
                match ctx.wait(None) {
                    Err(KernelError::Killed) => 11,
                    _ => -1,
                }
            })
            .unwrap();
        // Only kill once the middle is actually asleep in wait.
        while ctx.kernel().stat(middle).map(|s| s.state) != Some(ProcState::Sleeping) {
            ctx.yield_now();
        }
        ctx.kill(middle).unwrap();
        let mut status = 0;
        assert_eq!(ctx.wait(Some(&mut status)).unwrap(), middle);
        // The orphaned grandchild is ours now; clean it up.
        let pid = *gc_in_root.lock();
        ctx.kill(pid).unwrap();
        assert_eq!(ctx.wait(None).unwrap(), pid);
        tx.send(status).unwrap();
        ctx.kernel().halt();
        loop {
            ctx.yield_now();
        }
    })
    .unwrap();
    let cpu = start_cpu(&kern);
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), 11);
    cpu.join().unwrap();
}

#[test]
fn wakeups_posted_under_the_condition_lock_are_never_lost() {
    let kern = Kernel::new(Config::default(), ThreadSwitch::new());
    let cond = Arc::new(SpinLock::new(false));
    let chan = 0xCAFE;
    let rounds = 50;
    let (tx, rx) = mpsc::channel();
    let sleeper_cond = cond.clone();
    kern.spawn("init", move |ctx| {
        let child = ctx
            .fork(move |ctx| {
                for _ in 0..rounds {
                    let mut posted = sleeper_cond.lock();
                    while !*posted {
                        posted = ctx.sleep(chan, posted);
                    }
                    *posted = false;
                }
                0
            })
            .unwrap();
        let mut status = 0;
        assert_eq!(ctx.wait(Some(&mut status)).unwrap(), child);
        tx.send(status).unwrap();
        ctx.kernel().halt();
        loop {
            ctx.yield_now();
        }
    })
    .unwrap();
    let cpu = start_cpu(&kern);

    // An external waker races the sleeper: post the condition, wake the
    // channel, repeat. If a wakeup between the condition check and the
    // sleep could be lost, the sleeper would hang and the test time out.
    let done = Arc::new(AtomicBool::new(false));
    let waker = {
        let kern = kern.clone();
        let cond = cond.clone();
        let done = done.clone();
        thread::spawn(move || {
            while !done.load(Ordering::Relaxed) {
                *cond.lock() = true;
                kern.wakeup(chan);
                thread::yield_now();
            }
        })
    };

    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), 0);
    done.store(true, Ordering::Relaxed);
    waker.join().unwrap();
    cpu.join().unwrap();
}

#[test]
fn orphans_are_reparented_to_root_and_reapable() {
    let kern = Kernel::new(Config::default(), ThreadSwitch::new());
    let (tx, rx) = mpsc::channel();
    kern.spawn("init", move |ctx| {
        // Middle process forks a grandchild and exits, reporting the
        // grandchild's pid through its own exit status.
        let middle = ctx
            .fork(|ctx| {
                let grandchild = ctx
                    .fork(|ctx| loop {
                        if ctx.killed() {
                            return 0;
                        }
                        ctx.yield_now();
                    })
                    .unwrap();
                grandchild as i32
            })
            .unwrap();
        let mut status = 0;
        assert_eq!(ctx.wait(Some(&mut status)).unwrap(), middle);
        let grandchild = status as usize;

        // The grandchild now belongs to us.
        ctx.kill(grandchild).unwrap();
        let reaped = ctx.wait(None).unwrap();
        tx.send((grandchild, reaped)).unwrap();
        ctx.kernel().halt();
        loop {
            ctx.yield_now();
        }
    })
    .unwrap();
    let cpu = start_cpu(&kern);
    let (grandchild, reaped) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(reaped, grandchild);
    cpu.join().unwrap();
}
