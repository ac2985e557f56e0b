//! Locking primitives.
//!
//! Ordinary leaf state uses `spin::Mutex` through the `Mutex` alias. Process
//! locks use the crate-local [`SpinLock`], which adds an explicit hand-off
//! API: a process lock is passed, still held, across a context switch, and
//! the code that resumes on the other side re-materializes the guard. RAII
//! alone cannot express that ownership transfer.

use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

pub type Mutex<T> = spin::Mutex<T>;
pub type MutexGuard<'a, T> = spin::MutexGuard<'a, T>;

/// Test-and-set spin lock with hand-off support.
pub struct SpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    pub fn lock(&self) -> SpinGuard<'_, T> {
        while self.locked.swap(true, Ordering::Acquire) {
            spin_loop();
        }
        SpinGuard { lock: self }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Re-materialize the guard for a lock received through
    /// [`SpinGuard::hand_off`].
    ///
    /// # Safety
    ///
    /// The caller must be the party the lock was handed to, and must not
    /// already hold a guard for it.
    pub unsafe fn resume_hand_off(&self) -> SpinGuard<'_, T> {
        debug_assert!(self.is_locked());
        SpinGuard { lock: self }
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

pub struct SpinGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<'a, T> SpinGuard<'a, T> {
    /// Transfer ownership of the lock to whoever resumes on the other side
    /// of a context switch. The lock stays held; no unlock happens here.
    pub fn hand_off(self) {
        core::mem::forget(self);
    }

    /// The lock this guard protects, usable after the guard is gone.
    pub fn spinlock(&self) -> &'a SpinLock<T> {
        self.lock
    }
}

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
