//! Opaque address-space accounting.
//!
//! Page tables and user mappings are outside this crate. The lifecycle paths
//! still need a fallible per-process allocation so that fork and spawn can
//! fail and unwind: [`MemGate`] is a page budget, [`MemImage`] a process
//! address space charged against it, and [`TrapPage`] the page holding a
//! process's saved user registers.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

pub const PAGE_SIZE: usize = 4096;

/// Shared page budget all address-space allocations are charged against.
pub struct MemGate {
    limit: usize,
    used: AtomicUsize,
}

impl MemGate {
    /// `None` means unlimited.
    pub fn new(limit_pages: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            limit: limit_pages.unwrap_or(usize::MAX),
            used: AtomicUsize::new(0),
        })
    }

    fn reserve(&self, pages: usize) -> bool {
        let mut cur = self.used.load(Ordering::Relaxed);
        loop {
            let next = match cur.checked_add(pages) {
                Some(n) if n <= self.limit => n,
                _ => return false,
            };
            match self
                .used
                .compare_exchange(cur, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(seen) => cur = seen,
            }
        }
    }

    fn release(&self, pages: usize) {
        self.used.fetch_sub(pages, Ordering::AcqRel);
    }

    pub fn pages_in_use(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }
}

/// One process's address space, modeled as a page count.
pub struct MemImage {
    gate: Arc<MemGate>,
    pages: usize,
}

impl MemImage {
    pub fn create(gate: &Arc<MemGate>, pages: usize) -> Option<Self> {
        if !gate.reserve(pages) {
            return None;
        }
        Some(Self {
            gate: gate.clone(),
            pages,
        })
    }

    /// Copy for fork. Charges the same budget and can fail the same way.
    pub fn duplicate(&self) -> Option<Self> {
        Self::create(&self.gate, self.pages)
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn bytes(&self) -> usize {
        self.pages * PAGE_SIZE
    }
}

impl Drop for MemImage {
    fn drop(&mut self) {
        self.gate.release(self.pages);
    }
}

/// Saved user registers, the minimal portable set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrapFrame {
    /// User program counter.
    pub epc: usize,
    /// User stack pointer.
    pub sp: usize,
    /// Return-value register, cleared in a forked child.
    pub a0: usize,
}

/// A trapframe and the page it occupies.
pub struct TrapPage {
    _page: MemImage,
    pub tf: TrapFrame,
}

impl TrapPage {
    pub fn create(gate: &Arc<MemGate>) -> Option<Self> {
        let page = MemImage::create(gate, 1)?;
        Some(Self {
            _page: page,
            tf: TrapFrame::default(),
        })
    }
}
