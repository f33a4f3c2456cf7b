//! Re-entrance detection for transform passes
//!
//! A pass through the transform path pushes the guard on entry. If a
//! transformer causes another pass to start (by asking for class bytes that
//! themselves go through the transformers) the depth exceeds the capacity
//! and the semaphore is set. The pass owner clears the semaphore before each
//! transformer and inspects it afterwards.
//!
//! The guard is not `Sync`: every thread that runs passes owns its own.

use std::cell::Cell;

/// Bounded depth counter with a sticky "re-entered" semaphore
#[derive(Debug)]
pub struct ReEntranceGuard {
    max_depth: usize,
    depth: Cell<usize>,
    semaphore: Cell<bool>,
}

impl ReEntranceGuard {
    /// Create a guard tolerating `max_depth` nested passes
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            depth: Cell::new(0),
            semaphore: Cell::new(false),
        }
    }

    /// Configured capacity
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Enter a pass; the returned scope leaves it on drop
    pub fn push(&self) -> GuardScope<'_> {
        let depth = self.depth.get() + 1;
        self.depth.set(depth);
        if depth > self.max_depth {
            self.semaphore.set(true);
        }
        GuardScope { guard: self }
    }

    /// Whether a pass went deeper than the capacity since the last clear
    pub fn is_set(&self) -> bool {
        self.semaphore.get()
    }

    /// Clear the semaphore (depth is left alone)
    pub fn clear(&self) {
        self.semaphore.set(false);
    }
}

impl Default for ReEntranceGuard {
    fn default() -> Self {
        Self::new(1)
    }
}

/// An entered pass, see [`ReEntranceGuard::push`]
#[must_use = "dropping the scope immediately leaves the pass"]
#[derive(Debug)]
pub struct GuardScope<'a> {
    guard: &'a ReEntranceGuard,
}

impl GuardScope<'_> {
    /// Whether this pass is nested deeper than the capacity
    pub fn check(&self) -> bool {
        self.guard.depth() > self.guard.max_depth
    }
}

impl Drop for GuardScope<'_> {
    fn drop(&mut self) {
        self.guard.depth.set(self.guard.depth.get().saturating_sub(1));
    }
}
