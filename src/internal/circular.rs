//! Circular dependency detection infrastructure.
//!
//! The resolution chain is a persistent linked list of frames owned by the
//! resolving call chain. Entering a key yields a new chain that shares its
//! parent frames; leaving is simply dropping it, so nothing can leak when a
//! resolution fails, panics or is cancelled.
//!
//! Chains only meet when one of them blocks on a cached provider that another
//! chain is building. Those waits are recorded in a process-wide wait graph;
//! a wait that would close a loop in it is reported as a cycle instead of
//! blocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::Key;

/// Default upper bound on chain length.
pub(crate) const DEFAULT_MAX_DEPTH: usize = 1024;

struct Frame {
    key: Key,
    depth: usize,
    parent: Option<Arc<Frame>>,
}

static NEXT_CHAIN: AtomicU64 = AtomicU64::new(1);

/// Chains blocked on a build owned by another chain.
static WAITING: parking_lot::Mutex<Vec<Wait>> = parking_lot::const_mutex(Vec::new());

struct Wait {
    waiter: u64,
    owner: u64,
    key: Key,
}

/// Ordered list of keys currently being resolved within one call chain.
///
/// Every root chain gets a process-unique id, shared by all chains entered
/// from it.
#[derive(Clone)]
pub(crate) struct ResolutionChain {
    id: u64,
    head: Option<Arc<Frame>>,
}

impl Default for ResolutionChain {
    fn default() -> Self {
        Self {
            id: NEXT_CHAIN.fetch_add(1, Ordering::Relaxed),
            head: None,
        }
    }
}

impl ResolutionChain {
    /// Returns a chain with `key` pushed on top.
    ///
    /// Fails with `CircularDependency` when `key` is already in flight and with
    /// `DepthExceeded` when the chain is `max_depth` frames long.
    pub(crate) fn enter(&self, key: Key, max_depth: usize) -> DiResult<ResolutionChain> {
        if self.contains(&key) {
            let mut chain = self.keys();
            chain.push(key);
            return Err(DiError::CircularDependency { chain });
        }

        let depth = self.depth();
        if depth >= max_depth {
            return Err(DiError::DepthExceeded(depth));
        }

        Ok(ResolutionChain {
            id: self.id,
            head: Some(Arc::new(Frame {
                key,
                depth: depth + 1,
                parent: self.head.clone(),
            })),
        })
    }

    pub(crate) fn contains(&self, key: &Key) -> bool {
        self.frames().any(|frame| &frame.key == key)
    }

    pub(crate) fn depth(&self) -> usize {
        self.head.as_ref().map_or(0, |frame| frame.depth)
    }

    /// Keys in traversal order, outermost first.
    pub(crate) fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.frames().map(|frame| frame.key).collect();
        keys.reverse();
        keys
    }

    /// Registers this chain as blocked on `key`, which `owner` is building.
    ///
    /// Fails with `CircularDependency` when `owner` is itself (transitively)
    /// waiting on this chain. The wait is removed when the guard drops.
    pub(crate) fn wait_for(&self, key: Key, owner: &ResolutionChain) -> DiResult<WaitGuard> {
        // sibling branches of one chain never wait on each other's keys
        if owner.id == self.id {
            return Ok(WaitGuard { waiter: None });
        }

        let mut waiting = WAITING.lock();
        let mut cycle = self.keys();
        let mut current = owner.id;
        for _ in 0..=waiting.len() {
            if current == self.id {
                return Err(DiError::CircularDependency { chain: cycle });
            }
            match waiting.iter().find(|wait| wait.waiter == current) {
                Some(wait) => {
                    cycle.push(wait.key);
                    current = wait.owner;
                }
                None => break,
            }
        }

        waiting.push(Wait {
            waiter: self.id,
            owner: owner.id,
            key,
        });
        Ok(WaitGuard { waiter: Some(self.id) })
    }

    /// Cycle error for a chain that re-entered a build `owner` started on the
    /// same thread through a detached resolution.
    pub(crate) fn reentered(&self, owner: &ResolutionChain) -> DiError {
        let mut chain = owner.keys();
        chain.extend(self.keys());
        DiError::CircularDependency { chain }
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.head.as_deref(), |frame| frame.parent.as_deref())
    }
}

/// Registration in the wait graph; removed on drop.
pub(crate) struct WaitGuard {
    waiter: Option<u64>,
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        if let Some(waiter) = self.waiter {
            let mut waiting = WAITING.lock();
            if let Some(pos) = waiting.iter().position(|wait| wait.waiter == waiter) {
                waiting.swap_remove(pos);
            }
        }
    }
}
