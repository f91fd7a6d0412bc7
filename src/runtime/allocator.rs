//! Workspace accounting for buffer allocation
//!
//! Every [`DataBuffer`](crate::tensor::DataBuffer) created through an execution
//! context is charged against that context's workspace. The workspace does
//! not hold memory itself; it tracks how many bytes live buffers occupy and
//! refuses reservations that would exceed the configured limit.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Memory accounting trait for execution back-ends
pub trait Allocator: Clone + Send + Sync {
    /// Reserve `size_bytes` against this allocator
    fn reserve(&self, size_bytes: usize) -> Result<()>;

    /// Return a previous reservation
    fn release(&self, size_bytes: usize);

    /// Bytes currently reserved by live buffers
    fn allocated_bytes(&self) -> usize;
}

static NEXT_WORKSPACE_ID: AtomicU64 = AtomicU64::new(1);

/// Byte-accounting workspace shared by handle
///
/// Clones share the same counters.
#[derive(Clone)]
pub struct Workspace {
    inner: Arc<WorkspaceInner>,
}

struct WorkspaceInner {
    id: u64,
    limit: Option<usize>,
    in_use: AtomicUsize,
    peak: AtomicUsize,
    live_buffers: AtomicUsize,
}

impl Workspace {
    /// Create a workspace with an optional byte limit
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            inner: Arc::new(WorkspaceInner {
                id: NEXT_WORKSPACE_ID.fetch_add(1, Ordering::Relaxed),
                limit,
                in_use: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                live_buffers: AtomicUsize::new(0),
            }),
        }
    }

    /// Create a workspace without a byte limit
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Unique id of this workspace
    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Configured byte limit
    #[inline]
    pub fn limit(&self) -> Option<usize> {
        self.inner.limit
    }

    /// Highest number of bytes held at once
    pub fn peak_bytes(&self) -> usize {
        self.inner.peak.load(Ordering::Relaxed)
    }

    /// Number of live buffers charged to this workspace
    pub fn live_buffers(&self) -> usize {
        self.inner.live_buffers.load(Ordering::Relaxed)
    }

    /// Check whether two handles refer to the same workspace
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Allocator for Workspace {
    fn reserve(&self, size_bytes: usize) -> Result<()> {
        let inner = &self.inner;
        let updated = inner
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |in_use| {
                let next = in_use.checked_add(size_bytes)?;
                match inner.limit {
                    Some(limit) if next > limit => None,
                    _ => Some(next),
                }
            });

        match updated {
            Ok(previous) => {
                inner
                    .peak
                    .fetch_max(previous + size_bytes, Ordering::Relaxed);
                inner.live_buffers.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(in_use) => {
                tracing::warn!(
                    workspace = inner.id,
                    requested = size_bytes,
                    in_use,
                    "workspace reservation refused"
                );
                Err(Error::WorkspaceExhausted {
                    requested: size_bytes,
                    in_use,
                    limit: inner.limit.unwrap_or(usize::MAX),
                })
            }
        }
    }

    fn release(&self, size_bytes: usize) {
        self.inner.in_use.fetch_sub(size_bytes, Ordering::AcqRel);
        self.inner.live_buffers.fetch_sub(1, Ordering::Relaxed);
    }

    fn allocated_bytes(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("id", &self.inner.id)
            .field("limit", &self.inner.limit)
            .field("in_use", &self.allocated_bytes())
            .field("peak", &self.peak_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_workspace_trait_bounds() {
        fn assert_allocator<A: Allocator>() {}
        assert_allocator::<Workspace>();
    }

    #[test]
    fn test_reserve_and_release() {
        let ws = Workspace::new(Some(100));
        ws.reserve(60).unwrap();
        assert_eq!(ws.allocated_bytes(), 60);
        assert_eq!(ws.live_buffers(), 1);

        let err = ws.reserve(50).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Allocation);
        assert_eq!(ws.allocated_bytes(), 60);

        ws.release(60);
        assert_eq!(ws.allocated_bytes(), 0);
        assert_eq!(ws.peak_bytes(), 60);
        ws.reserve(100).unwrap();
    }

    #[test]
    fn test_clones_share_counters() {
        let ws = Workspace::unbounded();
        let other = ws.clone();
        other.reserve(16).unwrap();
        assert_eq!(ws.allocated_bytes(), 16);
        assert!(ws.same_as(&other));
        assert!(!ws.same_as(&Workspace::unbounded()));
    }
}
