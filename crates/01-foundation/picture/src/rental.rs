use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{PictureError, PictureResult};
use crate::plane::{ChromaFormat, PicP};

/// Geometry shared by every picture a given [`PicRental`] pool manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PicLayout {
    /// Active-area width in samples.
    pub width: usize,
    /// Active-area height in samples.
    pub height: usize,
    /// Bit depth of integer planes, `6..=16`.
    pub bit_depth: u32,
    /// Padding applied on every side of the active area.
    pub margin: usize,
    /// Number of component planes.
    pub num_components: usize,
    /// Chroma subsampling descriptor.
    pub chroma: ChromaFormat,
}

struct PoolInner {
    free: Vec<PicP>,
    allocated: usize,
}

/// Thread-safe stack of compatible [`PicP`] buffers.
///
/// `borrow` pops a free buffer or allocates a fresh one while under
/// `size_limit`; once the limit is reached, `borrow` fails with
/// [`PictureError::ResourceExhaustion`] rather than growing unbounded, so
/// callers treat exhaustion as an ordinary recoverable error rather than a
/// panic.
pub struct PicRental {
    layout: PicLayout,
    size_limit: usize,
    inner: Mutex<PoolInner>,
}

impl PicRental {
    /// Creates an empty pool for pictures matching `layout`, capped at
    /// `size_limit` total allocations (lent out + held free).
    pub fn new(layout: PicLayout, size_limit: usize) -> Arc<Self> {
        Arc::new(Self {
            layout,
            size_limit,
            inner: Mutex::new(PoolInner {
                free: Vec::new(),
                allocated: 0,
            }),
        })
    }

    /// Geometry every picture borrowed from this pool will have.
    pub fn layout(&self) -> PicLayout {
        self.layout
    }

    /// Total buffers allocated so far (free + currently lent out).
    pub fn allocated_count(&self) -> usize {
        self.inner.lock().allocated
    }

    /// Pops a free buffer, or allocates a new one while under `size_limit`.
    pub fn borrow(self: &Arc<Self>) -> PictureResult<PicHandle> {
        let mut guard = self.inner.lock();
        if let Some(pic) = guard.free.pop() {
            drop(guard);
            return Ok(PicHandle {
                pool: Arc::clone(self),
                pic: Some(pic),
            });
        }
        if guard.allocated >= self.size_limit {
            return Err(PictureError::ResourceExhaustion {
                in_use: guard.allocated,
                limit: self.size_limit,
            });
        }
        guard.allocated += 1;
        drop(guard);
        let layout = self.layout;
        let pic = PicP::new(
            layout.width,
            layout.height,
            layout.bit_depth,
            layout.margin,
            layout.num_components,
            layout.chroma,
        );
        Ok(PicHandle {
            pool: Arc::clone(self),
            pic: Some(pic),
        })
    }

    fn giveback(&self, pic: PicP) {
        self.inner.lock().free.push(pic);
    }
}

/// An exclusively-owned picture on loan from a [`PicRental`] pool.
///
/// Returns the underlying buffer to the pool on drop; callers that need to
/// release a buffer deterministically (rather than waiting on scope exit)
/// can call [`PicHandle::giveback`] explicitly.
pub struct PicHandle {
    pool: Arc<PicRental>,
    pic: Option<PicP>,
}

impl PicHandle {
    /// Explicitly returns the buffer to the pool, consuming the handle.
    pub fn giveback(mut self) {
        if let Some(pic) = self.pic.take() {
            self.pool.giveback(pic);
        }
    }
}

impl std::ops::Deref for PicHandle {
    type Target = PicP;
    fn deref(&self) -> &PicP {
        self.pic.as_ref().expect("PicHandle used after giveback")
    }
}

impl std::ops::DerefMut for PicHandle {
    fn deref_mut(&mut self) -> &mut PicP {
        self.pic.as_mut().expect("PicHandle used after giveback")
    }
}

impl Drop for PicHandle {
    fn drop(&mut self) {
        if let Some(pic) = self.pic.take() {
            self.pool.giveback(pic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> PicLayout {
        PicLayout {
            width: 4,
            height: 4,
            bit_depth: 8,
            margin: 2,
            num_components: 1,
            chroma: ChromaFormat::Mono400,
        }
    }

    #[test]
    fn borrow_allocates_up_to_limit_then_exhausts() {
        let pool = PicRental::new(layout(), 2);
        let a = pool.borrow().unwrap();
        let b = pool.borrow().unwrap();
        assert!(pool.borrow().is_err());
        drop(a);
        drop(b);
    }

    #[test]
    fn giveback_recycles_buffers_without_growing_allocation_count() {
        let pool = PicRental::new(layout(), 1);
        let handle = pool.borrow().unwrap();
        assert_eq!(pool.allocated_count(), 1);
        handle.giveback();
        let _again = pool.borrow().unwrap();
        assert_eq!(pool.allocated_count(), 1);
    }

    #[test]
    fn dropped_handle_returns_to_pool_automatically() {
        let pool = PicRental::new(layout(), 1);
        {
            let _handle = pool.borrow().unwrap();
        }
        assert!(pool.borrow().is_ok());
    }
}
