//! Double-buffered grid state.
//!
//! [`GridStore`] owns two flat row-major buffers of `rows * cols` cells. One
//! is the *front* (active-read) buffer holding the current generation, the
//! other the *back* (active-write) buffer receiving the next one. Roles swap
//! once per generation.
//!
//! Exclusive access (`&mut self`) is fully safe and used by the sequential
//! strategy. Shared access from several workers goes through the `unsafe`
//! methods, whose contracts are upheld by the engine: workers write disjoint
//! ranges of the back buffer, and the swap happens only inside a barrier
//! rendezvous, when every writer has finished.

use std::cell::UnsafeCell;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dims {
    /// Number of rows (n).
    pub rows: usize,
    /// Number of columns (m).
    pub cols: usize,
}

impl Dims {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Total number of cells.
    #[inline]
    pub const fn cells(&self) -> usize {
        self.rows * self.cols
    }

    /// Total number of cells, or `None` if `rows * cols` overflows.
    #[inline]
    pub const fn checked_cells(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }

    /// Convert a flat index to (row, col).
    #[inline]
    pub const fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    /// Convert (row, col) to a flat index.
    #[inline]
    pub const fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }
}

/// Two-slot cell store with an atomically swapped front designator.
pub struct GridStore<T> {
    buffers: [Box<[UnsafeCell<T>]>; 2],
    /// Slot index (0 or 1) of the active-read buffer.
    front: AtomicUsize,
}

// SAFETY: cells are only mutated through `&mut self` or through the unsafe
// shared-mode methods, whose callers guarantee disjoint writes and that no
// buffer is read while it is written.
unsafe impl<T: Send + Sync> Sync for GridStore<T> {}

impl<T: Copy> GridStore<T> {
    /// Seed both buffers with the same initial state.
    pub fn new(initial: Vec<T>) -> Self {
        let back: Box<[UnsafeCell<T>]> = initial.iter().copied().map(UnsafeCell::new).collect();
        let front: Box<[UnsafeCell<T>]> = initial.into_iter().map(UnsafeCell::new).collect();
        Self {
            buffers: [front, back],
            front: AtomicUsize::new(0),
        }
    }

    /// Number of cells per buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffers[0].len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn front_slot(&self) -> usize {
        self.front.load(Ordering::Acquire)
    }

    /// The current generation (active-read buffer).
    #[inline]
    pub fn current(&self) -> &[T] {
        let buffer = &self.buffers[self.front_slot()];
        // SAFETY: `UnsafeCell<T>` has the layout of `T`. The front buffer is
        // never written while readers exist: `&mut` writes exclude readers,
        // and shared writes only target the back buffer until `publish`.
        unsafe { std::slice::from_raw_parts(UnsafeCell::raw_get(buffer.as_ptr()), buffer.len()) }
    }

    /// Read one cell of the current generation.
    #[inline]
    pub fn read(&self, index: usize) -> T {
        self.current()[index]
    }

    /// Write one cell of the next generation (active-write buffer).
    #[inline]
    pub fn write(&mut self, index: usize, value: T) {
        let back = 1 - self.front_slot();
        *self.buffers[back][index].get_mut() = value;
    }

    /// Borrow the current generation and the whole next-generation buffer.
    pub fn split(&mut self) -> (&[T], &mut [T]) {
        let front = self.front_slot();
        let [a, b] = &mut self.buffers;
        let (read, write) = if front == 0 { (a, b) } else { (b, a) };
        let len = read.len();
        // SAFETY: both borrows derive from `&mut self`, so nothing else can
        // touch either buffer; the two buffers are distinct allocations.
        unsafe {
            (
                std::slice::from_raw_parts(UnsafeCell::raw_get(read.as_ptr()), len),
                std::slice::from_raw_parts_mut(UnsafeCell::raw_get(write.as_ptr()), len),
            )
        }
    }

    /// Exchange the active-read and active-write roles.
    #[inline]
    pub fn swap(&mut self) {
        let front = self.front.get_mut();
        *front = 1 - *front;
    }

    /// Mutable view of `range` within the next-generation buffer, from a
    /// shared reference.
    ///
    /// # Safety
    ///
    /// For the lifetime of the returned slice:
    /// - no other caller may hold a view overlapping `range`;
    /// - nobody may call [`GridStore::publish`];
    /// - nobody may read the back buffer.
    ///
    /// `range` must lie within `0..self.len()`.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn back_range_mut(&self, range: Range<usize>) -> &mut [T] {
        debug_assert!(range.start <= range.end && range.end <= self.len());
        let back = &self.buffers[1 - self.front_slot()];
        // SAFETY: in bounds per the contract; exclusivity of `range` is
        // guaranteed by the caller and writes go through `UnsafeCell`.
        unsafe {
            let start = UnsafeCell::raw_get(back.as_ptr().add(range.start));
            std::slice::from_raw_parts_mut(start, range.len())
        }
    }

    /// Swap roles from a shared reference.
    ///
    /// # Safety
    ///
    /// Every writer of the back buffer must have finished and dropped its
    /// view, and no reader of the front buffer may still be active. The
    /// engine calls this from the barrier's release action, when all
    /// participants are parked at the rendezvous.
    #[inline]
    pub unsafe fn publish(&self) {
        self.front.fetch_xor(1, Ordering::AcqRel);
    }

    /// Consume the store, returning the current generation.
    pub fn into_current(self) -> Vec<T> {
        let [a, b] = self.buffers;
        let front = if self.front.into_inner() == 0 { a } else { b };
        front.into_vec().into_iter().map(UnsafeCell::into_inner).collect()
    }
}

impl<T: Copy + std::fmt::Debug> std::fmt::Debug for GridStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridStore")
            .field("len", &self.len())
            .field("front", &self.front_slot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dims_index_roundtrip() {
        let dims = Dims::new(3, 5);
        assert_eq!(dims.cells(), 15);
        assert_eq!(dims.coords(7), (1, 2));
        assert_eq!(dims.index(1, 2), 7);
        assert_eq!(dims.checked_cells(), Some(15));
        assert_eq!(Dims::new(usize::MAX, 2).checked_cells(), None);
    }

    #[test]
    fn test_initialize_seeds_front() {
        let store = GridStore::new(vec![1u8, 0, 1, 1]);
        assert_eq!(store.len(), 4);
        assert_eq!(store.current(), &[1, 0, 1, 1]);
        assert_eq!(store.read(1), 0);
    }

    #[test]
    fn test_write_is_invisible_until_swap() {
        let mut store = GridStore::new(vec![0u8; 4]);
        store.write(2, 9);
        assert_eq!(store.read(2), 0);

        store.swap();
        assert_eq!(store.read(2), 9);
    }

    #[test]
    fn test_roles_alternate() {
        let mut store = GridStore::new(vec![0u32; 2]);
        for generation in 1..=4u32 {
            let (read, write) = store.split();
            write[0] = read[0] + generation;
            write[1] = read[1];
            store.swap();
        }
        assert_eq!(store.current(), &[10, 0]);
        assert_eq!(store.into_current(), vec![10, 0]);
    }

    #[test]
    fn test_shared_writes_then_publish() {
        let store = GridStore::new(vec![0u8; 6]);

        std::thread::scope(|s| {
            for (worker, range) in [0..2, 2..6].into_iter().enumerate() {
                let store = &store;
                s.spawn(move || {
                    // SAFETY: ranges are disjoint and nothing publishes or
                    // reads the back buffer until the scope joins.
                    let out = unsafe { store.back_range_mut(range) };
                    out.fill(worker as u8 + 1);
                });
            }
        });

        assert_eq!(store.current(), &[0; 6]);
        // SAFETY: all writers joined above.
        unsafe { store.publish() };
        assert_eq!(store.current(), &[1, 1, 2, 2, 2, 2]);
    }
}
