use std::marker::PhantomData;

use crate::store::BackingStore;

/// Minimum capacity of any region, chosen to amortize backing-store calls.
pub const DEFAULT_CAPACITY: usize = 4096;

/// One contiguous block of raw memory from which allocations are carved.
///
/// A region owns its base pointer exclusively. It is never relocated, never
/// shrunk in address space and never freed individually; the backing memory
/// is released exactly once, when the owning arena is torn down.
///
/// Two counters describe its state: `size` is the bump offset separating
/// used from unused bytes, `refs` is the number of live allocations carved
/// from it. `base + size` always stays within `[base, base + capacity]`.
pub struct Region<B: BackingStore> {
  capacity: usize,
  base: *mut u8,
  size: usize,
  refs: usize,
  _store: PhantomData<B>,
}

// The base pointer is exclusively owned and every access to the region is
// serialized by the arena lock.
unsafe impl<B: BackingStore> Send for Region<B> {}

impl<B: BackingStore> Region<B> {
  /// Acquires `max(DEFAULT_CAPACITY, min_capacity)` bytes from the backing
  /// store. Aborts the process if the store cannot supply them.
  pub fn new(min_capacity: usize) -> Self {
    let capacity = DEFAULT_CAPACITY.max(min_capacity);
    let base = unsafe { B::acquire(capacity) };

    log::trace!("region created: base = {base:?}, capacity = {capacity}");

    Self {
      capacity,
      base,
      size: 0,
      refs: 0,
      _store: PhantomData,
    }
  }

  pub fn base(&self) -> *mut u8 {
    self.base
  }

  /// The bump boundary: first unused byte.
  pub fn top(&self) -> *mut u8 {
    unsafe { self.base.add(self.size) }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn size(&self) -> usize {
    self.size
  }

  pub fn occupancy(&self) -> usize {
    self.refs
  }

  /// Whether `p` points into this region's live span `[base, top)`.
  pub fn contains(&self, p: *const u8) -> bool {
    let addr = p as usize;
    addr >= self.base as usize && addr < self.top() as usize
  }

  /// Whether `n` fresh bytes fit before the end of the region.
  ///
  /// Strictly less-than: one byte of slack is always kept between the bump
  /// boundary and the end of the region, matching the conservative fit test
  /// this allocator has always used.
  pub fn fits(&self, n: usize) -> bool {
    self.size.checked_add(n).is_some_and(|total| total < self.capacity)
  }

  /// Same fit test for adjusting the current size by a signed `diff`.
  pub fn fits_resized(&self, diff: isize) -> bool {
    let resized = self.size as isize + diff;
    resized >= 0 && (resized as usize) < self.capacity
  }

  /// Moves the bump boundary by `diff` bytes. The caller must keep the
  /// result within `[0, capacity]`.
  pub fn resize(&mut self, diff: isize) {
    let resized = self.size as isize + diff;
    debug_assert!(resized >= 0, "region size underflow");
    debug_assert!(resized as usize <= self.capacity, "region size overflow");
    self.size = resized as usize;
  }

  /// Resets the bump boundary, making the whole capacity reusable at once.
  pub fn clear(&mut self) {
    self.size = 0;
  }

  pub fn incref(&mut self) {
    self.refs += 1;
  }

  pub fn decref(&mut self) {
    debug_assert!(self.refs > 0, "region occupancy underflow");
    self.refs = self.refs.saturating_sub(1);
  }

  pub fn is_unused(&self) -> bool {
    self.refs == 0
  }
}

impl<B: BackingStore> Drop for Region<B> {
  fn drop(&mut self) {
    log::trace!("region released: base = {:?}, capacity = {}", self.base, self.capacity);
    unsafe { B::release(self.base, self.capacity) };
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::HeapStore;

  #[test]
  fn capacity_never_below_default() {
    let small = Region::<HeapStore>::new(16);
    assert_eq!(small.capacity(), DEFAULT_CAPACITY);

    let large = Region::<HeapStore>::new(DEFAULT_CAPACITY * 3);
    assert_eq!(large.capacity(), DEFAULT_CAPACITY * 3);
  }

  #[test]
  fn fit_test_reserves_one_byte_of_slack() {
    let mut region = Region::<HeapStore>::new(0);

    assert!(region.fits(DEFAULT_CAPACITY - 1));
    assert!(!region.fits(DEFAULT_CAPACITY));

    region.resize(100);
    assert!(region.fits(DEFAULT_CAPACITY - 101));
    assert!(!region.fits(DEFAULT_CAPACITY - 100));
  }

  #[test]
  fn fit_test_survives_absurd_sizes() {
    let mut region = Region::<HeapStore>::new(0);
    region.resize(10);
    assert!(!region.fits(usize::MAX));
  }

  #[test]
  fn containment_covers_live_span_only() {
    let mut region = Region::<HeapStore>::new(0);
    let base = region.base();

    // Empty region has no live span at all.
    assert!(!region.contains(base));

    region.resize(64);
    assert!(region.contains(base));
    assert!(region.contains(unsafe { base.add(63) }));
    assert!(!region.contains(unsafe { base.add(64) }));
  }

  #[test]
  fn bump_boundary_moves_both_ways() {
    let mut region = Region::<HeapStore>::new(0);
    let base = region.base();

    region.resize(48);
    assert_eq!(region.top(), unsafe { base.add(48) });

    region.resize(-16);
    assert_eq!(region.top(), unsafe { base.add(32) });

    region.clear();
    assert_eq!(region.top(), base);
  }

  #[test]
  fn occupancy_tracks_live_allocations() {
    let mut region = Region::<HeapStore>::new(0);
    assert!(region.is_unused());

    region.incref();
    region.incref();
    assert!(!region.is_unused());

    region.decref();
    assert!(!region.is_unused());

    region.decref();
    assert!(region.is_unused());
  }
}
