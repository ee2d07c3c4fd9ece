use std::ptr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::registry::Registry;
use crate::store::{BackingStore, DefaultStore};

/// The region-management engine.
///
/// An arena owns a registry of regions and exposes the three allocation
/// operations. Every entry point takes one process-wide-style mutex for its
/// whole duration, so calls are totally ordered across threads and no caller
/// ever observes a partially-mutated region. There is no per-region lock and
/// no lock-free fast path; arena allocation is rarely the contended hot path
/// and simplicity wins.
///
/// Dropping an arena releases every region's backing memory; that is the
/// only point at which regions are freed. The [`global`] instance is never
/// dropped and lives until process exit.
///
/// [`global`]: Arena::global
pub struct Arena<B: BackingStore = DefaultStore> {
  registry: Mutex<Registry<B>>,
}

impl Arena {
  /// The process-wide arena, initialized on first use.
  ///
  /// Its backing strategy is [`DefaultStore`]. Its regions are reclaimed by
  /// the operating system at process exit, never earlier.
  pub fn global() -> &'static Arena {
    static GLOBAL: OnceLock<Arena> = OnceLock::new();
    GLOBAL.get_or_init(Arena::new)
  }
}

impl<B: BackingStore> Arena<B> {
  pub fn new() -> Self {
    Self {
      registry: Mutex::new(Registry::new()),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Registry<B>> {
    // No operation can panic while holding the lock, so a poisoned mutex
    // still guards consistent state.
    self.registry.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Allocates `n` uninitialized bytes.
  ///
  /// Returns null when `n` is zero. A non-null `hint` biases placement
  /// toward the region containing it, for locality of reference.
  ///
  /// # Safety
  ///
  /// The returned pointer must be passed to [`deallocate`] or
  /// [`reallocate`] on this arena with the same `n`, at most once.
  ///
  /// [`deallocate`]: Arena::deallocate
  /// [`reallocate`]: Arena::reallocate
  pub unsafe fn allocate(
    &self,
    n: usize,
    hint: *const u8,
  ) -> *mut u8 {
    let mut registry = self.lock();
    allocate_in(&mut registry, n, hint)
  }

  /// Releases `n` bytes previously returned by [`allocate`].
  ///
  /// A null `p` is a no-op. A pointer not owned by any region is silently
  /// ignored rather than crashing on misuse, at the cost of masking bugs;
  /// a `debug!` line is emitted for anyone listening.
  ///
  /// # Safety
  ///
  /// `p` must be null or a live allocation from this arena, and `n` must be
  /// the exact size it was requested with.
  ///
  /// [`allocate`]: Arena::allocate
  pub unsafe fn deallocate(
    &self,
    p: *mut u8,
    n: usize,
  ) {
    if p.is_null() {
      return;
    }
    let mut registry = self.lock();
    deallocate_in(&mut registry, p, n);
  }

  /// Resizes an allocation from `from_n` to `to_n` bytes.
  ///
  /// A null `p` behaves as `allocate(to_n, hint)`; `to_n == 0` behaves as
  /// `deallocate(p, from_n)` and returns null. When `p` is the most recent
  /// allocation in its region and the adjusted size still fits, the bump
  /// boundary is moved in place and `p` comes back unchanged. A shrink that
  /// cannot happen in place is a no-op returning `p`. Anything else
  /// allocates fresh storage, copies `from_n` bytes and frees the old
  /// block. A pointer not owned by any region yields null.
  ///
  /// The original pointer is invalidated by every call, including the
  /// in-place path that returns the same address.
  ///
  /// # Safety
  ///
  /// `p` must be null or a live allocation from this arena sized exactly
  /// `from_n`, with at least `from_n` readable bytes behind it.
  pub unsafe fn reallocate(
    &self,
    p: *mut u8,
    from_n: usize,
    to_n: usize,
    hint: *const u8,
  ) -> *mut u8 {
    let mut registry = self.lock();
    unsafe { reallocate_in(&mut registry, p, from_n, to_n, hint) }
  }

  /// Number of regions created so far.
  pub fn region_count(&self) -> usize {
    self.lock().len()
  }
}

impl<B: BackingStore> Default for Arena<B> {
  fn default() -> Self {
    Self::new()
  }
}

fn allocate_in<B: BackingStore>(
  registry: &mut Registry<B>,
  n: usize,
  hint: *const u8,
) -> *mut u8 {
  if n == 0 {
    return ptr::null_mut();
  }

  let index = registry.find_fitting(n, hint);
  let region = registry.region_mut(index);

  let p = region.top();
  region.resize(n as isize);
  region.incref();
  p
}

fn deallocate_in<B: BackingStore>(
  registry: &mut Registry<B>,
  p: *mut u8,
  n: usize,
) {
  let Some(index) = registry.find_containing(p) else {
    log::debug!("deallocate: {p:?} is not owned by any region, ignoring");
    return;
  };
  let region = registry.region_mut(index);

  region.decref();
  if region.is_unused() {
    // Last live allocation gone: the whole capacity becomes reusable in
    // one step, regardless of internal fragmentation.
    region.clear();
  } else if (region.top() as usize).wrapping_sub(n) == p as usize {
    // Top block freed: recover the tail for stack-like usage patterns.
    region.resize(-(n as isize));
  }
}

unsafe fn reallocate_in<B: BackingStore>(
  registry: &mut Registry<B>,
  p: *mut u8,
  from_n: usize,
  to_n: usize,
  hint: *const u8,
) -> *mut u8 {
  if p.is_null() {
    return allocate_in(registry, to_n, hint);
  }

  let Some(index) = registry.find_containing(p) else {
    log::debug!("reallocate: {p:?} is not owned by any region, returning null");
    return ptr::null_mut();
  };

  if to_n == 0 {
    deallocate_in(registry, p, from_n);
    return ptr::null_mut();
  }

  let diff = to_n as isize - from_n as isize;
  let region = registry.region_mut(index);

  if (region.top() as usize).wrapping_sub(from_n) == p as usize && region.fits_resized(diff) {
    region.resize(diff);
    return p;
  }

  if to_n <= from_n {
    // Shrinking a non-top block never moves it; the tail bytes stay
    // counted as live until the whole block is freed.
    return p;
  }

  let new_p = allocate_in(registry, to_n, hint);
  unsafe { ptr::copy_nonoverlapping(p, new_p, from_n) };
  deallocate_in(registry, p, from_n);
  new_p
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::thread;

  use super::*;
  use crate::region::DEFAULT_CAPACITY;
  use crate::store::{HeapStore, VmStore};

  const NULL: *const u8 = ptr::null();

  fn arena() -> Arena<HeapStore> {
    Arena::new()
  }

  fn owner_of<B: BackingStore>(
    arena: &Arena<B>,
    p: *const u8,
  ) -> Option<usize> {
    arena.lock().find_containing(p)
  }

  #[test]
  fn live_allocations_never_overlap() {
    let arena = arena();
    let sizes = [1usize, 7, 64, 100, 4096, 13];

    let mut spans = Vec::new();
    for &n in &sizes {
      let p = unsafe { arena.allocate(n, NULL) };
      assert!(!p.is_null());
      spans.push((p as usize, n));
    }

    for (i, &(a, an)) in spans.iter().enumerate() {
      for &(b, bn) in &spans[i + 1..] {
        assert!(a + an <= b || b + bn <= a, "spans overlap");
      }
    }
  }

  #[test]
  fn zero_sized_allocation_is_null_under_both_stores() {
    unsafe {
      assert!(Arena::<HeapStore>::new().allocate(0, NULL).is_null());
      assert!(Arena::<VmStore>::new().allocate(0, NULL).is_null());
    }
  }

  #[test]
  fn vm_backed_arena_allocates_usable_memory() {
    let arena = Arena::<VmStore>::new();
    unsafe {
      let p = arena.allocate(256, NULL);
      ptr::write_bytes(p, 0x77, 256);
      assert_eq!(*p.add(255), 0x77);
      arena.deallocate(p, 256);
    }
  }

  #[test]
  fn null_deallocation_is_a_no_op() {
    let arena = arena();
    unsafe {
      arena.deallocate(ptr::null_mut(), 0);
      arena.deallocate(ptr::null_mut(), 4096);
    }
    assert_eq!(arena.region_count(), 0);
  }

  #[test]
  fn foreign_pointer_deallocation_is_ignored() {
    let arena = arena();
    let a = unsafe { arena.allocate(32, NULL) };

    let mut foreign = [0u8; 8];
    unsafe { arena.deallocate(foreign.as_mut_ptr(), 8) };

    // The live allocation is untouched.
    assert_eq!(owner_of(&arena, a), Some(0));
    unsafe { arena.deallocate(a, 32) };
  }

  #[test]
  fn top_block_is_reused_in_lifo_order() {
    let arena = arena();
    unsafe {
      let a = arena.allocate(40, NULL);
      let b = arena.allocate(24, NULL);
      assert_eq!(b as usize, a as usize + 40);

      arena.deallocate(b, 24);

      let c = arena.allocate(16, NULL);
      assert_eq!(c, b);
    }
  }

  #[test]
  fn freeing_everything_reclaims_the_whole_region() {
    let arena = arena();
    unsafe {
      let a = arena.allocate(100, NULL);
      let b = arena.allocate(200, NULL);
      let c = arena.allocate(300, NULL);

      // Free out of order; the middle bytes stay dead until occupancy
      // reaches zero.
      arena.deallocate(b, 200);
      arena.deallocate(a, 100);
      arena.deallocate(c, 300);

      let again = arena.allocate(50, NULL);
      assert_eq!(again, a);
    }
  }

  #[test]
  fn reallocate_null_behaves_as_allocate() {
    let arena = arena();
    unsafe {
      assert!(arena.reallocate(ptr::null_mut(), 0, 0, NULL).is_null());

      let p = arena.reallocate(ptr::null_mut(), 0, 64, NULL);
      assert!(!p.is_null());
      assert_eq!(owner_of(&arena, p), Some(0));

      // Placement honors the hint exactly like allocate does.
      let q = arena.reallocate(ptr::null_mut(), 0, 32, p);
      assert_eq!(owner_of(&arena, q), owner_of(&arena, p));
    }
  }

  #[test]
  fn reallocate_to_zero_frees_the_block() {
    let arena = arena();
    unsafe {
      let p = arena.allocate(128, NULL);
      assert!(arena.reallocate(p, 128, 0, NULL).is_null());

      // The block was at top of an otherwise-empty region, so its space
      // is immediately reusable.
      let q = arena.allocate(64, NULL);
      assert_eq!(q, p);
    }
  }

  #[test]
  fn top_block_grows_in_place_preserving_contents() {
    let arena = arena();
    unsafe {
      let p = arena.allocate(64, NULL);
      for i in 0..64 {
        *p.add(i) = i as u8;
      }

      let grown = arena.reallocate(p, 64, 96, NULL);
      assert_eq!(grown, p);
      for i in 0..64 {
        assert_eq!(*grown.add(i), i as u8);
      }

      // The next allocation lands right after the grown block.
      let next = arena.allocate(8, NULL);
      assert_eq!(next as usize, grown as usize + 96);
    }
  }

  #[test]
  fn top_block_shrinks_in_place() {
    let arena = arena();
    unsafe {
      let p = arena.allocate(96, NULL);
      let shrunk = arena.reallocate(p, 96, 32, NULL);
      assert_eq!(shrunk, p);

      let next = arena.allocate(8, NULL);
      assert_eq!(next as usize, p as usize + 32);
    }
  }

  #[test]
  fn buried_block_grows_by_moving() {
    let arena = arena();
    unsafe {
      let a = arena.allocate(64, NULL);
      for i in 0..64 {
        *a.add(i) = 0xC0 ^ i as u8;
      }
      let b = arena.allocate(16, NULL);

      let moved = arena.reallocate(a, 64, 128, NULL);
      assert_ne!(moved, a);
      for i in 0..64 {
        assert_eq!(*moved.add(i), 0xC0 ^ i as u8);
      }

      arena.deallocate(b, 16);
      arena.deallocate(moved, 128);
    }
  }

  #[test]
  fn buried_block_shrink_is_a_no_op() {
    let arena = arena();
    unsafe {
      let a = arena.allocate(64, NULL);
      let _b = arena.allocate(16, NULL);

      assert_eq!(arena.reallocate(a, 64, 32, NULL), a);
    }
  }

  #[test]
  fn foreign_pointer_reallocation_returns_null() {
    let arena = arena();
    let mut foreign = [0u8; 8];
    let p = unsafe { arena.reallocate(foreign.as_mut_ptr(), 8, 16, NULL) };
    assert!(p.is_null());
  }

  #[test]
  fn hint_places_allocation_in_the_same_region() {
    let arena = arena();
    unsafe {
      // Fill most of the first region, then force a second one.
      let a = arena.allocate(3000, NULL);
      let b = arena.allocate(2000, NULL);
      assert_eq!(arena.region_count(), 2);
      assert_ne!(owner_of(&arena, a), owner_of(&arena, b));

      // First fit would pick a's region; the hint overrides it.
      let hinted = arena.allocate(100, b);
      assert_eq!(owner_of(&arena, hinted), owner_of(&arena, b));
      assert_eq!(hinted as usize, b as usize + 2000);

      let unhinted = arena.allocate(100, NULL);
      assert_eq!(owner_of(&arena, unhinted), owner_of(&arena, a));
    }
  }

  #[test]
  fn churn_within_one_region_never_grows_the_arena() {
    let arena = arena();
    unsafe {
      for _ in 0..10_000 {
        let a = arena.allocate(512, NULL);
        let b = arena.allocate(1024, NULL);
        arena.deallocate(a, 512);
        arena.deallocate(b, 1024);
      }
    }
    assert_eq!(arena.region_count(), 1);
  }

  #[test]
  fn concurrent_stress_keeps_regions_consistent() {
    let arena = Arc::new(Arena::<HeapStore>::new());
    let threads = 4;
    let rounds = 2000;

    let handles: Vec<_> = (0..threads)
      .map(|t| {
        let arena = Arc::clone(&arena);
        thread::spawn(move || unsafe {
          for i in 0..rounds {
            let n = 16 + (t * 31 + i * 7) % 240;
            let p = arena.allocate(n, NULL);
            ptr::write_bytes(p, t as u8, n);

            if i % 3 == 0 {
              let p = arena.reallocate(p, n, n + 8, NULL);
              assert_eq!(*p, t as u8);
              arena.deallocate(p, n + 8);
            } else {
              assert_eq!(*p.add(n - 1), t as u8);
              arena.deallocate(p, n);
            }
          }
        })
      })
      .collect();

    for handle in handles {
      handle.join().unwrap();
    }

    let registry = arena.lock();
    for region in registry.regions() {
      assert!(region.size() <= region.capacity());
      assert_eq!(region.occupancy(), 0);
    }
  }

  #[test]
  fn global_arena_is_shared_and_usable() {
    unsafe {
      let p = Arena::global().allocate(24, NULL);
      assert!(!p.is_null());
      ptr::write_bytes(p, 0x11, 24);
      Arena::global().deallocate(p, 24);
    }
  }

  #[test]
  fn oversized_allocation_gets_its_own_region() {
    let arena = arena();
    let big = DEFAULT_CAPACITY * 4;
    unsafe {
      let p = arena.allocate(big, NULL);
      assert!(!p.is_null());
      ptr::write_bytes(p, 0xEE, big);
      assert_eq!(*p.add(big - 1), 0xEE);

      let registry = arena.lock();
      let index = registry.find_containing(p).unwrap();
      assert_eq!(registry.region(index).capacity(), big);
    }
  }
}
