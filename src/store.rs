use std::{alloc, process, ptr};

use libc::c_void;

/// Alignment of every backing block, equivalent to what `malloc` guarantees.
pub const BASE_ALIGN: usize = 16;

/// Source of raw memory pages underlying all regions.
///
/// Implementations are stateless strategies: both operations are associated
/// functions and the choice of strategy is a type parameter fixed at build
/// time, never switched at runtime.
///
/// Both operations always succeed from the caller's point of view. When the
/// environment cannot supply the memory, the provider terminates the process
/// with a diagnostic instead of returning an error, because region
/// construction has no way to proceed without it.
pub trait BackingStore {
  /// Commits `n` bytes of raw memory. Contents are unspecified.
  ///
  /// # Safety
  ///
  /// The returned block must eventually be passed back to [`release`] with
  /// the same `n`, exactly once.
  ///
  /// [`release`]: BackingStore::release
  unsafe fn acquire(n: usize) -> *mut u8;

  /// Returns `n` bytes previously obtained from [`acquire`].
  ///
  /// # Safety
  ///
  /// `base` must come from an `acquire(n)` call on the same strategy and
  /// must not be released twice.
  ///
  /// [`acquire`]: BackingStore::acquire
  unsafe fn release(base: *mut u8, n: usize);
}

fn exhausted(n: usize) -> ! {
  eprintln!("rarena: backing store exhausted while acquiring {n} bytes");
  process::abort()
}

/// Heap-delegating strategy: asks the global general-purpose allocator for
/// large blocks.
pub struct HeapStore;

impl BackingStore for HeapStore {
  unsafe fn acquire(n: usize) -> *mut u8 {
    let Ok(layout) = alloc::Layout::from_size_align(n, BASE_ALIGN) else {
      exhausted(n);
    };
    let base = unsafe { alloc::alloc(layout) };
    if base.is_null() {
      exhausted(n);
    }
    base
  }

  unsafe fn release(
    base: *mut u8,
    n: usize,
  ) {
    // The layout was validated during acquire.
    let layout = unsafe { alloc::Layout::from_size_align_unchecked(n, BASE_ALIGN) };
    unsafe { alloc::dealloc(base, layout) };
  }
}

/// Virtual-memory strategy: maps anonymous pages directly with `mmap(2)`.
pub struct VmStore;

impl BackingStore for VmStore {
  unsafe fn acquire(n: usize) -> *mut u8 {
    let base = unsafe {
      libc::mmap(
        ptr::null_mut(),
        n,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if base == libc::MAP_FAILED {
      exhausted(n);
    }

    base as *mut u8
  }

  unsafe fn release(
    base: *mut u8,
    n: usize,
  ) {
    unsafe { libc::munmap(base as *mut c_void, n) };
  }
}

/// Strategy used by the process-wide arena, selected by the `vm-store`
/// cargo feature.
#[cfg(not(feature = "vm-store"))]
pub type DefaultStore = HeapStore;

#[cfg(feature = "vm-store")]
pub type DefaultStore = VmStore;
