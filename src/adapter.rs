use std::marker::PhantomData;
use std::{fmt, mem, ptr};

use crate::arena::Arena;

/// Stateless, typed allocation handle over the process-wide arena.
///
/// All instances of `Allocator<T>` are interchangeable and compare equal, so
/// memory allocated through one handle can be deallocated through any other.
/// Sizes are expressed in elements of `T` and converted to bytes before
/// reaching the arena.
pub struct Allocator<T> {
  _marker: PhantomData<T>,
}

impl<T> Allocator<T> {
  pub const fn new() -> Self {
    Self {
      _marker: PhantomData,
    }
  }

  /// Allocates uninitialized storage for `n` elements.
  ///
  /// Returns null when `n` is zero or the byte size does not fit in
  /// `usize`. A non-null `hint` biases placement toward the region
  /// containing it.
  ///
  /// # Safety
  ///
  /// Same contract as [`Arena::allocate`], with sizes in elements.
  pub unsafe fn allocate(
    &self,
    n: usize,
    hint: *const T,
  ) -> *mut T {
    let Some(bytes) = n.checked_mul(mem::size_of::<T>()) else {
      return ptr::null_mut();
    };
    unsafe { Arena::global().allocate(bytes, hint.cast()).cast() }
  }

  /// Deallocates storage for `n` elements previously returned by
  /// [`allocate`]. Null is a no-op.
  ///
  /// # Safety
  ///
  /// Same contract as [`Arena::deallocate`], with sizes in elements.
  ///
  /// [`allocate`]: Allocator::allocate
  pub unsafe fn deallocate(
    &self,
    p: *mut T,
    n: usize,
  ) {
    let Some(bytes) = n.checked_mul(mem::size_of::<T>()) else {
      return;
    };
    unsafe { Arena::global().deallocate(p.cast(), bytes) };
  }

  /// Resizes previously allocated storage from `from_n` to `to_n` elements.
  ///
  /// The original pointer is invalidated by every call, even when the same
  /// address comes back.
  ///
  /// # Safety
  ///
  /// Same contract as [`Arena::reallocate`], with sizes in elements.
  pub unsafe fn reallocate(
    &self,
    p: *mut T,
    from_n: usize,
    to_n: usize,
    hint: *const T,
  ) -> *mut T {
    let size = mem::size_of::<T>();
    let (Some(from), Some(to)) = (from_n.checked_mul(size), to_n.checked_mul(size)) else {
      return ptr::null_mut();
    };
    unsafe { Arena::global().reallocate(p.cast(), from, to, hint.cast()).cast() }
  }
}

impl<T> Clone for Allocator<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for Allocator<T> {}

impl<T> Default for Allocator<T> {
  fn default() -> Self {
    Self::new()
  }
}

// Manual impl: the handle is zero-sized, deriving would demand `T: Debug`.
impl<T> fmt::Debug for Allocator<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Allocator")
  }
}

impl<T> PartialEq for Allocator<T> {
  fn eq(&self, _: &Self) -> bool {
    true
  }
}

impl<T> Eq for Allocator<T> {}
