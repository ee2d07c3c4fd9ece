use crate::region::Region;
use crate::store::BackingStore;

/// Append-only, creation-ordered collection of regions.
///
/// Regions are never removed or reordered and their backing addresses never
/// overlap or move, so index-based lookups stay valid for the lifetime of
/// the registry. A plain linear scan is enough for both queries below: the
/// design assumes few, large regions.
pub struct Registry<B: BackingStore> {
  regions: Vec<Region<B>>,
}

impl<B: BackingStore> Registry<B> {
  pub fn new() -> Self {
    Self {
      regions: Vec::with_capacity(4),
    }
  }

  pub fn region(&self, index: usize) -> &Region<B> {
    &self.regions[index]
  }

  pub fn region_mut(&mut self, index: usize) -> &mut Region<B> {
    &mut self.regions[index]
  }

  pub fn regions(&self) -> &[Region<B>] {
    &self.regions
  }

  pub fn len(&self) -> usize {
    self.regions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.regions.is_empty()
  }

  /// Finds the region whose live span contains `p`, if any.
  pub fn find_containing(&self, p: *const u8) -> Option<usize> {
    self.regions.iter().position(|region| region.contains(p))
  }

  /// Finds a region with room for `n` more bytes, creating one if needed.
  ///
  /// A non-null `hint` biases placement toward the region containing it;
  /// otherwise the first fitting region in creation order wins (first fit,
  /// not best fit). When nothing fits, a fresh region sized for the request
  /// is appended and returned; a region created for an oversized request is
  /// used as-is even though it keeps no slack byte.
  pub fn find_fitting(
    &mut self,
    n: usize,
    hint: *const u8,
  ) -> usize {
    if !hint.is_null()
      && let Some(index) = self.find_containing(hint)
      && self.regions[index].fits(n)
    {
      return index;
    }

    if let Some(index) = self.regions.iter().position(|region| region.fits(n)) {
      return index;
    }

    self.regions.push(Region::new(n));
    self.regions.len() - 1
  }
}
