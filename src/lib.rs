//! # rarena - A Region-Based Memory Allocator Library
//!
//! This crate provides a **region allocator** (also known as an arena
//! allocator) that trades per-object reclamation precision for locality and
//! batch deallocation speed. It is meant for workloads dominated by many
//! short-lived, similarly-scoped allocations, not as a general `malloc`
//! replacement.
//!
//! ## Overview
//!
//! Memory is carved from coarse-grained backing pages into *regions*. Each
//! region is one contiguous block with a bump boundary and an occupancy
//! counter:
//!
//! ```text
//!   One Region:
//!
//!   ┌────┬────┬────┬──────────────────────────────────────────────┬─────┐
//!   │ A1 │ A2 │ A3 │                 Free Space                   │slack│
//!   └────┴────┴────┴──────────────────────────────────────────────┴─────┘
//!   ▲              ▲                                                    ▲
//!   │              │                                                    │
//!  base        top = base + size                        end = base + capacity
//!
//!   size      - bump offset, advances on allocation
//!   occupancy - number of live allocations (3 here)
//! ```
//!
//! Allocation bumps `top` forward: O(1) once a region is found. Freeing the
//! block at `top` moves the boundary back (LIFO reuse); freeing anything
//! else only drops the occupancy count. When occupancy reaches zero the
//! whole region is reclaimed in one step, regardless of internal
//! fragmentation:
//!
//! ```text
//!   Bulk reclamation:
//!
//!   ┌─────┬──────┬─────┬────────────┐        ┌──────────────────────────┐
//!   │ A1  │ dead │ A3  │    free    │   ──▶  │         all free         │
//!   └─────┴──────┴─────┴────────────┘        └──────────────────────────┘
//!    occupancy 2, A2 already freed            occupancy 0: size := 0
//!    (its bytes stay dead for now)            (once A1 and A3 are freed)
//! ```
//!
//! An arena keeps an append-only registry of regions. Requests are matched
//! first-fit in creation order, and a caller-supplied *hint* pointer biases
//! placement toward the region containing it, for locality of reference.
//! New regions are created on demand, sized at least [`DEFAULT_CAPACITY`]
//! bytes. A single mutex wraps every operation; there is no lock-free path.
//!
//! ## Crate Structure
//!
//! ```text
//!   rarena
//!   ├── store      - BackingStore trait, HeapStore and VmStore strategies
//!   ├── region     - Region: capacity, base, bump boundary, occupancy
//!   ├── registry   - Registry: first-fit search, on-demand creation
//!   ├── arena      - Arena: allocate/deallocate/reallocate under one lock
//!   └── adapter    - Allocator<T>: stateless typed handle over the global arena
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::ptr;
//! use rarena::Arena;
//!
//! fn main() {
//!     let arena: Arena = Arena::new();
//!
//!     unsafe {
//!         // Allocate 64 bytes, no placement hint.
//!         let p = arena.allocate(64, ptr::null());
//!
//!         // Use the memory.
//!         ptr::write_bytes(p, 0, 64);
//!
//!         // Grow it in place while it is still the top allocation.
//!         let p = arena.reallocate(p, 64, 128, ptr::null());
//!
//!         // Free it.
//!         arena.deallocate(p, 128);
//!     }
//! }
//! ```
//!
//! A process-wide instance is available through [`Arena::global`], and
//! [`Allocator`] is a zero-sized typed handle over it whose instances all
//! compare equal.
//!
//! ## Backing Stores
//!
//! Regions draw their memory from one of two interchangeable strategies,
//! chosen at build time via the `vm-store` cargo feature:
//!
//! - [`HeapStore`] (default) asks the general-purpose allocator for large
//!   blocks.
//! - [`VmStore`] maps anonymous pages directly with `mmap(2)`.
//!
//! Backing-store exhaustion is fatal: the process terminates with a
//! diagnostic, because region construction has no way to proceed without
//! the memory.
//!
//! ## Limitations
//!
//! - **Coarse reclamation**: freeing a non-top block inside an occupied
//!   region leaves its bytes unusable until the whole region drains.
//! - **Byte-granular bumping**: no per-type alignment is imposed; callers
//!   needing aligned storage must size requests accordingly.
//! - **One global lock**: correctness over scalability; every operation
//!   serializes.
//! - **Unix-oriented**: the `VmStore` strategy requires `mmap` (POSIX
//!   systems).
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! Callers must hand back the exact originally-requested size on
//! deallocation, and must treat pointers as invalidated by every
//! `reallocate` call, even when the same address is returned.

pub mod adapter;
pub mod arena;
pub mod region;
pub mod registry;
pub mod store;

pub use adapter::Allocator;
pub use arena::Arena;
pub use region::{DEFAULT_CAPACITY, Region};
pub use registry::Registry;
pub use store::{BackingStore, DefaultStore, HeapStore, VmStore};
