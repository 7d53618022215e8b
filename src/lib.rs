#![no_std]

//! rtpool: a realtime-safe memory pool allocator.
//!
//! Two layers:
//! - [`Pool`]: a single-size free-list allocator whose hot paths never call
//!   the OS allocator and never block. A non-realtime replenisher keeps the
//!   free inventory between configurable water marks, handing blocks over
//!   through a staging list that the realtime side adopts under `try_lock`.
//! - [`SizedAllocator`]: a size-class dispatcher over a geometric family of
//!   pools. Each handed-out block carries a hidden back-reference to its
//!   owning pool, so deallocation needs only the user pointer.
//!
//! # Usage
//!
//! ```ignore
//! let alloc = rtpool::SizedAllocator::new(16384, 16, 32, true)?;
//! // realtime thread:
//! let p = unsafe { alloc.allocate(64) };
//! unsafe { rtpool::SizedAllocator::deallocate(p) };
//! // background thread, periodically:
//! unsafe { alloc.replenish() };
//! ```

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

mod block;
pub mod config;
pub mod error;
pub mod platform;
pub mod pool;
pub mod sized;
#[cfg(feature = "stats")]
pub mod stats;

mod macros;

pub use error::Error;
pub use pool::Pool;
pub use sized::SizedAllocator;
