//! Error types for the non-realtime construction paths.
//!
//! Realtime operations never return a `Result`; they signal failure with a
//! null pointer so nothing heavier than a sentinel crosses the RT boundary.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The operating-system allocator refused a request. Fatal when raised
    /// from pool or dispatcher construction; replenishment absorbs it
    /// silently and retries on its next pass.
    #[error("operating system allocator refused {bytes} bytes")]
    OutOfMemory { bytes: usize },

    /// Covering `max_size` would need more size classes than the platform
    /// (or the configured cap) supports.
    #[error("max payload {max_size} exceeds the supported size-class range")]
    TooManyClasses { max_size: usize },
}

pub type Result<T> = core::result::Result<T, Error>;
