//! Build-time configuration constants.
//!
//! Generated by `build.rs` from `rtpool.toml` (path overridable through the
//! `RTPOOL_CONFIG` environment variable). The size classes a
//! [`SizedAllocator`](crate::SizedAllocator) offers are derived from these,
//! so changing them changes the crate's user-visible behaviour.

include!(concat!(env!("OUT_DIR"), "/config_gen.rs"));
