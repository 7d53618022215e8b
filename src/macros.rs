//! Counter plumbing for the optional `stats` feature.
//!
//! `stat!(counter)` bumps a field of the global counter table by one;
//! `stat!(counter, n)` adds `n`. Both forms, argument expressions included,
//! compile away when the `stats` feature is disabled, so the realtime paths
//! carry no cost in a default build.

#[cfg(feature = "stats")]
#[macro_export]
macro_rules! stat {
    ($counter:ident) => {
        $crate::stat!($counter, 1)
    };
    ($counter:ident, $n:expr) => {{
        use ::core::sync::atomic::Ordering;
        $crate::stats::STATS.$counter.fetch_add($n as u64, Ordering::Relaxed);
    }};
}

#[cfg(not(feature = "stats"))]
#[macro_export]
macro_rules! stat {
    ($counter:ident) => {};
    ($counter:ident, $n:expr) => {};
}
