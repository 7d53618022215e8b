//! Steady-state stress with fill-pattern corruption detection.
//!
//! A realtime thread performs paired allocate/deallocate traffic while a
//! background thread replenishes on a timer. Blocks are filled with a
//! pattern derived from their address so any use-after-free, double-free or
//! overlap between blocks shows up as a pattern mismatch.

use rtpool::{Pool, SizedAllocator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Fill a buffer with a deterministic pattern derived from its address.
fn fill_pattern(ptr: *mut u8, size: usize) {
    let seed = ptr as usize ^ size;
    for i in 0..size {
        unsafe {
            *ptr.add(i) = ((seed.wrapping_add(i).wrapping_mul(0x9E37_79B9)) & 0xFF) as u8;
        }
    }
}

/// Verify the fill pattern. Returns true if intact.
fn check_pattern(ptr: *mut u8, size: usize) -> bool {
    let seed = ptr as usize ^ size;
    for i in 0..size {
        let expected = ((seed.wrapping_add(i).wrapping_mul(0x9E37_79B9)) & 0xFF) as u8;
        if unsafe { *ptr.add(i) } != expected {
            return false;
        }
    }
    true
}

#[test]
fn steady_state_never_starves() {
    let alloc = SizedAllocator::new(4096, 16, 32, true).unwrap();
    let stop = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            while !stop.load(Ordering::Acquire) {
                unsafe { alloc.replenish() };
                thread::sleep(Duration::from_millis(1));
            }
        });

        // Realtime role: paired traffic never drops the free inventory below
        // the low mark minus one, so no request may fail.
        let size = 64;
        for i in 0..200_000 {
            let p = unsafe { alloc.allocate(size) };
            assert!(!p.is_null(), "starved at iteration {i}");
            fill_pattern(p, size);
            assert!(check_pattern(p, size), "corruption at iteration {i}");
            unsafe { SizedAllocator::deallocate(p) };
        }
        stop.store(true, Ordering::Release);
    });

    // OS traffic is bounded by the water marks, not by the iteration count.
    for i in 0..alloc.pool_count() {
        let pool = alloc.pool(i);
        assert_eq!(pool.in_use(), 0);
        assert!(
            pool.os_blocks() <= 16 + 32,
            "class {i} inventory grew unbounded: {}",
            pool.os_blocks()
        );
    }

    // Drain: with no realtime traffic the replenisher alone settles the
    // inventory between the marks, then teardown frees everything.
    for _ in 0..4 {
        unsafe { alloc.replenish() };
    }
    for i in 0..alloc.pool_count() {
        let pool = alloc.pool(i);
        let inventory = pool.free_count() + pool.staged_count();
        assert!(
            inventory <= 32 + 1,
            "class {i} not drained: {inventory} blocks"
        );
    }
}

#[test]
fn cross_thread_pattern_verification() {
    // The realtime role stays on one thread (allocate and deallocate), but
    // block contents cross to a checker thread and back, exercising the
    // publication of adopted blocks.
    let alloc = SizedAllocator::new(2048, 8, 16, true).unwrap();
    let stop = AtomicBool::new(false);
    let sizes: &[usize] = &[16, 64, 256, 900];
    let ops = 5_000usize;

    thread::scope(|s| {
        s.spawn(|| {
            while !stop.load(Ordering::Acquire) {
                unsafe { alloc.replenish() };
                thread::sleep(Duration::from_micros(500));
            }
        });

        let (to_checker, from_rt) = mpsc::channel::<(usize, usize)>();
        let (to_rt, from_checker) = mpsc::channel::<usize>();

        let checker = s.spawn(move || {
            let mut checked = 0usize;
            for (addr, size) in from_rt {
                let ptr = addr as *mut u8;
                assert!(
                    check_pattern(ptr, size),
                    "cross-thread corruption at item {checked}"
                );
                to_rt.send(addr).unwrap();
                checked += 1;
            }
            checked
        });

        let mut in_flight: std::collections::HashMap<usize, usize> =
            std::collections::HashMap::new();
        for i in 0..ops {
            let size = sizes[i % sizes.len()];
            let p = unsafe { alloc.allocate(size) };
            assert!(!p.is_null(), "starved at op {i}");
            fill_pattern(p, size);
            in_flight.insert(p as usize, size);
            to_checker.send((p as usize, size)).unwrap();

            // Deallocate whatever the checker has finished with.
            while let Ok(addr) = from_checker.try_recv() {
                in_flight.remove(&addr);
                unsafe { SizedAllocator::deallocate(addr as *mut u8) };
            }
        }
        drop(to_checker);
        assert_eq!(checker.join().unwrap(), ops);

        // Reap the stragglers.
        while let Ok(addr) = from_checker.recv() {
            in_flight.remove(&addr);
            unsafe { SizedAllocator::deallocate(addr as *mut u8) };
        }
        assert!(in_flight.is_empty());
        stop.store(true, Ordering::Release);
    });

    for i in 0..alloc.pool_count() {
        assert_eq!(alloc.pool(i).in_use(), 0);
    }
}

#[test]
fn bare_pool_blocking_startup_then_realtime() {
    // Startup path uses the blocking allocator to pull more blocks than the
    // low mark holds; steady state then runs entirely on recycled blocks.
    let pool = Pool::new(512, 4, 8, true).unwrap();

    let mut held = Vec::new();
    for _ in 0..8 {
        let p = unsafe { pool.allocate_blocking() };
        assert!(!p.is_null());
        fill_pattern(p, 512);
        held.push(p);
    }
    assert_eq!(pool.in_use(), 8);

    for p in &held {
        assert!(check_pattern(*p, 512));
    }
    for p in held {
        unsafe { pool.deallocate(p) };
    }
    assert_eq!(pool.in_use(), 0);

    let before = pool.os_blocks();
    for _ in 0..10_000 {
        let p = unsafe { pool.allocate() };
        assert!(!p.is_null());
        unsafe { pool.deallocate(p) };
    }
    assert_eq!(pool.os_blocks(), before, "steady state must not touch the OS");
}
