//! End-to-end dispatcher scenarios on a single thread.

use rtpool::SizedAllocator;

#[test]
fn cold_start_allocates_largest_size() {
    let alloc = SizedAllocator::new(10000, 2, 4, false).unwrap();
    let p = unsafe { alloc.allocate(10000) };
    assert!(!p.is_null());
    unsafe { SizedAllocator::deallocate(p) };
    assert!(unsafe { alloc.allocate(100_000) }.is_null());
}

#[test]
fn round_trips_across_all_classes() {
    let alloc = SizedAllocator::new(16000, 2, 4, false).unwrap();
    let header = core::mem::size_of::<*const rtpool::Pool>();
    let base = rtpool::config::BASE_CLASS_SIZE - rtpool::config::CLASS_SLACK;
    let sizes = [
        1,
        base - header,
        base - header + 1,
        2 * rtpool::config::BASE_CLASS_SIZE - rtpool::config::CLASS_SLACK - header,
        16000,
    ];
    for size in sizes {
        for _ in 0..3 {
            let p = unsafe { alloc.allocate(size) };
            assert!(!p.is_null(), "allocate({size}) failed");
            unsafe {
                *p = 0x5A;
                if size > 0 {
                    *p.add(size - 1) = 0xA5;
                }
                SizedAllocator::deallocate(p);
            }
        }
    }
    for i in 0..alloc.pool_count() {
        assert_eq!(alloc.pool(i).in_use(), 0);
    }
}

#[test]
fn churn_with_periodic_replenish() {
    // Interleaved allocate/deallocate/replenish on one thread, the
    // non-thread-safe discipline. The live set forces classes to run dry
    // between replenish passes; every failure must be transient.
    let alloc = SizedAllocator::new(8000, 2, 6, false).unwrap();
    let sizes: &[usize] = &[24, 500, 916, 1800, 3500, 7900];
    let mut live: Vec<(*mut u8, usize)> = Vec::new();

    for round in 0..200 {
        for (i, &size) in sizes.iter().enumerate() {
            let p = unsafe { alloc.allocate(size) };
            if p.is_null() {
                // Class ran dry; the next replenish pass must restore it.
                unsafe { alloc.replenish() };
                let p = unsafe { alloc.allocate(size) };
                assert!(!p.is_null(), "round {round}: class for {size} not refilled");
                live.push((p, size));
            } else {
                live.push((p, size));
            }
            if (round + i) % 3 == 0 {
                let (victim, _) = live.swap_remove((round * 7 + i) % live.len());
                unsafe { SizedAllocator::deallocate(victim) };
            }
        }
        if round % 10 == 0 {
            unsafe { alloc.replenish() };
        }
    }

    for (p, _) in live.drain(..) {
        unsafe { SizedAllocator::deallocate(p) };
    }

    // Accounting holds for every class once the dust settles.
    for i in 0..alloc.pool_count() {
        let pool = alloc.pool(i);
        assert_eq!(pool.in_use(), 0);
        assert_eq!(
            pool.free_count() + pool.staged_count(),
            pool.os_blocks(),
            "class {i} leaked or double-freed"
        );
    }

    // Draining passes bring every class back between the water marks.
    for _ in 0..8 {
        unsafe { alloc.replenish() };
    }
    for i in 0..alloc.pool_count() {
        let pool = alloc.pool(i);
        assert!(pool.os_blocks() >= 2 && pool.os_blocks() <= 6 + 1);
    }
}

#[test]
fn construction_failure_is_clean() {
    // A max size this large cannot be covered by the class table; the error
    // must surface before any pool exists.
    assert!(SizedAllocator::new(usize::MAX / 2, 1, 2, false).is_err());
}
