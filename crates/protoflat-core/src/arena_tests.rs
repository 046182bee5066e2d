use std::cell::RefCell;
use std::rc::Rc;

use super::*;

#[test]
fn allocate_returns_zeroed_aligned_memory() {
    let arena = Arena::new();
    let ptr = arena.allocate(64, 16).unwrap();

    assert_eq!(ptr.as_ptr() as usize % 16, 0);
    let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 64) };
    assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn allocate_zero_bytes() {
    let arena = Arena::new();
    assert!(arena.allocate(0, 8).is_ok());
}

#[test]
fn alloc_bytes_copies() {
    let arena = Arena::new();
    let ptr = arena.alloc_bytes(b"hello").unwrap();
    let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 5) };
    assert_eq!(bytes, b"hello");
}

#[test]
fn limit_turns_into_alloc_error() {
    let arena = Arena::with_limit(1024);
    let err = arena.allocate(1 << 20, 8).unwrap_err();

    assert_eq!(err.size, 1 << 20);
    assert_eq!(
        err.to_string(),
        "arena allocation of 1048576 bytes (align 8) failed"
    );
}

#[test]
fn bad_alignment_is_an_error() {
    let arena = Arena::new();
    assert!(arena.allocate(8, 3).is_err());
}

#[test]
fn cleanups_run_in_reverse_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    {
        let arena = Arena::new();
        for i in 0..3 {
            let log = Rc::clone(&log);
            arena.register_cleanup(move || log.borrow_mut().push(i));
        }
        assert!(log.borrow().is_empty());
    }
    assert_eq!(*log.borrow(), vec![2, 1, 0]);
}

#[test]
fn alloc_value_drops_on_release() {
    let marker = Rc::new(());
    {
        let arena = Arena::new();
        let ptr = arena.alloc_value(Rc::clone(&marker)).unwrap();
        assert_eq!(Rc::strong_count(&marker), 2);
        assert!(Rc::ptr_eq(unsafe { ptr.as_ref() }, &marker));
    }
    assert_eq!(Rc::strong_count(&marker), 1);
}

#[test]
fn fuse_keeps_other_region_alive() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let a = Arena::new();
    let b = Arena::new();
    {
        let log = Rc::clone(&log);
        b.register_cleanup(move || log.borrow_mut().push("b"));
    }
    a.fuse(&b);
    drop(b);
    assert!(log.borrow().is_empty());

    drop(a);
    assert_eq!(*log.borrow(), vec!["b"]);
}

#[test]
fn fuse_is_idempotent_and_transitive() {
    let a = Arena::new();
    let b = Arena::new();
    let c = Arena::new();
    assert!(!a.is_fused(&b));

    a.fuse(&b);
    a.fuse(&b);
    b.fuse(&a);
    assert!(a.is_fused(&b));
    assert!(!a.is_fused(&c));

    c.fuse(&b);
    assert!(a.is_fused(&c));
    assert!(c.is_fused(&a));
}

#[test]
fn space_allocated_covers_fused_group() {
    let a = Arena::new();
    let b = Arena::new();
    a.allocate(4096, 8).unwrap();
    b.allocate(4096, 8).unwrap();

    let alone = a.space_allocated();
    assert!(alone >= 4096);

    a.fuse(&b);
    assert!(a.space_allocated() >= alone + 4096);
    assert_eq!(a.space_allocated(), b.space_allocated());
}

#[test]
fn reusable_block_is_shared_until_rejected() {
    let arena = Arena::new();
    let first = arena.reusable_block(1, 32, 8, |_| true).unwrap();
    assert_eq!(arena.reusable_block(1, 32, 8, |_| true).unwrap(), first);

    // Same key, different shape.
    let wider = arena.reusable_block(1, 64, 8, |_| true).unwrap();
    assert_ne!(wider, first);

    let replaced = arena.reusable_block(1, 32, 8, |ptr| ptr != first).unwrap();
    assert_ne!(replaced, first);
    assert_eq!(arena.reusable_block(1, 32, 8, |_| true).unwrap(), replaced);
}

#[test]
fn retired_block_is_not_handed_out_again() {
    let arena = Arena::new();
    let first = arena.reusable_block(7, 16, 8, |_| true).unwrap();
    arena.retire_block(7, 16, 8, first);
    assert_ne!(arena.reusable_block(7, 16, 8, |_| true).unwrap(), first);
}
