mod common;

use common::busy_wait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static A1_PRINTED: AtomicBool = AtomicBool::new(false);
static A2_PRINTED: AtomicBool = AtomicBool::new(false);

fn worker_a() {
    A1_PRINTED.store(true, Ordering::SeqCst);
    let self_tid = uthreads::current_tid();
    assert_eq!(uthreads::block(self_tid), 0);
    A2_PRINTED.store(true, Ordering::SeqCst);
}

#[test]
fn block_then_unblock_resumes_the_thread() {
    assert_eq!(uthreads::system_init(100_000), 0);
    let tid = uthreads::create(worker_a);
    assert!(tid >= 0);

    busy_wait(Duration::from_millis(300));
    assert!(
        A1_PRINTED.load(Ordering::SeqCst),
        "A should have printed before blocking itself"
    );
    assert!(
        !A2_PRINTED.load(Ordering::SeqCst),
        "A should still be blocked"
    );

    assert_eq!(uthreads::unblock(tid), 0);

    busy_wait(Duration::from_millis(300));
    assert!(
        A2_PRINTED.load(Ordering::SeqCst),
        "A should resume once unblocked"
    );
}
