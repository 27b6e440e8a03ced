mod common;

use common::busy_wait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static PRE_PRINTED: AtomicBool = AtomicBool::new(false);
static POST_PRINTED: AtomicBool = AtomicBool::new(false);

fn sleeper() {
    PRE_PRINTED.store(true, Ordering::SeqCst);
    assert_eq!(uthreads::sleep_quantums(3), 0);
    POST_PRINTED.store(true, Ordering::SeqCst);
}

/// A thread sleeping for 3 quantums resumes only once 3 real ticks
/// have fired, not 3 scheduler *entries* of any kind. The sleeper's own
/// voluntary yield into `sleep_quantums` must not itself count as one
/// of those 3 — if it did (decrementing on every scheduler entry rather
/// than only on ticks), the thread would wake a full tick early. The
/// checkpoint below sits strictly between "woken on the 3rd tick"
/// (correct) and "woken on the 2nd tick" (the bug), so it fails loudly
/// if sleep accounting ever creeps back onto the yield path.
#[test]
fn sleeping_thread_resumes_after_its_quantums_elapse() {
    let quantum = Duration::from_micros(100_000);
    assert_eq!(uthreads::system_init(quantum.as_micros() as i64), 0);
    assert!(uthreads::create(sleeper) >= 0);

    busy_wait(quantum);
    assert!(PRE_PRINTED.load(Ordering::SeqCst));
    assert!(
        !POST_PRINTED.load(Ordering::SeqCst),
        "sleeper must not resume before its quantums elapse"
    );

    // Strictly between the 2nd and 3rd tick after the sleeper started
    // sleeping: a correct implementation is still waiting for its 3rd
    // tick here, while one that double-counts the sleeper's own yield
    // would already have woken it on the 2nd.
    busy_wait(quantum + quantum / 2);
    assert!(
        !POST_PRINTED.load(Ordering::SeqCst),
        "sleeper must not resume after only 2 ticks — its own yield into \
         sleep_quantums must not itself be charged as a tick"
    );

    busy_wait(quantum * 2);
    assert!(
        POST_PRINTED.load(Ordering::SeqCst),
        "sleeper must resume once its quantums have elapsed"
    );
}
