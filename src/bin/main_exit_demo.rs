// Fixture binary for the "main thread exit" end-to-end scenario:
// `exit(0)` must terminate the process promptly no matter what any
// other thread is doing. Run from `tests/main_thread_exit.rs` as a
// child process, since calling it from inside the test harness would
// terminate the harness itself.

use std::time::{Duration, Instant};

fn busy_wait(d: Duration) {
    let start = Instant::now();
    while start.elapsed() < d {
        std::hint::spin_loop();
    }
}

fn runs_forever() {
    loop {
        std::hint::spin_loop();
    }
}

fn main() {
    assert_eq!(uthreads::system_init(100_000), 0);
    assert!(uthreads::create(runs_forever) >= 0);

    busy_wait(Duration::from_millis(250));

    uthreads::exit(0);
    unreachable!("exit(0) terminates the process before this line ever runs");
}
