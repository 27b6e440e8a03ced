// Shared by the end-to-end scenario tests. Real `std::thread::sleep`
// would block the process without charging it any CPU time, and
// `ITIMER_VIRTUAL` only ever counts CPU time actually spent running —
// so "wait for N quantums to pass" means burn CPU, not block on the
// clock.
use std::time::{Duration, Instant};

pub fn busy_wait(d: Duration) {
    let start = Instant::now();
    while start.elapsed() < d {
        std::hint::spin_loop();
    }
}
