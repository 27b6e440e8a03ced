use std::process::Command;
use std::time::{Duration, Instant};

/// `exit(0)` terminates the whole process promptly, no matter what any
/// other thread is doing. Run as a child process (see
/// `src/bin/main_exit_demo.rs`): calling `exit(0)` from inside this
/// test binary would terminate the test harness itself.
#[test]
fn main_thread_exit_terminates_process_promptly() {
    let exe = env!("CARGO_BIN_EXE_main_exit_demo");

    let start = Instant::now();
    let output = Command::new(exe).output().expect("spawn fixture binary");
    let elapsed = start.elapsed();

    assert!(
        output.status.success(),
        "fixture binary exited with {:?}, stderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(
        elapsed < Duration::from_secs(5),
        "process did not terminate promptly: took {elapsed:?}"
    );
}
