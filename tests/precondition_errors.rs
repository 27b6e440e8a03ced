/// Precondition violations return `-1` and never touch a thread's
/// state: blocking the main thread, sleeping the main thread, exiting
/// an unoccupied tid, and unblocking an unoccupied tid.
#[test]
fn invalid_operations_return_negative_one() {
    assert_eq!(uthreads::system_init(100_000), 0);

    assert_eq!(uthreads::block(0), -1, "the main thread cannot be blocked");
    assert_eq!(
        uthreads::sleep_quantums(1),
        -1,
        "the main thread cannot sleep"
    );
    assert_eq!(uthreads::exit(99), -1, "tid 99 was never created");
    assert_eq!(uthreads::unblock(99), -1, "tid 99 was never created");

    // None of the above should have disturbed the main thread.
    assert_eq!(uthreads::current_tid(), 0);
}
