/*
 * Error Taxonomy
 *
 * Every fallible operation inside the scheduler core returns a typed
 * `Result<T, ThreadError>` instead of threading `-1` through the call
 * chain by hand. The public API (see `lib.rs`) is the one place that
 * collapses `Err(_)` down to the spec's numeric `-1` contract.
 */

use thiserror::Error;

/// Everything that can go wrong inside the thread table, ready queue,
/// sleep wheel, or scheduler.
///
/// Variants map one-to-one onto the precondition-violation and
/// resource-exhaustion taxonomy: every public entry point that can fail
/// returns one of these before it mutates any shared state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ThreadError {
    /// A call was made before `system_init` succeeded.
    #[error("uthreads: system not initialized")]
    NotInitialized,

    /// `system_init` was called a second time.
    #[error("uthreads: system already initialized")]
    AlreadyInitialized,

    /// `quantum_usec` was outside `1..=1_000_000`.
    #[error("uthreads: invalid quantum {usecs} usec (must be 1..=1_000_000)")]
    InvalidQuantum { usecs: i64 },

    /// `create` was called with no free slot in the thread table.
    #[error("uthreads: thread table full")]
    NoFreeSlot,

    /// `tid` is outside the valid range `0..MAX_THREADS`.
    #[error("uthreads: tid {tid} out of range")]
    InvalidTid { tid: i32 },

    /// `tid` is in range but the slot is not currently occupied.
    #[error("uthreads: tid {tid} refers to an unoccupied slot")]
    SlotUnoccupied { tid: i32 },

    /// The operation is not allowed on the main thread (tid 0).
    #[error("uthreads: {op} is not permitted on the main thread")]
    MainThreadRestricted { op: &'static str },

    /// The stack allocator could not produce a new stack.
    #[error("uthreads: stack allocation failed")]
    StackAllocFailed,
}
