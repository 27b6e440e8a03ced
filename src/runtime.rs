/*
 * Process-wide scheduler state
 *
 * `GlobalRuntime` bundles everything the scheduler touches: the thread
 * table, ready queue, sleep wheel, current tid, configured quantum, and
 * the one stack whose free has been deferred to the next scheduler
 * entry (see §5's "deferred stack free" in the design notes). It lives
 * behind a single `static` cell, grounded on the teacher's
 * `static SCHEDULER: Mutex<Option<Scheduler>>` singleton — except there
 * is no `Mutex` here, because the Signal Gate already guarantees there
 * is never a second accessor: every caller of `init`/`with_runtime`
 * must hold the Gate first.
 */

use crate::context::Stack;
use crate::error::ThreadError;
use crate::ready_queue::ReadyQueue;
use crate::sleep_wheel::SleepWheel;
use crate::thread_table::{ThreadId, ThreadTable};
use std::cell::UnsafeCell;

pub struct GlobalRuntime {
    pub table: ThreadTable,
    pub ready: ReadyQueue,
    pub sleep: SleepWheel,
    pub current: ThreadId,
    pub quantum_usec: i64,
    /// Count of completed `schedule_core` entries (tick or yield). Used
    /// only to age `pending_free` — see its doc comment.
    pub entry_seq: u64,
    /// The exiting thread's own stack, tagged with `entry_seq` as it
    /// stood the moment `exit(self)` deferred it. A self-exit always
    /// triggers the very next scheduler entry itself (via
    /// `scheduler::yield_entry`), and that entry still runs on the
    /// exiting thread's own stack until its `context_switch` — so the
    /// tag lets that entry recognize "this is the stack I'm still
    /// standing on" and leave it alone. Only a *later* entry, once
    /// control has actually moved elsewhere, may free it.
    pub pending_free: Option<(Stack, u64)>,
}

impl GlobalRuntime {
    fn new(quantum_usec: i64) -> Self {
        Self {
            table: ThreadTable::new(),
            ready: ReadyQueue::new(),
            sleep: SleepWheel::new(),
            current: ThreadId::MAIN,
            quantum_usec,
            entry_seq: 0,
            pending_free: None,
        }
    }
}

struct RuntimeCell(UnsafeCell<Option<GlobalRuntime>>);

// SAFETY: the only accessors are `init` and `with_runtime`, and both
// require the caller to already hold the Signal Gate (see
// `signal_gate::GateGuard`) — there is never more than one live
// accessor, including the signal handler itself.
unsafe impl Sync for RuntimeCell {}

static RUNTIME: RuntimeCell = RuntimeCell(UnsafeCell::new(None));

/// Install the runtime for the lifetime of the process.
///
/// Caller must hold the Signal Gate.
pub fn init(quantum_usec: i64) -> Result<(), ThreadError> {
    // SAFETY: caller holds the Gate.
    let slot = unsafe { &mut *RUNTIME.0.get() };
    if slot.is_some() {
        return Err(ThreadError::AlreadyInitialized);
    }
    *slot = Some(GlobalRuntime::new(quantum_usec));
    Ok(())
}

pub fn is_initialized() -> bool {
    // SAFETY: a read of the discriminant only; racing with `init` is
    // impossible once every writer goes through the Gate, and this is
    // used only for the `AlreadyInitialized`/`NotInitialized` checks,
    // which re-verify under the Gate before acting.
    unsafe { (*RUNTIME.0.get()).is_some() }
}

/// Run `f` against the live runtime.
///
/// Caller must hold the Signal Gate. Returns `NotInitialized` if
/// `init` has not yet succeeded.
pub fn with_runtime<R>(f: impl FnOnce(&mut GlobalRuntime) -> R) -> Result<R, ThreadError> {
    // SAFETY: caller holds the Gate.
    let slot = unsafe { &mut *RUNTIME.0.get() };
    match slot {
        Some(rt) => Ok(f(rt)),
        None => Err(ThreadError::NotInitialized),
    }
}
