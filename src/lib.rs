//! A user-level cooperative-preemptive threading library.
//!
//! `uthreads` multiplexes any number of user threads (up to
//! [`MAX_THREADS`]) onto the single kernel thread the process already
//! has, using a periodic virtual-time signal for preemption and an
//! explicit context switch for everything else. There is no kernel
//! involvement beyond the timer and signal delivery: scheduling,
//! blocking, and sleeping are all decided in userspace.
//!
//! Call [`system_init`] once before anything else. From then on,
//! [`create`] starts new threads, [`exit`] tears them down, [`block`]
//! and [`unblock`] suspend and resume them voluntarily, and
//! [`sleep_quantums`] suspends the caller for a fixed number of ticks.
//! Every function returns `-1` on precondition failure and a
//! non-negative value on success (`create` returns the new thread's
//! id; everything else returns `0`).

mod context;
mod error;
mod ready_queue;
mod runtime;
mod scheduler;
mod signal_gate;
mod sleep_wheel;
mod thread_table;
mod trampoline;

use context::Stack;
use error::ThreadError;
use log::{debug, warn};
use thread_table::{ThreadId, ThreadState, ThreadTable};

/// Fixed capacity of the thread table. The source's choice of 10 is
/// arbitrary; this is a compile-time constant rather than a runtime
/// parameter because the table, ready queue, and sleep wheel are all
/// sized from it at construction.
pub const MAX_THREADS: usize = 10;

/// Size, in bytes, of every thread's stack.
pub const STACK_BYTES: usize = 4096;

const MIN_QUANTUM_USEC: i64 = 1;
const MAX_QUANTUM_USEC: i64 = 1_000_000;

fn resolve_tid(tid: i32) -> Result<ThreadId, ThreadError> {
    if tid < 0 || tid as usize >= MAX_THREADS {
        return Err(ThreadError::InvalidTid { tid });
    }
    Ok(ThreadId(tid as usize))
}

fn finish(result: Result<i32, ThreadError>) -> i32 {
    match result {
        Ok(code) => code,
        Err(err) => {
            warn!("{err}");
            -1
        }
    }
}

/// Initialize the library: install the tick handler and arm the
/// virtual-time timer at `quantum_usec` microseconds. Must be called
/// exactly once, before any other function in this crate.
///
/// Returns `0` on success, `-1` if already initialized or if
/// `quantum_usec` is outside `1..=1_000_000`.
pub fn system_init(quantum_usec: i64) -> i32 {
    finish((|| -> Result<i32, ThreadError> {
        if !(MIN_QUANTUM_USEC..=MAX_QUANTUM_USEC).contains(&quantum_usec) {
            return Err(ThreadError::InvalidQuantum {
                usecs: quantum_usec,
            });
        }

        let guard = signal_gate::GateGuard::acquire();
        runtime::init(quantum_usec)?;
        drop(guard);

        signal_gate::arm_timer(quantum_usec, scheduler::tick_entry);
        debug!("system_init: quantum={quantum_usec}us, max_threads={MAX_THREADS}");
        Ok(0)
    })())
}

/// Return the tid of the currently running thread.
///
/// Not part of the spec's minimal six-function surface, but present in
/// the original implementation (`get_current_tid`) and restored here:
/// a nullary `entry` has no other way to learn its own tid in order to
/// `block`/`exit` itself, since `fn()` entries take no arguments.
pub fn current_tid() -> i32 {
    let guard = signal_gate::GateGuard::acquire();
    let tid = runtime::with_runtime(|rt| rt.current.as_i32()).unwrap_or(-1);
    drop(guard);
    tid
}

/// Create a new thread running `entry`, returning its tid.
///
/// The new thread starts `Ready` and joins the back of the ready
/// queue; it does not run until the scheduler picks it.
pub fn create(entry: fn()) -> i32 {
    finish((|| -> Result<i32, ThreadError> {
        let guard = signal_gate::GateGuard::acquire();
        let tid = runtime::with_runtime(|rt| -> Result<ThreadId, ThreadError> {
            let stack = Stack::allocate()?;
            let tid = rt.table.create(entry, stack)?;
            rt.ready.enqueue(tid, &rt.table);
            Ok(tid)
        })??;
        drop(guard);
        debug!("{tid} created");
        Ok(tid.as_i32())
    })())
}

/// Destroy thread `tid`. Destroying tid `0` (the main thread)
/// terminates the whole process, regardless of any other thread's
/// state. Destroying the calling thread enters the scheduler and does
/// not return.
pub fn exit(tid: i32) -> i32 {
    finish((|| -> Result<i32, ThreadError> {
        let guard = signal_gate::GateGuard::acquire();
        let target = resolve_tid(tid)?;

        if ThreadTable::is_main(target) {
            drop(guard);
            debug!("main thread exited; terminating process");
            std::process::exit(0);
        }

        let is_current = runtime::with_runtime(|rt| -> Result<bool, ThreadError> {
            if !rt.table.is_occupied(target) {
                return Err(ThreadError::SlotUnoccupied { tid });
            }
            let is_current = rt.current == target;
            rt.ready.remove(target);
            let freed = rt.table.vacate(target);
            if is_current {
                // This stack is live for the rest of this call and for
                // the scheduler entry `yield_entry` below is about to
                // enter (that entry runs on this very stack, right up
                // to its `context_switch`). Tag the deferred free with
                // the current entry count so `schedule_core` can tell
                // "this is the entry the exiting thread itself
                // triggered" (must not free) from "a later entry, once
                // control is provably elsewhere" (safe to free).
                rt.pending_free = freed.map(|stack| (stack, rt.entry_seq));
            }
            Ok(is_current)
        })??;
        debug!("tid{tid} exited");

        if is_current {
            drop(guard);
            scheduler::yield_entry();
            unreachable!("exit(self) never returns");
        }

        Ok(0)
    })())
}

/// Move thread `tid` to the `Blocked` state. Blocking the calling
/// thread enters the scheduler; this call returns once some other
/// thread calls `unblock` on it. `tid` must not be the main thread.
pub fn block(tid: i32) -> i32 {
    finish((|| -> Result<i32, ThreadError> {
        let guard = signal_gate::GateGuard::acquire();
        let target = resolve_tid(tid)?;
        if ThreadTable::is_main(target) {
            return Err(ThreadError::MainThreadRestricted { op: "block" });
        }

        let is_current = runtime::with_runtime(|rt| -> Result<bool, ThreadError> {
            let slot = rt
                .table
                .get_mut(target)
                .ok_or(ThreadError::SlotUnoccupied { tid })?;
            slot.state = ThreadState::Blocked;
            Ok(rt.current == target)
        })??;
        debug!("tid{tid} blocked");

        if is_current {
            drop(guard);
            scheduler::yield_entry();
        }
        Ok(0)
    })())
}

/// Move thread `tid` to the `Ready` state and clear any pending sleep.
/// A no-op returning success if `tid` is not currently `Blocked` — the
/// caller never has to check first.
pub fn unblock(tid: i32) -> i32 {
    finish((|| -> Result<i32, ThreadError> {
        let guard = signal_gate::GateGuard::acquire();
        let target = resolve_tid(tid)?;

        runtime::with_runtime(|rt| -> Result<(), ThreadError> {
            let slot = rt
                .table
                .get_mut(target)
                .ok_or(ThreadError::SlotUnoccupied { tid })?;
            if slot.state == ThreadState::Blocked {
                slot.state = ThreadState::Ready;
                rt.sleep.clear(target);
                rt.ready.enqueue(target, &rt.table);
                debug!("tid{tid} unblocked");
            }
            Ok(())
        })??;
        drop(guard);
        Ok(0)
    })())
}

/// Block the calling thread for at least `n` quantum ticks. `n` must
/// be positive and the caller must not be the main thread. Returns
/// after at least `n` ticks have elapsed (at most `n + 1`, given at
/// least one other runnable thread).
pub fn sleep_quantums(n: i32) -> i32 {
    finish((|| -> Result<i32, ThreadError> {
        if n <= 0 {
            return Err(ThreadError::InvalidQuantum { usecs: n as i64 });
        }

        let guard = signal_gate::GateGuard::acquire();
        let current = runtime::with_runtime(|rt| rt.current)?;
        if ThreadTable::is_main(current) {
            return Err(ThreadError::MainThreadRestricted {
                op: "sleep_quantums",
            });
        }

        runtime::with_runtime(|rt| {
            if let Some(slot) = rt.table.get_mut(current) {
                slot.state = ThreadState::Blocked;
            }
            rt.sleep.set(current, n as u32);
        })?;
        debug!("{current} sleeping for {n} quantums");

        drop(guard);
        scheduler::yield_entry();
        Ok(0)
    })())
}
