/*
 * Scheduler core
 *
 * One algorithm, two entry points. `tick_entry` is installed as the
 * `SIGVTALRM` handler and runs it on whichever thread the signal
 * interrupted; `yield_entry` is called synchronously by `block`,
 * `sleep_quantums`, and `exit` after the caller already recorded its
 * own new state. The five steps below are shared between them, matching
 * the teacher's own split between a timer-interrupt path and its
 * scheduling core — except sleep accounting (step 1), which only a real
 * tick may perform; see `schedule_core`'s `from_tick` parameter.
 */

use crate::context::{context_switch, Context};
use crate::runtime;
use crate::signal_gate::GateGuard;
use crate::thread_table::{ThreadId, ThreadState};
use log::{error, trace};

pub extern "C" fn tick_entry(_signum: i32) {
    schedule_core(true);
}

pub fn yield_entry() {
    schedule_core(false);
}

fn schedule_core(from_tick: bool) {
    let guard = GateGuard::acquire();

    let transfer = runtime::with_runtime(|rt| {
        let this_entry = rt.entry_seq;
        rt.entry_seq = rt.entry_seq.wrapping_add(1);

        // Reap whatever an earlier exit() deferred, but only once it is
        // provably dead: a self-exit tags its own stack with the entry
        // count as it stood *before* the very entry that self-exit goes
        // on to trigger (see `GlobalRuntime::pending_free`), so a tag
        // equal to `this_entry` means "that's the stack we are still
        // standing on right now" — freeing it here, mid-entry, would be
        // a use-after-free on our own call frame. Only a strictly later
        // entry, reached after the transfer below has actually handed
        // control to someone else, may free it.
        if rt
            .pending_free
            .as_ref()
            .is_some_and(|&(_, tagged_at)| tagged_at < this_entry)
        {
            rt.pending_free = None;
        }

        // 1. Sleep accounting. Only on a real tick: a thread that
        // yields voluntarily (block/sleep/exit on itself) must not
        // charge every other sleeper's countdown for an event that
        // never happened.
        if from_tick {
            let blocked: Vec<ThreadId> = rt
                .table
                .occupied()
                .filter(|slot| slot.state == ThreadState::Blocked)
                .map(|slot| slot.id)
                .collect();
            for tid in rt.sleep.tick(blocked.into_iter()) {
                if let Some(slot) = rt.table.get_mut(tid) {
                    slot.state = ThreadState::Ready;
                }
                rt.ready.enqueue(tid, &rt.table);
                trace!("{tid} woke from sleep");
            }
        }

        // 2. Preempt the current thread, unless it already recorded a
        // voluntary state change (Blocked) before calling us.
        let current = rt.current;
        let still_running = rt
            .table
            .get(current)
            .is_some_and(|slot| slot.state == ThreadState::Running);
        if still_running {
            if let Some(slot) = rt.table.get_mut(current) {
                slot.state = ThreadState::Ready;
            }
            rt.ready.enqueue(current, &rt.table);
        }

        // 3. Capture: a pointer to save the departing context into, or
        // `None` if `current`'s slot was already vacated by a self-exit.
        let current_ctx_ptr: Option<*mut Context> = rt
            .table
            .get_mut(current)
            .map(|slot| &mut slot.context as *mut Context);

        // 4. Pick next.
        let next = match rt.ready.pop_next_live(&rt.table) {
            Some(tid) => tid,
            None => {
                error!("no runnable thread remains; terminating");
                std::process::exit(0);
            }
        };

        // 5. Transfer bookkeeping (the actual jump happens after we
        // release the Gate, below).
        rt.current = next;
        let slot = rt
            .table
            .get_mut(next)
            .expect("a tid popped from the ready queue is occupied");
        slot.state = ThreadState::Running;
        let first_run = !slot.context_valid;
        slot.context_valid = true;
        let next_ctx_ptr: *const Context = &slot.context as *const Context;

        if first_run {
            trace!("{current} -> {next} (bootstrapping)");
        } else {
            trace!("{current} -> {next}");
        }

        (current_ctx_ptr, next_ctx_ptr)
    });

    let (current_ctx_ptr, next_ctx_ptr) = match transfer {
        Ok(pair) => pair,
        Err(_) => return,
    };

    // Unmask now, on this stack, before control leaves it for good —
    // the thread we are about to resume may never run this guard's
    // `Drop`, so the guard must be consumed without it.
    guard.release_for_transfer();

    let mut discard = Context::empty();
    let dest = current_ctx_ptr.unwrap_or(std::ptr::addr_of_mut!(discard));

    // SAFETY: `dest` is either the departing thread's own saved-context
    // slot or a throwaway local (self-exit case, never read again).
    // `next_ctx_ptr` refers to a context either captured on a previous
    // switch out of `next`, or hand-assembled by
    // `Context::prepare_initial`, and its stack remains allocated until
    // a later scheduler entry reaps it.
    unsafe {
        context_switch(dest, next_ctx_ptr);
    }
}
