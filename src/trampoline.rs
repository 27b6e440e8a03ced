/*
 * Bootstrap Trampoline
 *
 * The landing pad for a thread's very first context switch. By the
 * time control reaches here, `Context::prepare_initial`'s fake call
 * frame has already done its job: this function is simply whatever
 * the switch "returned" into. From here on the thread runs like any
 * other — it is the scheduler's unmask-before-transfer (see
 * `scheduler::schedule_core`) that makes ticks live again.
 */

use crate::runtime;
use crate::signal_gate::GateGuard;

pub unsafe extern "C" fn bootstrap_trampoline() -> ! {
    let (tid, entry) = {
        let guard = GateGuard::acquire();
        let found = runtime::with_runtime(|rt| {
            let tid = rt.current;
            let entry = rt.table.get(tid).and_then(|slot| slot.entry);
            (tid, entry)
        })
        .expect("a thread cannot bootstrap before the runtime exists");
        drop(guard);
        found
    };

    let entry = entry.expect("a freshly created thread always has an entry procedure");
    entry();
    crate::exit(tid.as_i32());
    unreachable!("a thread's own exit(self) call never returns")
}
