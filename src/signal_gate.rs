/*
 * Signal Gate
 *
 * The library's single critical section: masking `SIGVTALRM` around any
 * read or write to the thread table, ready queue, sleep wheel, or
 * scheduler globals. There is never a second accessor while the mask is
 * up, so this is the only synchronization `GlobalRuntime` needs — no
 * mutex, grounded on the same reasoning the teacher's scheduler uses
 * for its own interrupt-masked sections.
 */

use std::mem;
use std::mem::MaybeUninit;

fn vtalrm_set() -> libc::sigset_t {
    unsafe {
        let mut set = MaybeUninit::<libc::sigset_t>::uninit();
        libc::sigemptyset(set.as_mut_ptr());
        libc::sigaddset(set.as_mut_ptr(), libc::SIGVTALRM);
        set.assume_init()
    }
}

/// RAII guard: while held, `SIGVTALRM` is blocked. Unmasks on `Drop`.
///
/// The one exception is the scheduler's transfer step, which calls
/// [`GateGuard::release_for_transfer`] instead of letting `Drop` run: by
/// that point the new *current tid* and its `Running` state are already
/// recorded, but the thread being jumped to runs on a different call
/// stack that will never execute this guard's destructor, so the
/// guard is consumed with `mem::forget` right after the manual unmask.
pub struct GateGuard {
    _private: (),
}

impl GateGuard {
    /// Block `SIGVTALRM`, returning a guard that unmasks it on drop.
    pub fn acquire() -> Self {
        let set = vtalrm_set();
        unsafe {
            libc::sigprocmask(libc::SIG_BLOCK, &set, std::ptr::null_mut());
        }
        Self { _private: () }
    }

    /// Unmask now and consume the guard without running `Drop`.
    ///
    /// Used immediately before a context transfer: unmask must happen
    /// on this stack, before control leaves it, but the guard itself
    /// must not run its (redundant, and by then meaningless) `Drop`
    /// unmask on whatever stack next resumes through this exact call
    /// site.
    pub fn release_for_transfer(self) {
        unmask_vtalrm();
        mem::forget(self);
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        unmask_vtalrm();
    }
}

fn unmask_vtalrm() {
    let set = vtalrm_set();
    unsafe {
        libc::sigprocmask(libc::SIG_UNBLOCK, &set, std::ptr::null_mut());
    }
}

/// Arm the periodic virtual-time tick at `quantum_usec` and install
/// `handler` as the `SIGVTALRM` action. Ticks are delivered unmasked
/// from this point; callers typically mask immediately and only unmask
/// when ready (the Scheduler's transfer step does this on `init`'s
/// behalf via the first tick).
pub fn arm_timer(quantum_usec: i64, handler: extern "C" fn(i32)) {
    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        action.sa_sigaction = handler as usize;
        libc::sigemptyset(&mut action.sa_mask);
        action.sa_flags = libc::SA_RESTART;
        libc::sigaction(libc::SIGVTALRM, &action, std::ptr::null_mut());

        let interval = libc::timeval {
            tv_sec: (quantum_usec / 1_000_000) as libc::time_t,
            tv_usec: (quantum_usec % 1_000_000) as libc::suseconds_t,
        };
        let timer = libc::itimerval {
            it_interval: interval,
            it_value: interval,
        };
        libc::setitimer(libc::ITIMER_VIRTUAL, &timer, std::ptr::null_mut());
    }
}
