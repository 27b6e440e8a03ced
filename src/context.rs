/*
 * Context Capture/Restore & Bootstrap Trampoline
 *
 * The spec's "two-return-value capture primitive" is classically built
 * on `sigsetjmp`/`siglongjmp`. This crate takes the alternative the
 * design notes explicitly allow: a hand-rolled stackful context switch,
 * grounded on the same technique the scheduler this crate descends
 * from already uses for its own (hardware-interrupt-driven) switch —
 * push the callee-saved registers the ABI doesn't already protect,
 * swap the stack pointer, pop the other thread's registers, resume.
 *
 * The difference from that interrupt-frame version: there is no
 * hardware-pushed `InterruptFrame` here, because nothing interrupts us
 * at the instruction level — `context_switch` is an ordinary function
 * call. A plain `ret` out of it is indistinguishable, to the caller,
 * from "the context was restored": the call returns exactly once, the
 * first time some other thread switches back into this exact call
 * site. That is the "second return" from `sigsetjmp` without needing
 * a branch on the return value at all.
 *
 * A freshly created thread has never executed `context_switch`, so
 * there is no call site to return into. Its `Context` is instead
 * hand-assembled by `Context::prepare_initial`: the new stack is
 * pre-populated so that switching into it for the first time behaves
 * exactly like `ret`-ing into `bootstrap_trampoline` (see
 * `crate::trampoline`).
 */

use crate::error::ThreadError;
use crate::STACK_BYTES;
use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;

#[cfg(not(target_arch = "x86_64"))]
compile_error!("uthreads' context switch is implemented for x86_64 only");

/// An owned, fixed-size, 16-byte-aligned stack.
///
/// Freed by `Drop`, except for the currently-exiting thread's own stack:
/// see `GlobalRuntime::pending_free` in `runtime.rs` for why that one is
/// deferred rather than dropped synchronously.
pub struct Stack {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Stack {
    pub fn allocate() -> Result<Self, ThreadError> {
        let layout =
            Layout::from_size_align(STACK_BYTES, 16).expect("STACK_BYTES/16 is a valid layout");
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc(layout) };
        let ptr = NonNull::new(raw).ok_or(ThreadError::StackAllocFailed)?;
        Ok(Self { ptr, layout })
    }

    /// One-past-the-end address: where a descending stack starts.
    fn top(&self) -> *mut u8 {
        // SAFETY: `len` bytes were allocated starting at `ptr`.
        unsafe { self.ptr.as_ptr().add(self.layout.size()) }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`layout` are exactly what `alloc` returned/used.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

/// Entry point a freshly created thread's first context switch lands on.
pub type TrampolineFn = unsafe extern "C" fn() -> !;

/// A saved machine context: just the stack pointer. Everything else a
/// resumed thread needs (callee-saved registers, return address) lives
/// on the stack that pointer refers to.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Context {
    rsp: *mut u8,
}

impl Context {
    /// A context that has never been captured. Used for the main
    /// thread before its first preemption and as a placeholder.
    pub const fn empty() -> Self {
        Self {
            rsp: std::ptr::null_mut(),
        }
    }

    /// Build the initial context for a thread that has never run.
    ///
    /// Writes a fake call frame at the top of `stack`: a return address
    /// of `trampoline`, and six zeroed callee-saved registers below it,
    /// laid out exactly as `context_switch`'s epilogue expects to find
    /// them. The arithmetic keeps `trampoline`'s effective entry RSP at
    /// `8 (mod 16)`, matching the x86-64 SysV convention for a function
    /// reached via `call`.
    pub fn prepare_initial(stack: &Stack, trampoline: TrampolineFn) -> Self {
        // SAFETY: `top` is 16-byte aligned (STACK_BYTES is a multiple of
        // 16) and at least 64 bytes of the allocation lie below it.
        unsafe {
            let top = stack.top();
            let ret_slot = top.sub(16).cast::<u64>();
            ret_slot.write_unaligned(trampoline as usize as u64);

            let regs_base = top.sub(64).cast::<u64>();
            for i in 0..6 {
                regs_base.add(i).write_unaligned(0);
            }

            Self {
                rsp: regs_base.cast::<u8>(),
            }
        }
    }
}

/// Switch from `current`'s stack to `next`'s stack.
///
/// Saves `rbx`/`rbp`/`r12`..`r15` (the registers the System V ABI
/// leaves to the callee to preserve) onto the departing thread's stack,
/// records the resulting `rsp` into `*current`, loads `rsp` from
/// `*next`, and restores that thread's registers before returning.
///
/// # Safety
/// `current` must point at a `Context` owned by the thread calling this
/// function, and `next` must point at a `Context` produced either by a
/// prior `context_switch` out of that thread or by
/// [`Context::prepare_initial`]. Both pointers must remain valid for
/// the duration of the call — in particular the stack `next` refers to
/// must still be allocated.
#[unsafe(naked)]
pub unsafe extern "C" fn context_switch(current: *mut Context, next: *const Context) {
    core::arch::naked_asm!(
        "push rbx",
        "push rbp",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov [rdi], rsp",
        "mov rsp, [rsi]",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbp",
        "pop rbx",
        "ret",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn stack_allocation_is_aligned_and_sized() {
        let stack = Stack::allocate().unwrap();
        assert_eq!(stack.layout.size(), STACK_BYTES);
        assert_eq!(stack.top() as usize % 16, 0);
    }

    static WORKER_RAN: AtomicBool = AtomicBool::new(false);
    static mut MAIN_CTX: Context = Context::empty();
    static mut WORKER_CTX: Context = Context::empty();

    unsafe extern "C" fn worker_entry() -> ! {
        WORKER_RAN.store(true, Ordering::SeqCst);
        // SAFETY: both statics are initialized by the test below before
        // this trampoline can possibly run, and this test is the only
        // one that touches them (see the `#[test]` attribute — cargo
        // runs unit tests of a lib crate in one process, but this
        // specific pair of statics is private to this function and
        // this one test exercises it).
        unsafe {
            context_switch(
                std::ptr::addr_of_mut!(WORKER_CTX),
                std::ptr::addr_of!(MAIN_CTX),
            );
        }
        unreachable!("main never switches back into a finished worker");
    }

    #[test]
    fn context_switch_reaches_trampoline_and_returns() {
        let stack = Stack::allocate().unwrap();
        // SAFETY: single-threaded test, statics written before any
        // switch, and `worker_entry` only ever switches back to
        // `MAIN_CTX` once it has been populated.
        unsafe {
            WORKER_CTX = Context::prepare_initial(&stack, worker_entry);
            context_switch(
                std::ptr::addr_of_mut!(MAIN_CTX),
                std::ptr::addr_of!(WORKER_CTX),
            );
        }
        assert!(WORKER_RAN.load(Ordering::SeqCst));
    }
}
