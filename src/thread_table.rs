/*
 * Thread Table
 *
 * A fixed-capacity array of thread slots, indexed by tid. This is the
 * single source of truth for "does this tid exist, and what state is
 * it in" — the ready queue and sleep wheel both refer to slots here by
 * id rather than duplicating any of this data.
 */

use crate::context::{Context, Stack};
use crate::error::ThreadError;
use crate::trampoline::bootstrap_trampoline;
use crate::MAX_THREADS;
use core::fmt;

/// Thread identifier: the slot's own index in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub usize);

impl ThreadId {
    /// The main thread always occupies tid 0.
    pub const MAIN: ThreadId = ThreadId(0);

    pub fn as_i32(self) -> i32 {
        self.0 as i32
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tid{}", self.0)
    }
}

/// Execution state of an occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Ready,
    Running,
    Blocked,
}

/// A single thread's control block.
pub struct ThreadSlot {
    pub id: ThreadId,
    pub state: ThreadState,
    /// Entry procedure; `None` for the main thread, which never bootstraps.
    pub entry: Option<fn()>,
    /// Owned stack; `None` for the main thread, which runs on the
    /// process's original stack.
    pub stack: Option<Stack>,
    /// Saved machine context, restored the next time this thread runs.
    pub context: Context,
    /// `true` once `context` has been captured at least once.
    pub context_valid: bool,
}

impl ThreadSlot {
    fn main_thread() -> Self {
        Self {
            id: ThreadId::MAIN,
            state: ThreadState::Running,
            entry: None,
            stack: None,
            context: Context::empty(),
            context_valid: true,
        }
    }

    /// A freshly created thread's context is pre-assembled to land on
    /// the bootstrap trampoline the first time it is switched into —
    /// there is no earlier `context_switch` call for it to "return"
    /// into, unlike every subsequent capture (see `context.rs`).
    fn new_ready(id: ThreadId, entry: fn(), stack: Stack) -> Self {
        let context = Context::prepare_initial(&stack, bootstrap_trampoline);
        Self {
            id,
            state: ThreadState::Ready,
            entry: Some(entry),
            stack: Some(stack),
            context,
            context_valid: false,
        }
    }
}

/// Fixed-size table of `MAX_THREADS` slots.
///
/// Slot 0 is reserved for the main thread and is populated by
/// `ThreadTable::new`; it is never vacated by `vacate` (see `exit`'s
/// special-casing of tid 0 in `lib.rs`).
pub struct ThreadTable {
    slots: [Option<ThreadSlot>; MAX_THREADS],
}

impl ThreadTable {
    pub fn new() -> Self {
        const NONE: Option<ThreadSlot> = None;
        let mut slots = [NONE; MAX_THREADS];
        slots[0] = Some(ThreadSlot::main_thread());
        Self { slots }
    }

    /// Lowest unused index `>= 1`, or `None` if the table is full.
    pub fn find_free_slot(&self) -> Option<ThreadId> {
        (1..MAX_THREADS).find(|&i| self.slots[i].is_none()).map(ThreadId)
    }

    pub fn is_occupied(&self, tid: ThreadId) -> bool {
        self.slots.get(tid.0).is_some_and(Option::is_some)
    }

    pub fn get(&self, tid: ThreadId) -> Option<&ThreadSlot> {
        self.slots.get(tid.0)?.as_ref()
    }

    pub fn get_mut(&mut self, tid: ThreadId) -> Option<&mut ThreadSlot> {
        self.slots.get_mut(tid.0)?.as_mut()
    }

    /// Create a new `Ready` slot for `entry`, returning its tid.
    pub fn create(&mut self, entry: fn(), stack: Stack) -> Result<ThreadId, ThreadError> {
        let tid = self.find_free_slot().ok_or(ThreadError::NoFreeSlot)?;
        self.slots[tid.0] = Some(ThreadSlot::new_ready(tid, entry, stack));
        Ok(tid)
    }

    /// Mark a slot unused, returning the stack it owned (if any) so the
    /// caller can decide when it is safe to free.
    pub fn vacate(&mut self, tid: ThreadId) -> Option<Stack> {
        self.slots.get_mut(tid.0)?.take().and_then(|slot| slot.stack)
    }

    /// Iterate over every occupied slot.
    pub fn occupied(&self) -> impl Iterator<Item = &ThreadSlot> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn is_main(tid: ThreadId) -> bool {
        tid == ThreadId::MAIN
    }
}

impl Default for ThreadTable {
    fn default() -> Self {
        Self::new()
    }
}
