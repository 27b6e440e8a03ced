/*
 * Ready Queue
 *
 * Strict FIFO of tids waiting for the CPU. Kept as a flat `VecDeque`
 * sized once at construction, mirroring the scheduler's own
 * `VecDeque<ThreadId>` ready structure: no per-tick allocation, O(1)
 * push/pop at both ends.
 */

use crate::thread_table::{ThreadId, ThreadState, ThreadTable};
use crate::MAX_THREADS;
use std::collections::VecDeque;

pub struct ReadyQueue {
    queue: VecDeque<ThreadId>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::with_capacity(MAX_THREADS),
        }
    }

    /// Append `tid` iff it is occupied, `Ready`, and not already queued.
    /// Silently returns otherwise — callers never need to pre-check.
    pub fn enqueue(&mut self, tid: ThreadId, table: &ThreadTable) {
        let is_ready = table.get(tid).is_some_and(|slot| slot.state == ThreadState::Ready);
        if is_ready && !self.queue.contains(&tid) {
            self.queue.push_back(tid);
        }
    }

    /// Pop from the front, skipping any tid whose slot has since become
    /// unoccupied or left the `Ready` state (it may have raced with an
    /// `exit` from elsewhere in the same critical section).
    pub fn pop_next_live(&mut self, table: &ThreadTable) -> Option<ThreadId> {
        while let Some(tid) = self.queue.pop_front() {
            if let Some(slot) = table.get(tid) {
                if slot.state == ThreadState::Ready {
                    return Some(tid);
                }
            }
        }
        None
    }

    /// Remove every occurrence of `tid` (used by `exit` on a non-current
    /// thread that may still be sitting in the queue).
    pub fn remove(&mut self, tid: ThreadId) {
        self.queue.retain(|&queued| queued != tid);
    }

    pub fn contains(&self, tid: ThreadId) -> bool {
        self.queue.contains(&tid)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Stack;

    fn noop() {}

    fn table_with(n: usize) -> (ThreadTable, Vec<ThreadId>) {
        let mut table = ThreadTable::new();
        let ids = (0..n)
            .map(|_| table.create(noop, Stack::allocate().unwrap()).unwrap())
            .collect();
        (table, ids)
    }

    #[test]
    fn enqueue_is_idempotent() {
        let (table, ids) = table_with(1);
        let mut q = ReadyQueue::new();
        q.enqueue(ids[0], &table);
        q.enqueue(ids[0], &table);
        q.enqueue(ids[0], &table);
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_next_live(&table), Some(ids[0]));
        assert_eq!(q.pop_next_live(&table), None);
    }

    #[test]
    fn fifo_order_preserved() {
        let (table, ids) = table_with(3);
        let mut q = ReadyQueue::new();
        for &id in &ids {
            q.enqueue(id, &table);
        }
        assert_eq!(q.pop_next_live(&table), Some(ids[0]));
        assert_eq!(q.pop_next_live(&table), Some(ids[1]));
        assert_eq!(q.pop_next_live(&table), Some(ids[2]));
    }

    #[test]
    fn pop_next_live_skips_vacated_slots() {
        let (mut table, ids) = table_with(3);
        let mut q = ReadyQueue::new();
        for &id in &ids {
            q.enqueue(id, &table);
        }
        table.vacate(ids[0]);
        assert_eq!(q.pop_next_live(&table), Some(ids[1]));
    }

    #[test]
    fn pop_next_live_skips_non_ready_state() {
        let (mut table, ids) = table_with(2);
        let mut q = ReadyQueue::new();
        for &id in &ids {
            q.enqueue(id, &table);
        }
        table.get_mut(ids[0]).unwrap().state = ThreadState::Blocked;
        assert_eq!(q.pop_next_live(&table), Some(ids[1]));
    }

    #[test]
    fn remove_drops_every_occurrence() {
        let (table, ids) = table_with(2);
        let mut q = ReadyQueue::new();
        q.enqueue(ids[0], &table);
        q.enqueue(ids[1], &table);
        q.remove(ids[0]);
        assert!(!q.contains(ids[0]));
        assert_eq!(q.pop_next_live(&table), Some(ids[1]));
    }
}
