use crate::{request::RequestSlot, MAX_ENQUEUED_OPERATIONS};

/// Index of a slot inside a [`SlotArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotIndex(u8);

impl SlotIndex {
    fn get(self) -> usize {
        self.0 as usize
    }
}

/// Fixed set of request slots, each of them either in the free pool (LIFO) or in the pending
/// queue (FIFO).
///
/// Slots only enter the queue by leaving the pool, hence the queue can never outgrow the pool
/// capacity.
pub struct SlotArena {
    slots: [RequestSlot; MAX_ENQUEUED_OPERATIONS],
    free: Option<SlotIndex>,
    head: Option<SlotIndex>,
    tail: Option<SlotIndex>,
}

impl SlotArena {
    /// Creates the arena with every slot in the free pool.
    pub fn new() -> Self {
        let mut arena = Self {
            slots: std::array::from_fn(|_| RequestSlot::new()),
            free: None,
            head: None,
            tail: None,
        };
        for i in 0..MAX_ENQUEUED_OPERATIONS {
            arena.push_free(SlotIndex(i as u8));
        }
        arena
    }

    pub fn capacity(&self) -> usize {
        MAX_ENQUEUED_OPERATIONS
    }

    /// Takes a slot out of the free pool.
    pub fn pop_free(&mut self) -> Option<SlotIndex> {
        let index = self.free?;
        self.free = self.slots[index.get()].next.take();
        Some(index)
    }

    /// Gives a slot back to the free pool.
    pub fn push_free(&mut self, index: SlotIndex) {
        self.slots[index.get()].next = self.free;
        self.free = Some(index);
    }

    /// Appends a slot to the tail of the queue.
    pub fn push_back(&mut self, index: SlotIndex) {
        self.slots[index.get()].next = None;
        match self.tail {
            Some(tail) => self.slots[tail.get()].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
    }

    /// Removes the slot at the head of the queue.
    pub fn pop_front(&mut self) -> Option<SlotIndex> {
        let index = self.head?;
        self.head = self.slots[index.get()].next.take();
        if self.head.is_none() {
            self.tail = None;
        }
        Some(index)
    }

    pub fn slot(&self, index: SlotIndex) -> &RequestSlot {
        &self.slots[index.get()]
    }

    pub fn slot_mut(&mut self, index: SlotIndex) -> &mut RequestSlot {
        &mut self.slots[index.get()]
    }

    pub fn free_len(&self) -> usize {
        self.chain_len(self.free)
    }

    pub fn queued_len(&self) -> usize {
        self.chain_len(self.head)
    }

    fn chain_len(&self, mut cursor: Option<SlotIndex>) -> usize {
        let mut len = 0;
        while let Some(index) = cursor {
            len += 1;
            cursor = self.slots[index.get()].next;
        }
        len
    }
}

impl Default for SlotArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn enqueue(arena: &mut SlotArena, name: &str) -> Option<SlotIndex> {
        let index = arena.pop_free()?;
        assert!(arena.slot_mut(index).populate(1, name, &["", "", ""], "p"));
        arena.push_back(index);
        Some(index)
    }

    fn dequeue(arena: &mut SlotArena) -> Option<String> {
        let index = arena.pop_front()?;
        let name = arena.slot(index).name().to_owned();
        arena.push_free(index);
        Some(name)
    }

    #[test]
    fn test_initial_state() {
        let arena = SlotArena::new();
        assert_eq!(arena.capacity(), MAX_ENQUEUED_OPERATIONS);
        assert_eq!(arena.free_len(), MAX_ENQUEUED_OPERATIONS);
        assert_eq!(arena.queued_len(), 0);
    }

    #[test]
    fn test_fifo_order() {
        let mut arena = SlotArena::new();
        for name in ["a", "b", "c"] {
            enqueue(&mut arena, name).unwrap();
        }
        assert_eq!(dequeue(&mut arena).as_deref(), Some("a"));
        enqueue(&mut arena, "d").unwrap();
        assert_eq!(dequeue(&mut arena).as_deref(), Some("b"));
        assert_eq!(dequeue(&mut arena).as_deref(), Some("c"));
        assert_eq!(dequeue(&mut arena).as_deref(), Some("d"));
        assert_eq!(dequeue(&mut arena), None);
        assert_eq!(arena.free_len(), MAX_ENQUEUED_OPERATIONS);
    }

    #[test]
    fn test_exhaustion() {
        let mut arena = SlotArena::new();
        let mut taken = Vec::new();
        for i in 0..MAX_ENQUEUED_OPERATIONS {
            taken.push(enqueue(&mut arena, &i.to_string()).unwrap());
        }
        assert_eq!(enqueue(&mut arena, "overflow"), None);
        assert_eq!(arena.queued_len(), MAX_ENQUEUED_OPERATIONS);
        assert_eq!(arena.free_len(), 0);

        // Every slot is distinct
        for (i, a) in taken.iter().enumerate() {
            for b in &taken[i + 1..] {
                assert_ne!(a, b);
            }
        }

        dequeue(&mut arena).unwrap();
        assert!(enqueue(&mut arena, "again").is_some());
    }

    #[test]
    fn test_free_list_is_lifo() {
        let mut arena = SlotArena::new();
        let a = arena.pop_free().unwrap();
        let b = arena.pop_free().unwrap();
        arena.push_free(a);
        arena.push_free(b);
        assert_eq!(arena.pop_free(), Some(b));
        assert_eq!(arena.pop_free(), Some(a));
    }
}
