//! LRU Recency List Module
//!
//! Arena of cache entries threaded by a doubly-linked list in recency order.
//! Every stored entry lives in exactly one slot and is addressed by a stable
//! [`Handle`] that the indices hold on to.

// == Handle ==
/// Stable position of an entry in the recency list arena.
///
/// A handle stays valid until its entry is removed; the slot may then be
/// reused by a later insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(usize);

const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<V> {
    value: V,
    prev: usize,
    next: usize,
}

// == Recency List ==
/// Tracks access order for LRU eviction.
///
/// - Head = most recently used
/// - Tail = least recently used
///
/// Push, move-to-front and remove are all O(1).
#[derive(Debug)]
pub struct RecencyList<V> {
    slots: Vec<Option<Node<V>>>,
    /// Vacant slot indices available for reuse
    free: Vec<usize>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<V> Default for RecencyList<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RecencyList<V> {
    // == Constructor ==
    /// Creates a new empty recency list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    // == Push Front ==
    /// Stores a value as the most recently used entry.
    pub fn push_front(&mut self, value: V) -> Handle {
        let node = Node {
            value,
            prev: NIL,
            next: self.head,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        self.link_before_head(idx);
        self.len += 1;
        Handle(idx)
    }

    // == Move To Front ==
    /// Marks an entry as most recently used.
    ///
    /// Returns false if the handle does not refer to a live entry.
    pub fn move_to_front(&mut self, handle: Handle) -> bool {
        let idx = handle.0;
        if !self.contains(handle) {
            return false;
        }
        if self.head != idx {
            self.unlink(idx);
            let head = self.head;
            if let Some(node) = self.node_mut(idx) {
                node.prev = NIL;
                node.next = head;
            }
            self.link_before_head(idx);
        }
        true
    }

    // == Remove ==
    /// Detaches an entry and returns its value.
    pub fn remove(&mut self, handle: Handle) -> Option<V> {
        let idx = handle.0;
        if !self.contains(handle) {
            return None;
        }
        self.unlink(idx);
        let node = self.slots[idx].take()?;
        self.free.push(idx);
        self.len -= 1;
        Some(node.value)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used entry.
    pub fn pop_back(&mut self) -> Option<V> {
        let tail = self.back()?;
        self.remove(tail)
    }

    /// Handle of the most recently used entry.
    pub fn front(&self) -> Option<Handle> {
        (self.head != NIL).then_some(Handle(self.head))
    }

    /// Handle of the least recently used entry.
    pub fn back(&self) -> Option<Handle> {
        (self.tail != NIL).then_some(Handle(self.tail))
    }

    pub fn get(&self, handle: Handle) -> Option<&V> {
        self.node(handle.0).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut V> {
        self.node_mut(handle.0).map(|node| &mut node.value)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.node(handle.0).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every entry and releases the arena.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.len = 0;
    }

    // == Iteration ==
    /// Iterates from most to least recently used.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    fn node(&self, idx: usize) -> Option<&Node<V>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node<V>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    /// Makes a detached node (whose `next` already points at the old head) the new head.
    fn link_before_head(&mut self, idx: usize) {
        let old_head = self.head;
        match self.node_mut(old_head) {
            Some(node) => node.prev = idx,
            None => self.tail = idx,
        }
        self.head = idx;
    }

    fn unlink(&mut self, idx: usize) {
        let Some((prev, next)) = self.node(idx).map(|node| (node.prev, node.next)) else {
            return;
        };
        match self.node_mut(prev) {
            Some(node) => node.next = next,
            None => self.head = next,
        }
        match self.node_mut(next) {
            Some(node) => node.prev = prev,
            None => self.tail = prev,
        }
    }
}

// == Iterator ==
/// Head-to-tail iterator over a [`RecencyList`].
pub struct Iter<'a, V> {
    list: &'a RecencyList<V>,
    cursor: usize,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.cursor)?;
        self.cursor = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
