//! Index-based doubly-linked lists with sentinel anchors.
//!
//! Every list lives inside a [`NodeArena`] and is delimited by a head and a
//! tail sentinel slot. Nodes are addressed by generation-checked
//! [`NodeHandle`]s, so a handle to a removed node never aliases a node that
//! later reuses the same slot.
//!
//! Several lists can share one arena, which is what makes
//! [`NodeArena::prepend_and_adopt`] O(1): moving a whole run of nodes from one
//! list to another only relinks the four boundary slots.

/// Sentinel index meaning "no slot".
const NIL: u32 = u32::MAX;

/// Stable handle to a node stored in a [`NodeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

/// Identifies one list inside a [`NodeArena`] by its sentinel slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListId {
    head: u32,
    tail: u32,
}

enum Entry<T> {
    Free,
    Head { next: u32, tail: u32 },
    Tail { prev: u32 },
    Node { prev: u32, next: u32, value: Option<T> },
}

struct Slot<T> {
    generation: u32,
    entry: Entry<T>,
}

/// Slot storage shared by any number of sentinel-delimited lists.
pub struct NodeArena<T> {
    slots: Vec<Slot<T>>,
    /// Indices of free slots, reused before the arena grows
    free_slots: Vec<u32>,
    /// Live (non-sentinel) node count across all lists
    node_count: usize,
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeArena<T> {
    /// Create an empty arena with no lists.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            node_count: 0,
        }
    }

    /// Create a new empty list (allocates its two sentinels).
    pub fn new_list(&mut self) -> ListId {
        let head = self.alloc(Entry::Free);
        let tail = self.alloc(Entry::Free);
        self.slots[head as usize].entry = Entry::Head { next: tail, tail };
        self.slots[tail as usize].entry = Entry::Tail { prev: head };
        ListId { head, tail }
    }

    /// Link `value` into `list` immediately ahead of the tail sentinel.
    ///
    /// Walking a list from its head therefore yields nodes in the order they
    /// were prepended.
    pub fn prepend(&mut self, list: ListId, value: T) -> NodeHandle {
        let prev = self.prev_of(list.tail);
        let index = self.alloc(Entry::Node {
            prev,
            next: list.tail,
            value: Some(value),
        });
        self.set_next(prev, index);
        self.set_prev(list.tail, index);
        self.node_count += 1;
        NodeHandle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    /// Move every node of `source` into `dest`, ahead of `dest`'s tail
    /// sentinel, and leave `source` empty. Runs in O(1).
    ///
    /// Adopting an empty list leaves `dest` untouched.
    pub fn prepend_and_adopt(&mut self, dest: ListId, source: ListId) {
        if dest == source || self.is_empty(source) {
            return;
        }

        let first = self.next_of(source.head);
        let last = self.prev_of(source.tail);
        let before = self.prev_of(dest.tail);

        self.set_next(before, first);
        self.set_prev(first, before);
        self.set_next(last, dest.tail);
        self.set_prev(dest.tail, last);

        self.set_next(source.head, source.tail);
        self.set_prev(source.tail, source.head);
    }

    /// Unlink and free a node, returning its value.
    ///
    /// Returns `None` if the handle is stale. A node whose value is currently
    /// taken (see [`take`](Self::take)) is still unlinked and freed; the
    /// holder's later [`restore`](Self::restore) then hands the value back.
    pub fn remove(&mut self, handle: NodeHandle) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }

        let entry = std::mem::replace(&mut self.slots[handle.index as usize].entry, Entry::Free);
        let Entry::Node { prev, next, value } = entry else {
            return None;
        };

        self.set_next(prev, next);
        self.set_prev(next, prev);
        self.release_slot(handle.index);
        self.node_count -= 1;
        value
    }

    /// Whether `handle` still refers to a live node.
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.slots.get(handle.index as usize).is_some_and(|slot| {
            slot.generation == handle.generation && matches!(slot.entry, Entry::Node { .. })
        })
    }

    /// First node of `list`, if any.
    pub fn first(&self, list: ListId) -> Option<NodeHandle> {
        self.handle_at(self.next_of(list.head))
    }

    /// Successor of `handle` within its list, `None` at the end of the list
    /// or when the handle is stale.
    pub fn next(&self, handle: NodeHandle) -> Option<NodeHandle> {
        if !self.contains(handle) {
            return None;
        }
        self.handle_at(self.next_of(handle.index))
    }

    /// Whether `list` has no nodes.
    pub fn is_empty(&self, list: ListId) -> bool {
        self.next_of(list.head) == list.tail
    }

    /// Number of nodes in `list`. Walks the list.
    pub fn len(&self, list: ListId) -> usize {
        self.handles(list).len()
    }

    /// Live node count across every list in the arena.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Handles of every node in `list`, head to tail.
    pub fn handles(&self, list: ListId) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut cursor = self.first(list);
        while let Some(handle) = cursor {
            out.push(handle);
            cursor = self.next(handle);
        }
        out
    }

    /// The list `handle` currently belongs to. Walks back to the head sentinel.
    pub fn list_of(&self, handle: NodeHandle) -> Option<ListId> {
        if !self.contains(handle) {
            return None;
        }
        let mut index = handle.index;
        loop {
            match &self.slots[index as usize].entry {
                Entry::Node { prev, .. } => index = *prev,
                Entry::Head { tail, .. } => {
                    return Some(ListId {
                        head: index,
                        tail: *tail,
                    });
                }
                Entry::Tail { .. } | Entry::Free => return None,
            }
        }
    }

    /// Shared access to a node's value. `None` while the value is taken.
    pub fn get(&self, handle: NodeHandle) -> Option<&T> {
        if !self.contains(handle) {
            return None;
        }
        match &self.slots[handle.index as usize].entry {
            Entry::Node { value, .. } => value.as_ref(),
            _ => None,
        }
    }

    /// Mutable access to a node's value. `None` while the value is taken.
    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut T> {
        if !self.contains(handle) {
            return None;
        }
        match &mut self.slots[handle.index as usize].entry {
            Entry::Node { value, .. } => value.as_mut(),
            _ => None,
        }
    }

    /// Temporarily move a node's value out while leaving the node linked.
    ///
    /// Used to run a hook on the value without holding a borrow of the arena.
    pub fn take(&mut self, handle: NodeHandle) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        match &mut self.slots[handle.index as usize].entry {
            Entry::Node { value, .. } => value.take(),
            _ => None,
        }
    }

    /// Put back a value moved out with [`take`](Self::take).
    ///
    /// Fails with the value if the node was removed in the meantime.
    pub fn restore(&mut self, handle: NodeHandle, value: T) -> Result<(), T> {
        if !self.contains(handle) {
            return Err(value);
        }
        match &mut self.slots[handle.index as usize].entry {
            Entry::Node { value: slot, .. } if slot.is_none() => {
                *slot = Some(value);
                Ok(())
            }
            _ => Err(value),
        }
    }

    fn alloc(&mut self, entry: Entry<T>) -> u32 {
        if let Some(index) = self.free_slots.pop() {
            self.slots[index as usize].entry = entry;
            index
        } else {
            self.slots.push(Slot {
                generation: 0,
                entry,
            });
            (self.slots.len() - 1) as u32
        }
    }

    fn release_slot(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.entry = Entry::Free;
        self.free_slots.push(index);
    }

    fn handle_at(&self, index: u32) -> Option<NodeHandle> {
        let slot = self.slots.get(index as usize)?;
        match slot.entry {
            Entry::Node { .. } => Some(NodeHandle {
                index,
                generation: slot.generation,
            }),
            _ => None,
        }
    }

    fn next_of(&self, index: u32) -> u32 {
        match &self.slots[index as usize].entry {
            Entry::Head { next, .. } | Entry::Node { next, .. } => *next,
            Entry::Tail { .. } | Entry::Free => NIL,
        }
    }

    fn prev_of(&self, index: u32) -> u32 {
        match &self.slots[index as usize].entry {
            Entry::Tail { prev } | Entry::Node { prev, .. } => *prev,
            Entry::Head { .. } | Entry::Free => NIL,
        }
    }

    fn set_next(&mut self, index: u32, to: u32) {
        match &mut self.slots[index as usize].entry {
            Entry::Head { next, .. } | Entry::Node { next, .. } => *next = to,
            Entry::Tail { .. } | Entry::Free => {}
        }
    }

    fn set_prev(&mut self, index: u32, to: u32) {
        match &mut self.slots[index as usize].entry {
            Entry::Tail { prev } | Entry::Node { prev, .. } => *prev = to,
            Entry::Head { .. } | Entry::Free => {}
        }
    }
}
