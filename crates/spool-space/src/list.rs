//! Index-linked, order-preserving lists over a shared node slab.
//!
//! Both of a space's lists (`free` and `full`) draw their nodes from one
//! `NodeSlab`. Links are slot indices, not pointers, so moving a value
//! between lists is a relink of the same slot: O(1) and never a copy.
//!
//! Nothing here is synchronized; callers mutate lists only while holding
//! the owning space's lock.

/// Which of a space's two lists a buffer belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// Buffers available for acquisition.
    Free,
    /// Buffers in use or awaiting a drain pass.
    Full,
}

/// Iteration order over a list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Head to tail: most recently inserted first.
    #[default]
    Forward,
    /// Tail to head: least recently inserted first.
    Backward,
}

impl Direction {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

struct Node<T> {
    value: T,
    kind: ListKind,
    prev: Option<u32>,
    next: Option<u32>,
}

/// Slot storage shared by the lists of one space.
///
/// Vacated slots are reused last-in, first-out.
pub(crate) struct NodeSlab<T> {
    nodes: Vec<Option<Node<T>>>,
    vacant: Vec<u32>,
}

impl<T> NodeSlab<T> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            vacant: Vec::new(),
        }
    }

    fn insert(&mut self, value: T, kind: ListKind) -> u32 {
        let node = Node {
            value,
            kind,
            prev: None,
            next: None,
        };
        if let Some(slot) = self.vacant.pop() {
            self.nodes[slot as usize] = Some(node);
            slot
        } else {
            let slot = u32::try_from(self.nodes.len()).expect("list slot index overflow");
            self.nodes.push(Some(node));
            slot
        }
    }

    fn take(&mut self, slot: u32) -> T {
        let node = self.nodes[slot as usize]
            .take()
            .expect("take on a vacant list slot");
        self.vacant.push(slot);
        node.value
    }

    fn node(&self, slot: u32) -> &Node<T> {
        self.nodes[slot as usize]
            .as_ref()
            .expect("link to a vacant list slot")
    }

    fn node_mut(&mut self, slot: u32) -> &mut Node<T> {
        self.nodes[slot as usize]
            .as_mut()
            .expect("link to a vacant list slot")
    }

    /// The value stored at `slot`, if occupied.
    pub(crate) fn get(&self, slot: u32) -> Option<&T> {
        self.nodes
            .get(slot as usize)
            .and_then(Option::as_ref)
            .map(|node| &node.value)
    }

    /// The list `slot` is linked into, if occupied.
    pub(crate) fn kind(&self, slot: u32) -> Option<ListKind> {
        self.nodes
            .get(slot as usize)
            .and_then(Option::as_ref)
            .map(|node| node.kind)
    }

    /// The slot after `slot` when walking in `direction`.
    pub(crate) fn step(&self, slot: u32, direction: Direction) -> Option<u32> {
        let node = self.node(slot);
        match direction {
            Direction::Forward => node.next,
            Direction::Backward => node.prev,
        }
    }

    /// Number of occupied slots.
    #[cfg(test)]
    pub(crate) fn occupied(&self) -> usize {
        self.nodes.len() - self.vacant.len()
    }
}

/// A doubly linked list of slab slots.
pub(crate) struct IndexList {
    kind: ListKind,
    head: Option<u32>,
    tail: Option<u32>,
    count: usize,
}

impl IndexList {
    pub(crate) fn new(kind: ListKind) -> Self {
        Self {
            kind,
            head: None,
            tail: None,
            count: 0,
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The first slot when walking in `direction`.
    pub(crate) fn first(&self, direction: Direction) -> Option<u32> {
        match direction {
            Direction::Forward => self.head,
            Direction::Backward => self.tail,
        }
    }

    /// Whether `slot` is linked into this list.
    pub(crate) fn contains<T>(&self, slab: &NodeSlab<T>, slot: u32) -> bool {
        slab.kind(slot) == Some(self.kind)
    }

    /// Store `value` in a fresh slot at the head. Returns the slot.
    pub(crate) fn prepend<T>(&mut self, slab: &mut NodeSlab<T>, value: T) -> u32 {
        let slot = slab.insert(value, self.kind);
        self.link_front(slab, slot);
        slot
    }

    /// Unlink `slot` and vacate it, returning the stored value.
    pub(crate) fn remove<T>(&mut self, slab: &mut NodeSlab<T>, slot: u32) -> T {
        self.unlink(slab, slot);
        slab.take(slot)
    }

    /// Relink `slot` from this list to the head of `to`, keeping its slot.
    pub(crate) fn move_to_head<T>(
        &mut self,
        to: &mut IndexList,
        slab: &mut NodeSlab<T>,
        slot: u32,
    ) {
        self.unlink(slab, slot);
        slab.node_mut(slot).kind = to.kind;
        to.link_front(slab, slot);
    }

    /// Iterate the values in `direction`.
    pub(crate) fn iter<'a, T>(
        &self,
        slab: &'a NodeSlab<T>,
        direction: Direction,
    ) -> ListIter<'a, T> {
        ListIter {
            slab,
            cursor: self.first(direction),
            direction,
        }
    }

    fn link_front<T>(&mut self, slab: &mut NodeSlab<T>, slot: u32) {
        let old_head = self.head;
        {
            let node = slab.node_mut(slot);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(head) => slab.node_mut(head).prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
        self.count += 1;
    }

    fn unlink<T>(&mut self, slab: &mut NodeSlab<T>, slot: u32) {
        debug_assert!(self.contains(slab, slot), "unlink of a slot not in {:?}", self.kind);
        let (prev, next) = {
            let node = slab.node_mut(slot);
            let links = (node.prev, node.next);
            node.prev = None;
            node.next = None;
            links
        };
        match prev {
            Some(p) => slab.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => slab.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
        self.count -= 1;
    }
}

/// Iterator over one list's values.
pub(crate) struct ListIter<'a, T> {
    slab: &'a NodeSlab<T>,
    cursor: Option<u32>,
    direction: Direction,
}

impl<'a, T> Iterator for ListIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let slot = self.cursor?;
        self.cursor = self.slab.step(slot, self.direction);
        self.slab.get(slot)
    }
}
