//! Arena-backed ordered set of variable ids.
//!
//! An AVL tree whose nodes live in a growable slot arena. Live slots are also
//! threaded on a doubly-linked list in ascending key order, so `first`/`next`
//! walk the set lazily without touching the tree, and `empty_quick` can hand
//! every slot back to the free list in constant time.

use crate::errors::{OrderError, Result};
use crate::Node;

pub const DEFAULT_INCREMENT: usize = 64;

// an AVL tree of n nodes has height < 1.44 * log2(n + 2), so 64 covers any
// arena addressable by u32
const PATH_CAPACITY: usize = 64;
const MAX_SLOTS: usize = u32::MAX as usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Root-to-leaf path recorded while descending, used to retrace rotations.
#[derive(Clone, Copy)]
struct PathStack {
    steps: [(usize, Side); PATH_CAPACITY],
    len: usize,
}

impl PathStack {
    fn new() -> PathStack {
        PathStack {
            steps: [(0, Side::Left); PATH_CAPACITY],
            len: 0,
        }
    }

    fn push(&mut self, slot: usize, side: Side) {
        debug_assert!(self.len < PATH_CAPACITY, "AVL path exceeds height bound");
        self.steps[self.len] = (slot, side);
        self.len += 1;
    }

    fn pop(&mut self) -> Option<(usize, Side)> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.steps[self.len])
    }

    fn top(&self) -> Option<(usize, Side)> {
        match self.len {
            0 => None,
            n => Some(self.steps[n - 1]),
        }
    }
}

#[derive(Clone, Debug)]
struct Entry {
    key: Node,
    prev: Option<usize>,
    // doubles as the free-list link for vacant slots
    next: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
    height: i32,
    balance: i8,
    // live iff equal to the owning set's generation
    generation: u64,
}

impl Entry {
    fn vacant(next: Option<usize>) -> Entry {
        Entry {
            key: 0,
            prev: None,
            next,
            left: None,
            right: None,
            height: 0,
            balance: 0,
            generation: 0,
        }
    }
}

/// Ordered set of ids with O(log n) insert/remove and O(1) clear.
#[derive(Clone, Debug)]
pub struct OrderedIndexSet {
    slots: Vec<Entry>,
    root: Option<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    free: Option<usize>,
    len: usize,
    increment: usize,
    max_capacity: usize,
    generation: u64,
}

impl Default for OrderedIndexSet {
    fn default() -> Self {
        OrderedIndexSet::new()
    }
}

impl OrderedIndexSet {
    pub fn new() -> OrderedIndexSet {
        OrderedIndexSet::with_capacity(0, DEFAULT_INCREMENT)
    }

    /// An empty set with `initial` preallocated slots that grows by
    /// `increment` slots whenever it fills up.
    pub fn with_capacity(initial: usize, increment: usize) -> OrderedIndexSet {
        let initial = initial.min(MAX_SLOTS);
        let mut slots = Vec::with_capacity(initial);
        for s in 0..initial {
            slots.push(Entry::vacant(if s + 1 < initial { Some(s + 1) } else { None }));
        }
        OrderedIndexSet {
            slots,
            root: None,
            head: None,
            tail: None,
            free: if initial > 0 { Some(0) } else { None },
            len: 0,
            increment: increment.max(1),
            max_capacity: MAX_SLOTS,
            generation: 1,
        }
    }

    /// Cap the arena size; inserts beyond it fail with `OutOfMemory`.
    pub fn with_max_capacity(mut self, max_capacity: usize) -> OrderedIndexSet {
        self.max_capacity = max_capacity.min(MAX_SLOTS).max(self.slots.len());
        self
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Height of the tree, -1 when empty.
    pub fn height(&self) -> i32 {
        self.height_of(self.root)
    }

    pub fn contains(&self, key: Node) -> bool {
        self.find(key).is_some()
    }

    /// Arena slot holding `key`, if present.
    pub fn find(&self, key: Node) -> Option<usize> {
        let mut cur = self.root;
        while let Some(s) = cur {
            let k = self.slots[s].key;
            if key == k {
                return Some(s);
            }
            cur = if key < k {
                self.slots[s].left
            } else {
                self.slots[s].right
            };
        }
        None
    }

    /// Insert `key`, returning its arena slot. Inserting a present key is a
    /// no-op that returns the existing slot.
    pub fn insert(&mut self, key: Node) -> Result<usize> {
        let mut path = PathStack::new();
        let mut pred = None;
        let mut succ = None;
        let mut cur = self.root;
        while let Some(s) = cur {
            let k = self.slots[s].key;
            if key == k {
                return Ok(s);
            }
            if key < k {
                path.push(s, Side::Left);
                succ = Some(s);
                cur = self.slots[s].left;
            } else {
                path.push(s, Side::Right);
                pred = Some(s);
                cur = self.slots[s].right;
            }
        }

        let slot = self.allocate(key)?;
        match path.top() {
            Some((parent, side)) => self.set_child(parent, side, Some(slot)),
            None => self.root = Some(slot),
        }

        // splice between in-order neighbours found on the way down
        self.slots[slot].prev = pred;
        self.slots[slot].next = succ;
        match pred {
            Some(p) => self.slots[p].next = Some(slot),
            None => self.head = Some(slot),
        }
        match succ {
            Some(n) => self.slots[n].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.len += 1;

        self.retrace(&mut path);
        Ok(slot)
    }

    /// Remove `key`, returning whether it was present.
    pub fn remove(&mut self, key: Node) -> bool {
        let mut path = PathStack::new();
        let mut cur = self.root;
        let target = loop {
            let s = match cur {
                Some(s) => s,
                None => return false,
            };
            let k = self.slots[s].key;
            if key == k {
                break s;
            }
            if key < k {
                path.push(s, Side::Left);
                cur = self.slots[s].left;
            } else {
                path.push(s, Side::Right);
                cur = self.slots[s].right;
            }
        };

        let left = self.slots[target].left;
        let right = self.slots[target].right;
        match (left, right) {
            (Some(_), Some(r)) => {
                // replace target by its in-order successor, the leftmost
                // node of the right subtree
                let at = path.len;
                path.push(target, Side::Right);
                let mut succ = r;
                while let Some(l) = self.slots[succ].left {
                    path.push(succ, Side::Left);
                    succ = l;
                }
                let succ_right = self.slots[succ].right;
                if let Some((parent, side)) = path.top() {
                    self.set_child(parent, side, succ_right);
                }
                self.slots[succ].left = self.slots[target].left;
                self.slots[succ].right = self.slots[target].right;
                path.steps[at] = (succ, Side::Right);
                if at == 0 {
                    self.root = Some(succ);
                } else {
                    let (parent, side) = path.steps[at - 1];
                    self.set_child(parent, side, Some(succ));
                }
            }
            _ => {
                let child = left.or(right);
                match path.top() {
                    Some((parent, side)) => self.set_child(parent, side, child),
                    None => self.root = child,
                }
            }
        }

        self.unlink(target);
        self.release(target);
        self.len -= 1;
        self.retrace(&mut path);
        true
    }

    /// Remove and return the smallest key.
    pub fn remove_first(&mut self) -> Option<Node> {
        let key = self.slots[self.head?].key;
        self.remove(key);
        Some(key)
    }

    /// Slot of the smallest key.
    pub fn first(&self) -> Option<usize> {
        self.head
    }

    /// Slot of the key following the one in `slot`.
    pub fn next(&self, slot: usize) -> Option<usize> {
        if self.is_live(slot) {
            self.slots[slot].next
        } else {
            None
        }
    }

    pub fn key(&self, slot: usize) -> Option<Node> {
        if self.is_live(slot) {
            Some(self.slots[slot].key)
        } else {
            None
        }
    }

    /// Ascending iterator over the keys.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            set: self,
            cur: self.head,
        }
    }

    /// Drop every key in constant time, keeping the arena for reuse.
    pub fn empty_quick(&mut self) {
        if let (Some(head), Some(tail)) = (self.head, self.tail) {
            self.slots[tail].next = self.free;
            self.free = Some(head);
        }
        self.root = None;
        self.head = None;
        self.tail = None;
        self.len = 0;
        // invalidates every slot that was live
        self.generation += 1;
    }

    // ------------------------------------------------------------------------

    fn is_live(&self, slot: usize) -> bool {
        slot < self.slots.len() && self.slots[slot].generation == self.generation
    }

    fn grow(&mut self) -> Result<()> {
        let old = self.slots.len();
        let new = old.saturating_add(self.increment).min(self.max_capacity);
        if new <= old {
            return Err(OrderError::OutOfMemory("index set capacity exhausted"));
        }
        self.slots
            .try_reserve_exact(new - old)
            .map_err(|_| OrderError::OutOfMemory("index set arena"))?;
        for s in old..new {
            let next = if s + 1 < new { Some(s + 1) } else { self.free };
            self.slots.push(Entry::vacant(next));
        }
        self.free = Some(old);
        Ok(())
    }

    fn allocate(&mut self, key: Node) -> Result<usize> {
        if self.free.is_none() {
            self.grow()?;
        }
        let slot = self
            .free
            .ok_or(OrderError::OutOfMemory("index set free list"))?;
        let generation = self.generation;
        let entry = &mut self.slots[slot];
        self.free = entry.next;
        *entry = Entry {
            key,
            prev: None,
            next: None,
            left: None,
            right: None,
            height: 0,
            balance: 0,
            generation,
        };
        Ok(slot)
    }

    fn release(&mut self, slot: usize) {
        let entry = &mut self.slots[slot];
        entry.generation = 0;
        entry.left = None;
        entry.right = None;
        entry.prev = None;
        entry.next = self.free;
        self.free = Some(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let prev = self.slots[slot].prev;
        let next = self.slots[slot].next;
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
    }

    fn set_child(&mut self, parent: usize, side: Side, child: Option<usize>) {
        match side {
            Side::Left => self.slots[parent].left = child,
            Side::Right => self.slots[parent].right = child,
        }
    }

    fn retrace(&mut self, path: &mut PathStack) {
        while let Some((slot, _)) = path.pop() {
            let subtree = self.rebalance(slot);
            match path.top() {
                Some((parent, side)) => self.set_child(parent, side, Some(subtree)),
                None => self.root = Some(subtree),
            }
        }
    }

    fn height_of(&self, slot: Option<usize>) -> i32 {
        slot.map_or(-1, |s| self.slots[s].height)
    }

    fn update(&mut self, slot: usize) {
        let hl = self.height_of(self.slots[slot].left);
        let hr = self.height_of(self.slots[slot].right);
        let entry = &mut self.slots[slot];
        entry.height = 1 + hl.max(hr);
        entry.balance = (hr - hl) as i8;
    }

    fn rotate_left(&mut self, x: usize) -> usize {
        let y = match self.slots[x].right {
            Some(y) => y,
            None => return x,
        };
        self.slots[x].right = self.slots[y].left;
        self.slots[y].left = Some(x);
        self.update(x);
        self.update(y);
        y
    }

    fn rotate_right(&mut self, x: usize) -> usize {
        let y = match self.slots[x].left {
            Some(y) => y,
            None => return x,
        };
        self.slots[x].left = self.slots[y].right;
        self.slots[y].right = Some(x);
        self.update(x);
        self.update(y);
        y
    }

    /// Restore the AVL condition at `slot`, returning the new subtree root.
    fn rebalance(&mut self, slot: usize) -> usize {
        self.update(slot);
        match self.slots[slot].balance {
            2 => {
                if let Some(r) = self.slots[slot].right {
                    if self.slots[r].balance < 0 {
                        let r = self.rotate_right(r);
                        self.slots[slot].right = Some(r);
                    }
                }
                self.rotate_left(slot)
            }
            -2 => {
                if let Some(l) = self.slots[slot].left {
                    if self.slots[l].balance > 0 {
                        let l = self.rotate_left(l);
                        self.slots[slot].left = Some(l);
                    }
                }
                self.rotate_right(slot)
            }
            _ => slot,
        }
    }

    // ------------------------------------------------------------------------

    /// Check the search-tree ordering, heights, balance factors and size.
    pub fn check_tree(&self) -> Result<()> {
        let (_, count) = self.check_subtree(self.root, None, None, 0)?;
        if count != self.len {
            return Err(OrderError::Inconsistent(format!(
                "tree holds {} nodes but len is {}",
                count, self.len
            )));
        }
        Ok(())
    }

    fn check_subtree(
        &self,
        slot: Option<usize>,
        lo: Option<Node>,
        hi: Option<Node>,
        depth: usize,
    ) -> Result<(i32, usize)> {
        let s = match slot {
            Some(s) => s,
            None => return Ok((-1, 0)),
        };
        if depth >= PATH_CAPACITY || !self.is_live(s) {
            return Err(OrderError::Inconsistent(format!(
                "slot {} reached at depth {} is not a live tree node",
                s, depth
            )));
        }
        let entry = &self.slots[s];
        if lo.map_or(false, |lo| entry.key <= lo) || hi.map_or(false, |hi| entry.key >= hi) {
            return Err(OrderError::Inconsistent(format!(
                "key {} violates search-tree order",
                entry.key
            )));
        }
        let (hl, nl) = self.check_subtree(entry.left, lo, Some(entry.key), depth + 1)?;
        let (hr, nr) = self.check_subtree(entry.right, Some(entry.key), hi, depth + 1)?;
        if entry.height != 1 + hl.max(hr) {
            return Err(OrderError::Inconsistent(format!(
                "key {} has height {}, expected {}",
                entry.key,
                entry.height,
                1 + hl.max(hr)
            )));
        }
        if i32::from(entry.balance) != hr - hl || (hr - hl).abs() > 1 {
            return Err(OrderError::Inconsistent(format!(
                "key {} has balance {} with child heights {} / {}",
                entry.key, entry.balance, hl, hr
            )));
        }
        Ok((entry.height, nl + nr + 1))
    }

    /// Check the free and in-use lists against the arena.
    pub fn test_consistency(&self) -> Result<()> {
        let capacity = self.slots.len();

        let mut free = 0;
        let mut cur = self.free;
        while let Some(s) = cur {
            if self.is_live(s) {
                return Err(OrderError::Inconsistent(format!(
                    "live slot {} is on the free list",
                    s
                )));
            }
            free += 1;
            if free > capacity {
                return Err(OrderError::Inconsistent("free list has a cycle".into()));
            }
            cur = self.slots[s].next;
        }

        let mut used = 0;
        let mut prev: Option<usize> = None;
        let mut cur = self.head;
        while let Some(s) = cur {
            if !self.is_live(s) {
                return Err(OrderError::Inconsistent(format!(
                    "vacant slot {} is on the in-use list",
                    s
                )));
            }
            if self.slots[s].prev != prev {
                return Err(OrderError::Inconsistent(format!(
                    "slot {} has a broken back link",
                    s
                )));
            }
            if let Some(p) = prev {
                if self.slots[p].key >= self.slots[s].key {
                    return Err(OrderError::Inconsistent(format!(
                        "in-use list not ascending at key {}",
                        self.slots[s].key
                    )));
                }
            }
            used += 1;
            if used > capacity {
                return Err(OrderError::Inconsistent("in-use list has a cycle".into()));
            }
            prev = Some(s);
            cur = self.slots[s].next;
        }
        if self.tail != prev {
            return Err(OrderError::Inconsistent("tail does not end the in-use list".into()));
        }
        if used != self.len {
            return Err(OrderError::Inconsistent(format!(
                "in-use list holds {} slots but len is {}",
                used, self.len
            )));
        }
        if used + free != capacity {
            return Err(OrderError::Inconsistent(format!(
                "{} used + {} free slots != capacity {}",
                used, free, capacity
            )));
        }
        Ok(())
    }
}

pub struct Iter<'a> {
    set: &'a OrderedIndexSet,
    cur: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        let s = self.cur?;
        self.cur = self.set.slots[s].next;
        Some(self.set.slots[s].key)
    }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(set: &OrderedIndexSet) {
        set.check_tree().unwrap();
        set.test_consistency().unwrap();
    }

    #[test]
    fn remove_first_yields_sorted_sequence() {
        let mut set = OrderedIndexSet::new();
        for k in [5, 3, 8, 1, 4, 7, 2, 6] {
            set.insert(k).unwrap();
            checked(&set);
        }
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6, 7, 8]);

        let mut drained = Vec::new();
        while let Some(k) = set.remove_first() {
            checked(&set);
            drained.push(k);
        }
        assert_eq!(drained, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(set.is_empty());
        assert_eq!(set.height(), -1);
    }

    #[test]
    fn duplicate_insert_returns_existing_slot() {
        let mut set = OrderedIndexSet::new();
        for k in [10, 20, 30] {
            set.insert(k).unwrap();
        }
        let height = set.height();
        let slot = set.find(20).unwrap();
        assert_eq!(set.insert(20).unwrap(), slot);
        assert_eq!(set.len(), 3);
        assert_eq!(set.height(), height);
        checked(&set);
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut set = OrderedIndexSet::new();
        for k in 0..1000 {
            set.insert(k).unwrap();
        }
        checked(&set);
        // 1.44 * log2(1002) ~ 14.4
        assert!(set.height() <= 14);
    }

    #[test]
    fn remove_inner_nodes() {
        let mut set = OrderedIndexSet::new();
        for k in 0..64 {
            set.insert(k * 3 % 64).unwrap();
        }
        for k in [32, 16, 48, 0, 63, 31] {
            assert!(set.remove(k));
            assert!(!set.contains(k));
            checked(&set);
        }
        assert!(!set.remove(32));
        assert_eq!(set.len(), 58);
    }

    #[test]
    fn lazy_traversal_by_slot() {
        let mut set = OrderedIndexSet::new();
        for k in [9, 4, 7] {
            set.insert(k).unwrap();
        }
        let mut keys = Vec::new();
        let mut cur = set.first();
        while let Some(s) = cur {
            keys.push(set.key(s).unwrap());
            cur = set.next(s);
        }
        assert_eq!(keys, vec![4, 7, 9]);
    }

    #[test]
    fn grows_by_increment() {
        let mut set = OrderedIndexSet::with_capacity(2, 3);
        assert_eq!(set.capacity(), 2);
        for k in 0..3 {
            set.insert(k).unwrap();
        }
        assert_eq!(set.capacity(), 5);
        checked(&set);
    }

    #[test]
    fn capped_arena_reports_out_of_memory() {
        let mut set = OrderedIndexSet::with_capacity(2, 2).with_max_capacity(3);
        for k in 0..3 {
            set.insert(k).unwrap();
        }
        assert!(matches!(set.insert(99), Err(OrderError::OutOfMemory(_))));
        // existing keys are still fine
        assert_eq!(set.insert(1).unwrap(), set.find(1).unwrap());
        checked(&set);
    }

    #[test]
    fn empty_quick_recycles_every_slot() {
        let mut set = OrderedIndexSet::with_capacity(4, 4);
        for k in [3, 1, 2] {
            set.insert(k).unwrap();
        }
        let stale = set.first().unwrap();
        set.empty_quick();
        assert!(set.is_empty());
        assert_eq!(set.key(stale), None);
        assert_eq!(set.iter().count(), 0);
        checked(&set);

        for k in [6, 5, 4, 8] {
            set.insert(k).unwrap();
        }
        assert_eq!(set.capacity(), 4);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![4, 5, 6, 8]);
        checked(&set);
    }
}
