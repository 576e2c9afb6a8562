//! Decreasing-key binary min-heap.
//!
//! Entries are `(key, payload)` pairs where the payload is a stable external
//! index in `0..n`. An auxiliary position map lets [`DecHeap::decrease`]
//! find an entry by payload index in O(1) and re-sift it, which is what the
//! coloring kernel needs when a popped node lowers its neighbors' degrees.

/// Position-map sentinel for payloads that have been popped.
const ABSENT: usize = usize::MAX;

/// A binary min-heap over `(key, payload)` pairs with decrease-key support.
///
/// Invariant: `heap[pos[i]].1 == i` for every payload `i` still present.
#[derive(Debug)]
pub struct DecHeap {
    heap: Vec<(usize, usize)>,
    pos: Vec<usize>,
}

impl DecHeap {
    /// Build a heap over `keys`, with payload `i` attached to `keys[i]`.
    pub fn new(keys: &[usize]) -> Self {
        let heap = keys.iter().copied().enumerate().map(|(i, k)| (k, i)).collect();
        let pos = (0..keys.len()).collect();
        let mut this = Self { heap, pos };
        let n = this.heap.len();
        for i in (0..n / 2).rev() {
            this.sift_down(i);
        }
        this
    }

    /// Pop the minimum `(key, payload)` pair, or `None` when empty.
    pub fn pop(&mut self) -> Option<(usize, usize)> {
        let last = self.heap.len().checked_sub(1)?;
        self.swap(0, last);
        let item = self.heap.pop()?;
        self.pos[item.1] = ABSENT;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(item)
    }

    /// Decrease the key attached to `payload` by `delta`.
    ///
    /// Does nothing if the payload has already been popped.
    pub fn decrease(&mut self, payload: usize, delta: usize) {
        let idx = self.pos[payload];
        if idx == ABSENT {
            return;
        }
        self.heap[idx].0 = self.heap[idx].0.saturating_sub(delta);
        self.sift_up(idx);
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Swap two heap slots and keep the position map in sync.
    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.pos[self.heap[a].1] = a;
        self.pos[self.heap[b].1] = b;
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.heap[parent].0 <= self.heap[idx].0 {
                break;
            }
            self.swap(parent, idx);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        loop {
            let left = idx * 2 + 1;
            if left >= self.heap.len() {
                break;
            }
            let mut min_idx = left;
            let right = left + 1;
            if right < self.heap.len() && self.heap[right].0 < self.heap[left].0 {
                min_idx = right;
            }
            if self.heap[min_idx].0 >= self.heap[idx].0 {
                break;
            }
            self.swap(idx, min_idx);
            idx = min_idx;
        }
    }
}
