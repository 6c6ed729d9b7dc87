/// Fixed-capacity min-heap ordered by a user-supplied `less_than`, matching
/// spec.md §4.10. The heap root is the *least* element under `less_than`, so
/// for a top-k-by-score collector `less_than` should compare scores with the
/// worse score counted as "less than" the better one.
pub struct BoundedPriorityQueue<T> {
    heap: Vec<T>,
    capacity: usize,
    less_than: Box<dyn Fn(&T, &T) -> bool + Send + Sync>,
}

impl<T> BoundedPriorityQueue<T> {
    pub fn new(capacity: usize, less_than: impl Fn(&T, &T) -> bool + Send + Sync + 'static) -> Self {
        BoundedPriorityQueue {
            heap: Vec::with_capacity(capacity),
            capacity,
            less_than: Box::new(less_than),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn top(&self) -> Option<&T> {
        self.heap.first()
    }

    /// Inserts `x` when not full. Must not be called when the queue is at
    /// capacity (use `add_overflow` instead) — mirrors the source contract.
    pub fn add(&mut self, x: T) {
        debug_assert!(!self.is_full(), "add() called on a full BoundedPriorityQueue");
        self.heap.push(x);
        self.sift_up(self.heap.len() - 1);
    }

    /// Inserts when not full; otherwise replaces the root if `x` is greater
    /// than the current minimum under `less_than`.
    pub fn add_overflow(&mut self, x: T) -> bool {
        if !self.is_full() {
            self.add(x);
            return true;
        }
        if (self.less_than)(self.heap.first().unwrap(), &x) {
            self.heap[0] = x;
            self.sift_down(0);
            true
        } else {
            false
        }
    }

    /// Re-heapifies after in-place mutation of the root element.
    pub fn update_top(&mut self) {
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let popped = self.heap.pop();
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        popped
    }

    /// Drains the queue smallest-first (the order `pop()` naturally yields).
    pub fn into_sorted_vec(mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(x) = self.pop() {
            out.push(x);
        }
        out
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if (self.less_than)(&self.heap[i], &self.heap[parent]) {
                self.heap.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut smallest = i;
            if left < len && (self.less_than)(&self.heap[left], &self.heap[smallest]) {
                smallest = left;
            }
            if right < len && (self.less_than)(&self.heap[right], &self.heap[smallest]) {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.heap.swap(i, smallest);
            i = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_k_largest_under_overflow() {
        let mut q = BoundedPriorityQueue::new(3, |a: &i32, b: &i32| a < b);
        for x in [5, 1, 9, 2, 8, 3, 7] {
            q.add_overflow(x);
        }
        let mut sorted = q.into_sorted_vec();
        sorted.sort();
        assert_eq!(sorted, vec![7, 8, 9]);
    }

    #[test]
    fn add_respects_capacity_ordering() {
        let mut q = BoundedPriorityQueue::new(2, |a: &i32, b: &i32| a < b);
        q.add(10);
        q.add(4);
        assert_eq!(*q.top().unwrap(), 4);
        q.update_top();
        assert_eq!(*q.top().unwrap(), 4);
    }

    #[test]
    fn pop_drains_in_ascending_order() {
        let mut q = BoundedPriorityQueue::new(4, |a: &i32, b: &i32| a < b);
        for x in [3, 1, 4, 1] {
            q.add_overflow(x);
        }
        let mut out = Vec::new();
        while let Some(x) = q.pop() {
            out.push(x);
        }
        assert_eq!(out, vec![1, 1, 3, 4]);
    }
}
