use std::cmp::Ordering;
use std::collections::BinaryHeap;

use dimred::Float;
use noisy_float::{checkers::NumChecker, NoisyFloat};

pub(crate) struct HeapElem<D: Ord, T> {
    pub(crate) dist: D,
    pub(crate) elem: T,
}

impl<D: Ord, T> PartialEq for HeapElem<D, T> {
    fn eq(&self, other: &Self) -> bool {
        self.dist.eq(&other.dist)
    }
}
impl<D: Ord, T> Eq for HeapElem<D, T> {}

impl<D: Ord, T> PartialOrd for HeapElem<D, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.dist.partial_cmp(&other.dist)
    }
}

impl<D: Ord, T> Ord for HeapElem<D, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist.cmp(&other.dist)
    }
}

// infinite values are valid entries (masked diagonals, absent sparse entries)
pub(crate) type MaxHeapElem<F, T> = HeapElem<NoisyFloat<F, NumChecker>, T>;

impl<F: Float, T> MaxHeapElem<F, T> {
    pub(crate) fn new(dist: F, elem: T) -> Self {
        Self {
            dist: NoisyFloat::new(dist),
            elem,
        }
    }
}

/// Keeps the `k` smallest values pushed so far, together with their lane index
pub(crate) struct KSmallest<F: Float> {
    k: usize,
    heap: BinaryHeap<MaxHeapElem<F, usize>>,
}

impl<F: Float> KSmallest<F> {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    pub(crate) fn push(&mut self, value: F, index: usize) {
        if self.heap.len() < self.k {
            self.heap.push(MaxHeapElem::new(value, index));
        } else if let Some(top) = self.heap.peek() {
            if value < top.dist.raw() {
                self.heap.pop();
                self.heap.push(MaxHeapElem::new(value, index));
            }
        }
    }

    /// Values in ascending order, ties resolved by ascending index
    pub(crate) fn into_sorted(self) -> Vec<(F, usize)> {
        let mut out: Vec<_> = self
            .heap
            .into_iter()
            .map(|el| (el.dist.raw(), el.elem))
            .collect();
        out.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::KSmallest;

    #[test]
    fn keeps_smallest_values() {
        let mut sel = KSmallest::new(3);
        for (idx, val) in [5.0, 1.0, f64::INFINITY, 3.0, 0.5, 4.0].iter().enumerate() {
            sel.push(*val, idx);
        }
        assert_eq!(sel.into_sorted(), vec![(0.5, 4), (1.0, 1), (3.0, 3)]);
    }

    #[test]
    fn fewer_values_than_k() {
        let mut sel = KSmallest::new(4);
        sel.push(2.0f32, 0);
        sel.push(f32::INFINITY, 1);
        assert_eq!(sel.into_sorted(), vec![(2.0, 0), (f32::INFINITY, 1)]);
    }
}
