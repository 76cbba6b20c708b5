//! Iterators over [`RbTree`](crate::RbTree) and the containers built on it.

use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use allocator_api2::alloc::{Allocator, Global};

use crate::alloc::take_node;
use crate::node::{self, predecessor, successor, Link, Node};

/// An iterator over the entries of a tree, in key order.
pub struct Iter<'a, K: 'a, V: 'a> {
    front: Link<K, V>,
    back: Link<K, V>,
    len: usize,
    _marker: PhantomData<&'a Node<K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(front: Link<K, V>, back: Link<K, V>, len: usize) -> Self {
        Self {
            front,
            back,
            len,
            _marker: PhantomData,
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self::new(self.front, self.back, self.len)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        self.front.map(|node| unsafe {
            self.front = successor(node);
            self.len -= 1;
            (&(*node.as_ptr()).key, &(*node.as_ptr()).val)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }

    fn last(mut self) -> Option<Self::Item> {
        self.next_back()
    }
}

impl<'a, K: 'a, V: 'a> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        self.back.map(|node| unsafe {
            self.back = predecessor(node);
            self.len -= 1;
            (&(*node.as_ptr()).key, &(*node.as_ptr()).val)
        })
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// A mutable iterator over the entries of a tree, in key order.
pub struct IterMut<'a, K: 'a, V: 'a> {
    front: Link<K, V>,
    back: Link<K, V>,
    len: usize,
    _marker: PhantomData<&'a mut Node<K, V>>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(front: Link<K, V>, back: Link<K, V>, len: usize) -> Self {
        Self {
            front,
            back,
            len,
            _marker: PhantomData,
        }
    }
}

impl<'a, K: 'a, V: 'a> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        self.front.map(|node| unsafe {
            self.front = successor(node);
            self.len -= 1;
            (&(*node.as_ptr()).key, &mut (*node.as_ptr()).val)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, K: 'a, V: 'a> DoubleEndedIterator for IterMut<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        self.back.map(|node| unsafe {
            self.back = predecessor(node);
            self.len -= 1;
            (&(*node.as_ptr()).key, &mut (*node.as_ptr()).val)
        })
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// An iterator over the keys of a tree.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Keys<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a K> {
        self.inner.next_back().map(|(key, _)| key)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// An iterator over the values of a tree, in key order.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, val)| val)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Values<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a V> {
        self.inner.next_back().map(|(_, val)| val)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}

/// A mutable iterator over the values of a tree, in key order.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> ValuesMut<'a, K, V> {
    pub(crate) fn new(inner: IterMut<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, val)| val)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for ValuesMut<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a mut V> {
        self.inner.next_back().map(|(_, val)| val)
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

/// An iterator over a sub-range of the entries of a tree.
///
/// `front` and `back` are inclusive; both are `None` once the range is spent.
pub struct Range<'a, K: 'a, V: 'a> {
    front: Link<K, V>,
    back: Link<K, V>,
    _marker: PhantomData<&'a Node<K, V>>,
}

impl<'a, K, V> Range<'a, K, V> {
    pub(crate) fn new(front: Link<K, V>, back: Link<K, V>) -> Self {
        Self {
            front,
            back,
            _marker: PhantomData,
        }
    }

    // true once the last element has been handed out
    fn take_if_met(&mut self) -> bool {
        let met = self.front == self.back;
        if met {
            self.front = None;
            self.back = None;
        }
        met
    }
}

impl<K, V> Clone for Range<'_, K, V> {
    fn clone(&self) -> Self {
        Self::new(self.front, self.back)
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.front?;
        if !self.take_if_met() {
            self.front = unsafe { successor(node) };
        }
        Some(unsafe { (&(*node.as_ptr()).key, &(*node.as_ptr()).val) })
    }
}

impl<'a, K: 'a, V: 'a> DoubleEndedIterator for Range<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node = self.back?;
        if !self.take_if_met() {
            self.back = unsafe { predecessor(node) };
        }
        Some(unsafe { (&(*node.as_ptr()).key, &(*node.as_ptr()).val) })
    }
}

impl<K, V> FusedIterator for Range<'_, K, V> {}

/// An owning iterator over the entries of a tree, in key order.
///
/// The tree is taken apart as the iterator advances: each yielded node is
/// spliced out of what remains before its storage is returned to the
/// allocator, so the front and back can be consumed in any interleaving.
pub struct IntoIter<K, V, A: Allocator = Global> {
    front: Link<K, V>,
    back: Link<K, V>,
    len: usize,
    alloc: A,
}

impl<K, V, A: Allocator> IntoIter<K, V, A> {
    pub(crate) fn new(front: Link<K, V>, back: Link<K, V>, len: usize, alloc: A) -> Self {
        Self {
            front,
            back,
            len,
            alloc,
        }
    }
}

impl<K, V, A: Allocator> Iterator for IntoIter<K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        if self.len == 0 {
            return None;
        }
        let node = self.front?;
        unsafe {
            self.front = successor(node);

            // everything smaller is gone, so only a right subtree can remain
            // and it takes node's place
            node::replace_in_parent(node, (*node.as_ptr()).right);

            self.len -= 1;
            Some(take_node(&self.alloc, node))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K, V, A: Allocator> DoubleEndedIterator for IntoIter<K, V, A> {
    fn next_back(&mut self) -> Option<(K, V)> {
        if self.len == 0 {
            return None;
        }
        let node = self.back?;
        unsafe {
            self.back = predecessor(node);

            // mirror of `next`: only a left subtree can remain
            node::replace_in_parent(node, (*node.as_ptr()).left);

            self.len -= 1;
            Some(take_node(&self.alloc, node))
        }
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for IntoIter<K, V, A> {}

impl<K, V, A: Allocator> FusedIterator for IntoIter<K, V, A> {}

impl<K, V, A: Allocator> Drop for IntoIter<K, V, A> {
    fn drop(&mut self) {
        for _ in self.by_ref() {}
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::RbTree;

    fn sample(n: i32) -> RbTree<i32, i32> {
        (0..n).map(|i| (i, i * i)).collect()
    }

    #[test]
    fn range_meets_in_the_middle() {
        let tree = sample(10);
        let mut range = tree.range(2..8);
        assert_eq!(range.next(), Some((&2, &4)));
        assert_eq!(range.next_back(), Some((&7, &49)));
        let rest: Vec<_> = range.clone().map(|(k, _)| *k).collect();
        assert_eq!(rest, [3, 4, 5, 6]);
        assert_eq!(range.by_ref().count(), 4);
        assert_eq!(range.next(), None);
        assert_eq!(range.next_back(), None);
    }

    #[test]
    fn single_element_range() {
        let tree = sample(3);
        let mut range = tree.range(1..=1);
        assert_eq!(range.next_back(), Some((&1, &1)));
        assert_eq!(range.next(), None);
    }

    #[test]
    fn iter_from_both_ends() {
        let tree = sample(5);
        let mut iter = tree.iter();
        assert_eq!(iter.next(), Some((&0, &0)));
        assert_eq!(iter.next_back(), Some((&4, &16)));
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.clone().last(), Some((&3, &9)));
        assert_eq!(format!("{iter:?}"), "[(1, 1), (2, 4), (3, 9)]");
    }

    #[test]
    fn values_mut_writes_through() {
        let mut tree = sample(4);
        for val in tree.values_mut() {
            *val += 1;
        }
        assert_eq!(tree.values().copied().collect::<Vec<_>>(), [1, 2, 5, 10]);
        assert_eq!(tree.keys().rev().copied().collect::<Vec<_>>(), [3, 2, 1, 0]);
        for (key, val) in &mut tree {
            *val = *key;
        }
        assert_eq!((&tree).into_iter().map(|(_, v)| *v).sum::<i32>(), 6);
    }
}
