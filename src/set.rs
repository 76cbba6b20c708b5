//! An ordered set over [`RbTree`].

use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::iter::FusedIterator;
use core::ops::RangeBounds;

use allocator_api2::alloc::{Allocator, Global};
use tracing::warn;

use crate::compare::{Compare, Less};
use crate::cursor::{Cursor, CursorMut};
use crate::error::Result;
use crate::iter::{self, Keys};
use crate::tree::RbTree;

/// An ordered set of unique values, backed by a red-black tree.
///
/// Each value is stored as the key of a tree entry with no payload.
///
/// # Examples
///
/// ```
/// use rbtree_collections::RbTreeSet;
///
/// let mut books = RbTreeSet::new();
///
/// // Add some books.
/// books.insert("A Dance With Dragons");
/// books.insert("To Kill a Mockingbird");
/// books.insert("The Odyssey");
/// books.insert("The Great Gatsby");
///
/// // Check for a specific one.
/// if !books.contains("The Winds of Winter") {
///     println!("We have {} books, but The Winds of Winter ain't one.", books.len());
/// }
///
/// // Remove a book.
/// books.remove("The Odyssey");
///
/// // Iterate over everything.
/// for book in &books {
///     println!("{book}");
/// }
/// ```
pub struct RbTreeSet<T, C = Less, A: Allocator = Global> {
    pub(crate) tree: RbTree<T, (), C, A>,
}

impl<T> RbTreeSet<T> {
    /// Makes a new, empty `RbTreeSet`.
    ///
    /// Does not allocate anything on its own.
    pub fn new() -> Self {
        Self { tree: RbTree::new() }
    }
}

impl<T, C> RbTreeSet<T, C> {
    pub fn with_compare(compare: C) -> Self {
        Self {
            tree: RbTree::with_compare(compare),
        }
    }
}

impl<T, A: Allocator> RbTreeSet<T, Less, A> {
    pub fn new_in(alloc: A) -> Self {
        Self {
            tree: RbTree::new_in(alloc),
        }
    }
}

impl<T, C, A: Allocator> RbTreeSet<T, C, A> {
    pub fn with_compare_in(compare: C, alloc: A) -> Self {
        Self {
            tree: RbTree::with_compare_in(compare, alloc),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.tree.max_size()
    }

    pub fn clear(&mut self) {
        self.tree.clear()
    }

    pub fn swap(&mut self, other: &mut Self) {
        self.tree.swap(&mut other.tree)
    }

    pub fn key_comp(&self) -> &C {
        self.tree.key_comp()
    }

    /// The values are the keys, so this is [`RbTreeSet::key_comp`].
    pub fn value_comp(&self) -> &C {
        self.tree.key_comp()
    }

    pub fn allocator(&self) -> &A {
        self.tree.allocator()
    }

    /// Adds a value to the set unless an equivalent one is already present.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTreeSet;
    ///
    /// let mut set = RbTreeSet::new();
    ///
    /// assert_eq!(set.insert(2).1, true);
    /// assert_eq!(set.insert(2).1, false);
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, value: T) -> (CursorMut<'_, T, (), C, A>, bool)
    where
        C: Compare<T>,
    {
        self.tree.insert(value, ())
    }

    pub fn try_insert(&mut self, value: T) -> Result<(CursorMut<'_, T, (), C, A>, bool)>
    where
        C: Compare<T>,
    {
        self.tree.try_insert(value, ())
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.contains_key(value)
    }

    /// Returns a reference to the stored value equivalent to `value`.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.get_key_value(value).map(|(key, _)| key)
    }

    pub fn count<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.count(value)
    }

    pub fn find<Q>(&self, value: &Q) -> Cursor<'_, T, (), C, A>
    where
        T: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.find(value)
    }

    pub fn find_mut<Q>(&mut self, value: &Q) -> CursorMut<'_, T, (), C, A>
    where
        T: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.find_mut(value)
    }

    pub fn lower_bound<Q>(&self, value: &Q) -> Cursor<'_, T, (), C, A>
    where
        T: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.lower_bound(value)
    }

    pub fn upper_bound<Q>(&self, value: &Q) -> Cursor<'_, T, (), C, A>
    where
        T: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.upper_bound(value)
    }

    pub fn equal_range<Q>(&self, value: &Q) -> (Cursor<'_, T, (), C, A>, Cursor<'_, T, (), C, A>)
    where
        T: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.equal_range(value)
    }

    /// Gets a double-ended iterator over the values in `range`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTreeSet;
    ///
    /// let set: RbTreeSet<_> = [3, 5, 8].into_iter().collect();
    /// assert_eq!(set.range(4..).collect::<Vec<_>>(), [&5, &8]);
    /// ```
    pub fn range<Q, R>(&self, range: R) -> Range<'_, T>
    where
        T: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
        R: RangeBounds<Q>,
    {
        Range {
            inner: self.tree.range(range),
        }
    }

    /// Removes and returns the stored value equivalent to `value`.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.remove_entry(value).map(|(key, ())| key)
    }

    /// Removes `value`, returning whether it was present.
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.remove_entry(value).is_some()
    }

    pub fn erase<Q>(&mut self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.erase(value)
    }

    /// Removes every value in `range` and returns how many were removed.
    ///
    /// A range whose start orders after its end is reported and ignored.
    pub fn erase_range<Q, R>(&mut self, range: R) -> usize
    where
        T: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
        R: RangeBounds<Q>,
    {
        match self.tree.span(&range) {
            Some((start, end)) => self.tree.erase_span(start, end),
            None => {
                warn!(len = self.len(), "erase_range called with an inverted range; nothing erased");
                0
            }
        }
    }

    pub fn first(&self) -> Option<&T> {
        self.tree.first_key_value().map(|(key, _)| key)
    }

    pub fn last(&self) -> Option<&T> {
        self.tree.last_key_value().map(|(key, _)| key)
    }

    pub fn pop_first(&mut self) -> Option<T> {
        self.tree.pop_first().map(|(key, ())| key)
    }

    pub fn pop_last(&mut self) -> Option<T> {
        self.tree.pop_last().map(|(key, ())| key)
    }

    pub fn cursor_front(&self) -> Cursor<'_, T, (), C, A> {
        self.tree.cursor_front()
    }

    pub fn cursor_back(&self) -> Cursor<'_, T, (), C, A> {
        self.tree.cursor_back()
    }

    pub fn cursor_end(&self) -> Cursor<'_, T, (), C, A> {
        self.tree.cursor_end()
    }

    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, T, (), C, A> {
        self.tree.cursor_front_mut()
    }

    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, T, (), C, A> {
        self.tree.cursor_back_mut()
    }

    pub fn cursor_end_mut(&mut self) -> CursorMut<'_, T, (), C, A> {
        self.tree.cursor_end_mut()
    }

    /// Gets an iterator that visits the values in ascending order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.tree.keys(),
        }
    }
}

impl<T: Clone, C: Clone, A: Allocator + Clone> RbTreeSet<T, C, A> {
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            tree: self.tree.try_clone()?,
        })
    }
}

impl<T: Clone, C: Clone, A: Allocator + Clone> Clone for RbTreeSet<T, C, A> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<T, C: Default, A: Allocator + Default> Default for RbTreeSet<T, C, A> {
    fn default() -> Self {
        Self {
            tree: RbTree::default(),
        }
    }
}

impl<T, C: Compare<T>, A: Allocator> Extend<T> for RbTreeSet<T, C, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.tree.extend(iter.into_iter().map(|value| (value, ())))
    }
}

impl<'a, T: Copy + 'a, C: Compare<T>, A: Allocator> Extend<&'a T> for RbTreeSet<T, C, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied())
    }
}

impl<T, C: Compare<T> + Default> FromIterator<T> for RbTreeSet<T, C> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::with_compare(C::default());
        set.extend(iter);
        set
    }
}

impl<T: Ord, const N: usize> From<[T; N]> for RbTreeSet<T> {
    fn from(arr: [T; N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<T, C, A: Allocator> IntoIterator for RbTreeSet<T, C, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter {
            inner: self.tree.into_iter(),
        }
    }
}

impl<'a, T, C, A: Allocator> IntoIterator for &'a RbTreeSet<T, C, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T: fmt::Debug, C, A: Allocator> fmt::Debug for RbTreeSet<T, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, C, A: Allocator> PartialEq for RbTreeSet<T, C, A> {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}

impl<T: Eq, C, A: Allocator> Eq for RbTreeSet<T, C, A> {}

impl<T: PartialOrd, C, A: Allocator> PartialOrd for RbTreeSet<T, C, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord, C, A: Allocator> Ord for RbTreeSet<T, C, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

/// An iterator over the values of an [`RbTreeSet`], in order.
pub struct Iter<'a, T> {
    inner: Keys<'a, T, ()>,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// An iterator over a sub-range of an [`RbTreeSet`].
pub struct Range<'a, T> {
    inner: iter::Range<'a, T, ()>,
}

impl<'a, T> Iterator for Range<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.inner.next().map(|(key, _)| key)
    }
}

impl<'a, T> DoubleEndedIterator for Range<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        self.inner.next_back().map(|(key, _)| key)
    }
}

impl<T> FusedIterator for Range<'_, T> {}

/// An owning iterator over the values of an [`RbTreeSet`], in order.
pub struct IntoIter<T, A: Allocator = Global> {
    inner: iter::IntoIter<T, (), A>,
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next().map(|(key, ())| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<T> {
        self.inner.next_back().map(|(key, ())| key)
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

#[cfg(test)]
mod tests {
    use super::RbTreeSet;
    use crate::compare::Greater;

    #[test]
    fn insert_ignores_duplicates() {
        let mut set = RbTreeSet::new();
        for value in [5, 3, 5, 1, 3] {
            set.insert(value);
        }
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), [1, 3, 5]);
        assert_eq!(set.count(&3), 1);
        set.tree.check_invariants();
    }

    #[test]
    fn take_and_remove() {
        let mut set = RbTreeSet::from(["a".to_string(), "b".to_string()]);
        assert_eq!(set.take("a"), Some("a".to_string()));
        assert_eq!(set.take("a"), None);
        assert!(set.remove("b"));
        assert!(!set.remove("b"));
        assert!(set.is_empty());
    }

    #[test]
    fn extremes_and_bounds() {
        let set: RbTreeSet<i32> = (0..50).map(|i| i * 2).collect();
        assert_eq!(set.first(), Some(&0));
        assert_eq!(set.last(), Some(&98));
        assert_eq!(set.lower_bound(&31).key(), Some(&32));
        assert_eq!(set.upper_bound(&32).key(), Some(&34));
        assert_eq!(set.get(&40), Some(&40));
        assert_eq!(set.range(10..16).rev().copied().collect::<Vec<_>>(), [14, 12, 10]);
    }

    #[test]
    fn reversed_set_orders_descending() {
        let mut set: RbTreeSet<i32, Greater> = RbTreeSet::with_compare(Greater);
        set.extend(&[1, 4, 2]);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), [4, 2, 1]);
    }

    #[test]
    fn comparisons_and_erase_range() {
        let mut a = RbTreeSet::from([1, 2, 3, 4]);
        let b = RbTreeSet::from([1, 2, 4]);
        assert!(a < b);
        assert_eq!(a.erase_range(3..=3), 1);
        assert_eq!(a, b);
        assert_eq!(a.erase_range(4..1), 0);
        assert_eq!(format!("{a:?}"), "{1, 2, 4}");
    }

    #[test]
    fn pops_from_both_ends() {
        let mut set = RbTreeSet::from([7, 8, 9]);
        assert_eq!(set.pop_first(), Some(7));
        assert_eq!(set.pop_last(), Some(9));
        assert_eq!(set.pop_last(), Some(8));
        assert_eq!(set.pop_first(), None);
    }
}
