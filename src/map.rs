//! An ordered map over [`RbTree`].

use core::borrow::Borrow;
use core::fmt;
use core::ops::{Index, RangeBounds};

use allocator_api2::alloc::{Allocator, Global};
use tracing::warn;

use crate::compare::{Compare, Less};
use crate::cursor::{Cursor, CursorMut};
use crate::error::{raise, Error, Result};
use crate::iter::{IntoIter, Iter, IterMut, Keys, Range, Values, ValuesMut};
use crate::tree::RbTree;

/// An ordered map with unique keys, backed by a red-black tree.
///
/// Unlike `std::collections::BTreeMap`, the ordering is a runtime value `C`
/// and every entry lives in its own node from the allocator `A`, so cursors
/// into the map stay valid across unrelated insertions and removals.
///
/// # Examples
///
/// ```
/// use rbtree_collections::RbTreeMap;
///
/// let mut movie_reviews = RbTreeMap::new();
///
/// // review some movies.
/// movie_reviews.insert("Office Space", "Deals with real issues in the workplace.");
/// movie_reviews.insert("Pulp Fiction", "Masterpiece.");
/// movie_reviews.insert("The Godfather", "Very enjoyable.");
///
/// // check for a specific one.
/// if !movie_reviews.contains_key("Les Misérables") {
///     println!("We've got {} reviews, but Les Misérables ain't one.", movie_reviews.len());
/// }
///
/// // oops, this review has a lot of spelling mistakes, let's delete it.
/// movie_reviews.remove("The Godfather");
///
/// // look up the values associated with some keys.
/// let to_find = ["Up!", "Office Space"];
/// for movie in &to_find {
///     match movie_reviews.get(movie) {
///         Some(review) => println!("{movie}: {review}"),
///         None => println!("{movie} is unreviewed."),
///     }
/// }
///
/// // iterate over everything.
/// for (movie, review) in &movie_reviews {
///     println!("{movie}: \"{review}\"");
/// }
/// ```
pub struct RbTreeMap<K, V, C = Less, A: Allocator = Global> {
    pub(crate) tree: RbTree<K, V, C, A>,
}

/// Orders map entries by their keys alone.
pub struct ValueCompare<'a, C> {
    key_comp: &'a C,
}

impl<K, V, C: Compare<K>> Compare<(K, V)> for ValueCompare<'_, C> {
    fn less(&self, l: &(K, V), r: &(K, V)) -> bool {
        self.key_comp.less(&l.0, &r.0)
    }
}

impl<C> Clone for ValueCompare<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for ValueCompare<'_, C> {}

impl<K, V> RbTreeMap<K, V> {
    /// Makes a new, empty `RbTreeMap`.
    ///
    /// Does not allocate anything on its own.
    pub fn new() -> Self {
        Self { tree: RbTree::new() }
    }
}

impl<K, V, C> RbTreeMap<K, V, C> {
    /// Makes a new, empty `RbTreeMap` ordered by `compare`.
    pub fn with_compare(compare: C) -> Self {
        Self {
            tree: RbTree::with_compare(compare),
        }
    }
}

impl<K, V, A: Allocator> RbTreeMap<K, V, Less, A> {
    pub fn new_in(alloc: A) -> Self {
        Self {
            tree: RbTree::new_in(alloc),
        }
    }
}

impl<K, V, C, A: Allocator> RbTreeMap<K, V, C, A> {
    pub fn with_compare_in(compare: C, alloc: A) -> Self {
        Self {
            tree: RbTree::with_compare_in(compare, alloc),
        }
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.tree.max_size()
    }

    /// Clears the map, removing all elements.
    pub fn clear(&mut self) {
        self.tree.clear()
    }

    pub fn swap(&mut self, other: &mut Self) {
        self.tree.swap(&mut other.tree)
    }

    pub fn key_comp(&self) -> &C {
        self.tree.key_comp()
    }

    /// A predicate ordering whole `(key, value)` entries by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::{Compare, RbTreeMap};
    ///
    /// let map: RbTreeMap<i32, &str> = RbTreeMap::new();
    /// let by_key = map.value_comp();
    /// assert!(by_key.less(&(1, "z"), &(2, "a")));
    /// assert!(!by_key.less(&(2, "a"), &(2, "z")));
    /// ```
    pub fn value_comp(&self) -> ValueCompare<'_, C> {
        ValueCompare {
            key_comp: self.tree.key_comp(),
        }
    }

    pub fn allocator(&self) -> &A {
        self.tree.allocator()
    }

    /// Inserts a key-value pair unless the key is already present.
    ///
    /// An existing entry keeps its value; the cursor points at it either way.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTreeMap;
    ///
    /// let mut map = RbTreeMap::new();
    /// assert!(map.insert(37, "a").1);
    /// assert!(!map.is_empty());
    ///
    /// assert!(!map.insert(37, "b").1);
    /// assert_eq!(map[&37], "a");
    /// ```
    pub fn insert(&mut self, key: K, val: V) -> (CursorMut<'_, K, V, C, A>, bool)
    where
        C: Compare<K>,
    {
        self.tree.insert(key, val)
    }

    pub fn try_insert(&mut self, key: K, val: V) -> Result<(CursorMut<'_, K, V, C, A>, bool)>
    where
        C: Compare<K>,
    {
        self.tree.try_insert(key, val)
    }

    /// Returns the value for `key`, inserting `V::default()` first if the key
    /// is missing.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTreeMap;
    ///
    /// let mut counts: RbTreeMap<&str, u32> = RbTreeMap::new();
    /// for word in ["a", "b", "a"] {
    ///     *counts.get_or_insert_default(word) += 1;
    /// }
    /// assert_eq!(counts[&"a"], 2);
    /// assert_eq!(counts[&"b"], 1);
    /// ```
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        C: Compare<K>,
        V: Default,
    {
        match self.try_get_or_insert_default(key) {
            Ok(val) => val,
            Err(err) => raise(err),
        }
    }

    pub fn try_get_or_insert_default(&mut self, key: K) -> Result<&mut V>
    where
        C: Compare<K>,
        V: Default,
    {
        let (node, _) = self.tree.entry_node(key, V::default)?;
        Ok(unsafe { &mut (*node.as_ptr()).val })
    }

    /// Returns the value for `key`, or [`Error::KeyNotFound`].
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::{Error, RbTreeMap};
    ///
    /// let map = RbTreeMap::from([(1, "a")]);
    /// assert_eq!(map.at(&1), Ok(&"a"));
    /// assert_eq!(map.at(&2), Err(Error::KeyNotFound));
    /// ```
    pub fn at<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.get(key).ok_or(Error::KeyNotFound)
    }

    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.get_mut(key).ok_or(Error::KeyNotFound)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.get_mut(key)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.get_key_value(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.contains_key(key)
    }

    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.count(key)
    }

    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V, C, A>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.find(key)
    }

    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V, C, A>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.find_mut(key)
    }

    pub fn lower_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V, C, A>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.lower_bound(key)
    }

    pub fn lower_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V, C, A>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.lower_bound_mut(key)
    }

    pub fn upper_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V, C, A>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.upper_bound(key)
    }

    pub fn upper_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V, C, A>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.upper_bound_mut(key)
    }

    pub fn equal_range<Q>(&self, key: &Q) -> (Cursor<'_, K, V, C, A>, Cursor<'_, K, V, C, A>)
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.equal_range(key)
    }

    pub fn range<Q, R>(&self, range: R) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
        R: RangeBounds<Q>,
    {
        self.tree.range(range)
    }

    /// Removes a key from the map, returning the value at the key if the key
    /// was previously in the map.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.remove(key)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.remove_entry(key)
    }

    pub fn erase<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.tree.erase(key)
    }

    /// Removes every entry whose key lies in `range` and returns how many
    /// were removed.
    ///
    /// A range whose start orders after its end is reported and ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTreeMap;
    ///
    /// let mut map: RbTreeMap<_, _> = (0..10).map(|i| (i, ())).collect();
    /// assert_eq!(map.erase_range(2..5), 3);
    /// assert_eq!(map.erase_range(8..6), 0);
    /// assert_eq!(map.len(), 7);
    /// ```
    pub fn erase_range<Q, R>(&mut self, range: R) -> usize
    where
        K: Borrow<Q>,
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

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first_key_value()
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last_key_value()
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.tree.pop_first()
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.tree.pop_last()
    }

    pub fn cursor_front(&self) -> Cursor<'_, K, V, C, A> {
        self.tree.cursor_front()
    }

    pub fn cursor_back(&self) -> Cursor<'_, K, V, C, A> {
        self.tree.cursor_back()
    }

    pub fn cursor_end(&self) -> Cursor<'_, K, V, C, A> {
        self.tree.cursor_end()
    }

    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, K, V, C, A> {
        self.tree.cursor_front_mut()
    }

    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, K, V, C, A> {
        self.tree.cursor_back_mut()
    }

    pub fn cursor_end_mut(&mut self) -> CursorMut<'_, K, V, C, A> {
        self.tree.cursor_end_mut()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        self.tree.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        self.tree.iter_mut()
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        self.tree.keys()
    }

    pub fn values(&self) -> Values<'_, K, V> {
        self.tree.values()
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        self.tree.values_mut()
    }
}

impl<K: Clone, V: Clone, C: Clone, A: Allocator + Clone> RbTreeMap<K, V, C, A> {
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            tree: self.tree.try_clone()?,
        })
    }
}

impl<K: Clone, V: Clone, C: Clone, A: Allocator + Clone> Clone for RbTreeMap<K, V, C, A> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K, V, C: Default, A: Allocator + Default> Default for RbTreeMap<K, V, C, A> {
    fn default() -> Self {
        Self {
            tree: RbTree::default(),
        }
    }
}

impl<K, Q: ?Sized, V, C, A: Allocator> Index<&Q> for RbTreeMap<K, V, C, A>
where
    K: Borrow<Q>,
    C: Compare<Q>,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the `RbTreeMap`.
    #[inline]
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K, V, C: Compare<K>, A: Allocator> Extend<(K, V)> for RbTreeMap<K, V, C, A> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        self.tree.extend(iter)
    }
}

impl<'a, K: Copy + 'a, V: Copy + 'a, C: Compare<K>, A: Allocator> Extend<(&'a K, &'a V)>
    for RbTreeMap<K, V, C, A>
{
    fn extend<T: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: T) {
        self.tree.extend(iter.into_iter().map(|(key, val)| (*key, *val)))
    }
}

impl<K, V, C: Compare<K> + Default> FromIterator<(K, V)> for RbTreeMap<K, V, C> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            tree: RbTree::from_iter(iter),
        }
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for RbTreeMap<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<K, V, C, A: Allocator> IntoIterator for RbTreeMap<K, V, C, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, A>;

    fn into_iter(self) -> IntoIter<K, V, A> {
        self.tree.into_iter()
    }
}

impl<'a, K, V, C, A: Allocator> IntoIterator for &'a RbTreeMap<K, V, C, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, C, A: Allocator> IntoIterator for &'a mut RbTreeMap<K, V, C, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C, A: Allocator> fmt::Debug for RbTreeMap<K, V, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.tree, f)
    }
}

impl<K: PartialEq, V: PartialEq, C, A: Allocator> PartialEq for RbTreeMap<K, V, C, A> {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}

impl<K: Eq, V: Eq, C, A: Allocator> Eq for RbTreeMap<K, V, C, A> {}

impl<K: PartialOrd, V: PartialOrd, C, A: Allocator> PartialOrd for RbTreeMap<K, V, C, A> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        self.tree.partial_cmp(&other.tree)
    }
}

impl<K: Ord, V: Ord, C, A: Allocator> Ord for RbTreeMap<K, V, C, A> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.tree.cmp(&other.tree)
    }
}

#[cfg(test)]
mod tests {
    use super::RbTreeMap;
    use crate::compare::Greater;
    use crate::error::Error;

    #[test]
    fn default_insertion_through_the_index_path() {
        let mut map = RbTreeMap::<i32, String>::new();
        map.get_or_insert_default(42).push_str("answer");
        assert_eq!(map.len(), 1);
        assert_eq!(map.find(&42).value().map(String::as_str), Some("answer"));
        map.get_or_insert_default(42).push('!');
        assert_eq!(map[&42], "answer!");
        map.tree.check_invariants();
    }

    #[test]
    fn at_reports_missing_keys() {
        let mut map = RbTreeMap::from([(1, 10), (2, 20)]);
        assert_eq!(map.at(&3), Err(Error::KeyNotFound));
        assert_eq!(map.at_mut(&3), Err(Error::KeyNotFound));
        assert_eq!(map.len(), 2);
        *map.at_mut(&2).unwrap() += 1;
        assert_eq!(map.at(&2), Ok(&21));
    }

    #[test]
    #[should_panic(expected = "no entry found for key")]
    fn index_panics_on_missing_key() {
        let map = RbTreeMap::from([(1, 10)]);
        let _ = map[&2];
    }

    #[test]
    fn relational_operators_follow_iteration_order() {
        let a = RbTreeMap::from([(1, 'a'), (2, 'b')]);
        let b = RbTreeMap::from([(1, 'a'), (2, 'c')]);
        let c = RbTreeMap::from([(1, 'a')]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert!(a < b);
        assert!(c < a);
        assert!(b > c);
        assert_eq!(a.cmp(&a.clone()), core::cmp::Ordering::Equal);
    }

    #[test]
    fn reversed_map() {
        let mut map = RbTreeMap::with_compare(Greater);
        map.extend([(1, "one"), (3, "three"), (2, "two")]);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), [3, 2, 1]);
        assert_eq!(map.first_key_value(), Some((&3, &"three")));
        assert_eq!(map.range(3..=2).count(), 2);
    }

    #[test]
    fn erase_range_counts_and_tolerates_inversion() {
        let mut map: RbTreeMap<i32, i32> = (0..20).map(|i| (i, i)).collect();
        assert_eq!(map.erase_range(5..=9), 5);
        assert_eq!(map.erase_range(15..10), 0);
        assert_eq!(map.len(), 15);
        assert!(!map.contains_key(&7));
        map.tree.check_invariants();
    }

    #[test]
    fn extend_from_references() {
        let source = RbTreeMap::from([(1, 1.5), (2, 2.5)]);
        let mut copy: RbTreeMap<i32, f64> = RbTreeMap::new();
        copy.extend(&source);
        assert_eq!(copy, source);
    }

    #[test]
    fn debug_prints_as_a_map() {
        let map = RbTreeMap::from([(2, "b"), (1, "a")]);
        assert_eq!(format!("{map:?}"), r#"{1: "a", 2: "b"}"#);
    }
}
