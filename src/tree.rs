use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;
use core::mem::{self, ManuallyDrop};
use core::ops::{Bound, RangeBounds};
use core::ptr;

use allocator_api2::alloc::{Allocator, Global};
use tracing::trace;

use crate::alloc::{allocate_node, destroy_node, max_len, take_node};
use crate::compare::{Compare, Less};
use crate::cursor::{Cursor, CursorMut};
use crate::error::{raise, Error, Result};
use crate::iter::{IntoIter, Iter, IterMut, Keys, Range, Values, ValuesMut};
use crate::node::{
    self, dir_of, first, is_black, last, predecessor, successor, Color, Dir, Link, Node, NodePtr,
};

/// The one-past-the-end position of a tree.
///
/// It owns no payload; all it remembers is the maximum, so that stepping back
/// from the end lands on the last element without a descent.
pub(crate) struct Boundary<K, V> {
    pub(crate) last: Link<K, V>,
}

/// An ordered collection of key-value pairs kept in a red-black tree.
///
/// Keys are ordered by the strict "less than" predicate `C` and nodes are
/// obtained from the allocator `A`. Every node keeps its address for as long as
/// it is in the tree, so a position into the tree survives any insertion or
/// removal that does not remove that very element.
pub struct RbTree<K, V, C = Less, A: Allocator = Global> {
    pub(crate) root: Link<K, V>,
    pub(crate) leftmost: Link<K, V>,
    pub(crate) boundary: Boundary<K, V>,
    pub(crate) len: usize,
    pub(crate) compare: C,
    pub(crate) alloc: A,
    _marker: PhantomData<(K, V)>,
}

pub(crate) enum SearchResult<K, V> {
    Found(NodePtr<K, V>),
    // option because insertion could be in an empty tree
    PotentialParentForInsertion(Link<K, V>, Dir),
}

use SearchResult::*;

impl<K, V> RbTree<K, V> {
    /// Makes a new, empty `RbTree` ordered by `Ord`.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTree;
    ///
    /// let mut tree = RbTree::new();
    ///
    /// // entries can now be inserted into the empty tree
    /// tree.insert(1, "a");
    /// ```
    pub fn new() -> Self {
        Self::with_compare_in(Less, Global)
    }
}

impl<K, V, C> RbTree<K, V, C> {
    /// Makes a new, empty `RbTree` ordered by `compare`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::{Greater, RbTree};
    ///
    /// let mut tree = RbTree::with_compare(Greater);
    /// tree.insert(1, ());
    /// tree.insert(2, ());
    /// assert_eq!(tree.keys().copied().collect::<Vec<_>>(), [2, 1]);
    /// ```
    pub fn with_compare(compare: C) -> Self {
        Self::with_compare_in(compare, Global)
    }
}

impl<K, V, A: Allocator> RbTree<K, V, Less, A> {
    /// Makes a new, empty `RbTree` whose nodes come from `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self::with_compare_in(Less, alloc)
    }
}

impl<K, V, C, A: Allocator> RbTree<K, V, C, A> {
    /// Makes a new, empty `RbTree` ordered by `compare` whose nodes come from
    /// `alloc`.
    pub fn with_compare_in(compare: C, alloc: A) -> Self {
        Self {
            root: None,
            leftmost: None,
            boundary: Boundary { last: None },
            len: 0,
            compare,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The largest number of elements this tree could ever hold.
    pub fn max_size(&self) -> usize {
        max_len::<K, V>()
    }

    /// The ordering predicate the tree was built with.
    pub fn key_comp(&self) -> &C {
        &self.compare
    }

    /// The allocator the tree takes its nodes from.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Removes every element, destroying them in post-order.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTree;
    ///
    /// let mut a = RbTree::new();
    /// a.insert(1, "a");
    /// a.clear();
    /// assert!(a.is_empty());
    /// ```
    pub fn clear(&mut self) {
        let len = mem::replace(&mut self.len, 0);
        if len > 0 {
            trace!(len, "clearing tree");
        }
        self.leftmost = None;
        self.boundary.last = None;

        // children are detached on the way down, so a node is destroyed once
        // it is reached with no children left
        let mut link = self.root.take();
        while let Some(node) = link {
            unsafe {
                let n = &mut *node.as_ptr();
                if let Some(left) = n.left.take() {
                    link = Some(left);
                } else if let Some(right) = n.right.take() {
                    link = Some(right);
                } else {
                    link = n.parent;
                    destroy_node(&self.alloc, node);
                }
            }
        }
    }

    /// Exchanges the contents of two trees, comparators and allocators
    /// included, without touching any node.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Returns the first key-value pair in the tree.
    /// The key in this pair is the minimum key in the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// assert_eq!(tree.first_key_value(), None);
    /// tree.insert(1, "b");
    /// tree.insert(2, "a");
    /// assert_eq!(tree.first_key_value(), Some((&1, &"b")));
    /// ```
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.leftmost
            .map(|node| unsafe { (&(*node.as_ptr()).key, &(*node.as_ptr()).val) })
    }

    /// Returns the last key-value pair in the tree.
    /// The key in this pair is the maximum key in the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert(1, "b");
    /// tree.insert(2, "a");
    /// assert_eq!(tree.last_key_value(), Some((&2, &"a")));
    /// ```
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.boundary
            .last
            .map(|node| unsafe { (&(*node.as_ptr()).key, &(*node.as_ptr()).val) })
    }

    /// Removes and returns the first element.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let node = self.leftmost?;
        Some(unsafe { self.remove_node(node) })
    }

    /// Removes and returns the last element.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let node = self.boundary.last?;
        Some(unsafe { self.remove_node(node) })
    }

    /// A cursor at the first element, or at the end if the tree is empty.
    pub fn cursor_front(&self) -> Cursor<'_, K, V, C, A> {
        Cursor::new(self.leftmost, self)
    }

    /// A cursor at the last element, or at the end if the tree is empty.
    pub fn cursor_back(&self) -> Cursor<'_, K, V, C, A> {
        Cursor::new(self.boundary.last, self)
    }

    /// A cursor at the end position, one past the last element.
    pub fn cursor_end(&self) -> Cursor<'_, K, V, C, A> {
        Cursor::new(None, self)
    }

    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, K, V, C, A> {
        CursorMut::new(self.leftmost, self)
    }

    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, K, V, C, A> {
        CursorMut::new(self.boundary.last, self)
    }

    pub fn cursor_end_mut(&mut self) -> CursorMut<'_, K, V, C, A> {
        CursorMut::new(None, self)
    }

    /// Gets an iterator over the entries of the tree, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.leftmost, self.boundary.last, self.len)
    }

    /// Gets a mutable iterator over the entries of the tree, sorted by key.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(self.leftmost, self.boundary.last, self.len)
    }

    /// Gets an iterator over the keys of the tree, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Gets an iterator over the values of the tree, in order by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Gets a mutable iterator over the values of the tree, in order by key.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    /// The element after `link`; the end position wraps around to the front.
    pub(crate) fn next_link(&self, link: Link<K, V>) -> Link<K, V> {
        match link {
            Some(node) => unsafe { successor(node) },
            None => self.leftmost,
        }
    }

    /// The element before `link`; the end position steps back to the maximum.
    pub(crate) fn prev_link(&self, link: Link<K, V>) -> Link<K, V> {
        match link {
            Some(node) => unsafe { predecessor(node) },
            None => self.boundary.last,
        }
    }

    pub(crate) fn search_tree<Q>(&self, key: &Q) -> SearchResult<K, V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let mut node_option = self.root;
        let mut parent_option = None;
        let mut dir = Dir::Left;

        while let Some(node) = node_option {
            parent_option = node_option;
            let node_key = unsafe { (*node.as_ptr()).key.borrow() };
            if self.compare.less(key, node_key) {
                dir = Dir::Left;
            } else if self.compare.less(node_key, key) {
                dir = Dir::Right;
            } else {
                return Found(node);
            }
            node_option = unsafe { (*node.as_ptr()).child(dir) };
        }

        PotentialParentForInsertion(parent_option, dir)
    }

    pub(crate) fn find_link<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        match self.search_tree(key) {
            Found(node) => Some(node),
            PotentialParentForInsertion(..) => None,
        }
    }

    /// The first node whose key does not order before `key`.
    fn lower_bound_link<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let mut node_option = self.root;
        let mut best = None;
        while let Some(node) = node_option {
            let node_ref = unsafe { &*node.as_ptr() };
            if self.compare.less(node_ref.key.borrow(), key) {
                node_option = node_ref.right;
            } else {
                best = Some(node);
                node_option = node_ref.left;
            }
        }
        best
    }

    /// The first node whose key orders strictly after `key`.
    fn upper_bound_link<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let mut node_option = self.root;
        let mut best = None;
        while let Some(node) = node_option {
            let node_ref = unsafe { &*node.as_ptr() };
            if self.compare.less(key, node_ref.key.borrow()) {
                best = Some(node);
                node_option = node_ref.left;
            } else {
                node_option = node_ref.right;
            }
        }
        best
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the tree's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert(1, "a");
    /// assert_eq!(tree.get(&1), Some(&"a"));
    /// assert_eq!(tree.get(&2), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.find_link(key)
            .map(|node| unsafe { &(*node.as_ptr()).val })
    }

    /// Returns the key-value pair corresponding to the supplied key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.find_link(key)
            .map(|node| unsafe { (&(*node.as_ptr()).key, &(*node.as_ptr()).val) })
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.find_link(key)
            .map(|node| unsafe { &mut (*node.as_ptr()).val })
    }

    /// Returns `true` if the tree contains an element for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.find_link(key).is_some()
    }

    /// The number of elements equivalent to `key`: either 0 or 1.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        usize::from(self.contains_key(key))
    }

    /// A cursor at the element equivalent to `key`, or at the end if there is
    /// none.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTree;
    ///
    /// let tree: RbTree<_, _> = [(1, 'a'), (3, 'c')].into_iter().collect();
    /// assert_eq!(tree.find(&3).value(), Some(&'c'));
    /// assert!(tree.find(&2).is_end());
    /// ```
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V, C, A>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        Cursor::new(self.find_link(key), self)
    }

    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V, C, A>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let link = self.find_link(key);
        CursorMut::new(link, self)
    }

    /// A cursor at the first element whose key does not order before `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTree;
    ///
    /// let tree: RbTree<_, _> = [(10, ()), (20, ()), (30, ())].into_iter().collect();
    /// assert_eq!(tree.lower_bound(&20).key(), Some(&20));
    /// assert_eq!(tree.lower_bound(&21).key(), Some(&30));
    /// assert!(tree.lower_bound(&31).is_end());
    /// ```
    pub fn lower_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V, C, A>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        Cursor::new(self.lower_bound_link(key), self)
    }

    pub fn lower_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V, C, A>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let link = self.lower_bound_link(key);
        CursorMut::new(link, self)
    }

    /// A cursor at the first element whose key orders strictly after `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTree;
    ///
    /// let tree: RbTree<_, _> = [(10, ()), (20, ()), (30, ())].into_iter().collect();
    /// assert_eq!(tree.upper_bound(&20).key(), Some(&30));
    /// assert_eq!(tree.upper_bound(&5).key(), Some(&10));
    /// assert!(tree.upper_bound(&30).is_end());
    /// ```
    pub fn upper_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V, C, A>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        Cursor::new(self.upper_bound_link(key), self)
    }

    pub fn upper_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V, C, A>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let link = self.upper_bound_link(key);
        CursorMut::new(link, self)
    }

    /// The pair `(lower_bound(key), upper_bound(key))`.
    pub fn equal_range<Q>(&self, key: &Q) -> (Cursor<'_, K, V, C, A>, Cursor<'_, K, V, C, A>)
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        (self.lower_bound(key), self.upper_bound(key))
    }

    /// Resolves `range` to the half-open node span `[start, end)` it covers.
    ///
    /// Returns `None` when the start bound orders after the end bound.
    pub(crate) fn span<Q, R>(&self, range: &R) -> Option<(Link<K, V>, Link<K, V>)>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
        R: RangeBounds<Q>,
    {
        let (start_bound, end_bound) = (range.start_bound(), range.end_bound());
        match (start_bound, end_bound) {
            (
                Bound::Included(start) | Bound::Excluded(start),
                Bound::Included(end) | Bound::Excluded(end),
            ) => {
                if self.compare.less(end, start) {
                    return None;
                }
                let same = !self.compare.less(start, end);
                if same && !matches!((start_bound, end_bound), (Bound::Included(_), Bound::Included(_))) {
                    return Some((None, None));
                }
            }
            _ => {}
        }

        let start = match start_bound {
            Bound::Included(key) => self.lower_bound_link(key),
            Bound::Excluded(key) => self.upper_bound_link(key),
            Bound::Unbounded => self.leftmost,
        };
        let end = match end_bound {
            Bound::Included(key) => self.upper_bound_link(key),
            Bound::Excluded(key) => self.lower_bound_link(key),
            Bound::Unbounded => None,
        };
        Some((start, end))
    }

    /// Gets a double-ended iterator over a sub-range of the tree.
    ///
    /// A range whose start orders after its end is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTree;
    ///
    /// let tree: RbTree<_, _> = (1..=9).map(|k| (k, k * 10)).collect();
    /// let middle: Vec<_> = tree.range(3..6).map(|(k, _)| *k).collect();
    /// assert_eq!(middle, [3, 4, 5]);
    /// assert_eq!(tree.range(7..3).count(), 0);
    /// ```
    pub fn range<Q, R>(&self, range: R) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
        R: RangeBounds<Q>,
    {
        match self.span(&range) {
            Some((start, end)) if start.is_some() && start != end => {
                Range::new(start, self.prev_link(end))
            }
            _ => Range::new(None, None),
        }
    }

    /// Inserts a key-value pair unless an equivalent key is already present.
    ///
    /// Returns a cursor at the element with that key and whether a new
    /// element was inserted. An existing element is left untouched and the
    /// given pair is dropped.
    ///
    /// Fails with [`Error::LengthExceeded`] before allocating if the tree is
    /// full, and with [`Error::AllocFailed`] if the allocator refuses; either
    /// way the tree is unchanged.
    pub fn try_insert(&mut self, key: K, val: V) -> Result<(CursorMut<'_, K, V, C, A>, bool)>
    where
        C: Compare<K>,
    {
        let (node, inserted) = self.insert_node(key, val)?;
        Ok((CursorMut::new(Some(node), self), inserted))
    }

    /// Inserts a key-value pair unless an equivalent key is already present.
    ///
    /// See [`RbTree::try_insert`]; this version aborts on allocation failure
    /// like the std collections do.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// assert!(tree.insert(37, "a").1);
    /// assert!(!tree.is_empty());
    ///
    /// let (cursor, inserted) = tree.insert(37, "b");
    /// assert!(!inserted);
    /// assert_eq!(cursor.value(), Some(&"a"));
    /// ```
    pub fn insert(&mut self, key: K, val: V) -> (CursorMut<'_, K, V, C, A>, bool)
    where
        C: Compare<K>,
    {
        match self.insert_node(key, val) {
            Ok((node, inserted)) => (CursorMut::new(Some(node), self), inserted),
            Err(err) => raise(err),
        }
    }

    pub(crate) fn insert_node(&mut self, key: K, val: V) -> Result<(NodePtr<K, V>, bool)>
    where
        C: Compare<K>,
    {
        self.entry_node(key, || val)
    }

    /// Finds the element for `key`, creating it with `make` if it is missing.
    pub(crate) fn entry_node<F>(&mut self, key: K, make: F) -> Result<(NodePtr<K, V>, bool)>
    where
        C: Compare<K>,
        F: FnOnce() -> V,
    {
        match self.search_tree(&key) {
            Found(node) => Ok((node, false)),
            PotentialParentForInsertion(parent, dir) => {
                self.link_new(parent, dir, key, make()).map(|node| (node, true))
            }
        }
    }

    /// Inserts `key` using `hint` as a guess for its position: if the key
    /// belongs immediately before `hint`, or immediately after it, the node is
    /// attached without a descent from the root.
    pub(crate) fn insert_hinted_node(
        &mut self,
        hint: Link<K, V>,
        key: K,
        val: V,
    ) -> Result<(NodePtr<K, V>, bool)>
    where
        C: Compare<K>,
    {
        let slot = match unsafe { self.slot_near(hint, &key) } {
            Some(slot) => slot,
            None => self.search_tree(&key),
        };
        match slot {
            Found(node) => Ok((node, false)),
            PotentialParentForInsertion(parent, dir) => {
                self.link_new(parent, dir, key, val).map(|node| (node, true))
            }
        }
    }

    unsafe fn slot_near(&self, hint: Link<K, V>, key: &K) -> Option<SearchResult<K, V>>
    where
        C: Compare<K>,
    {
        let less = |l: &K, r: &K| self.compare.less(l, r);

        let Some(hint_node) = hint else {
            // a hint at the end only helps a new maximum
            let last = self.boundary.last?;
            return less(&(*last.as_ptr()).key, key)
                .then_some(PotentialParentForInsertion(Some(last), Dir::Right));
        };

        let hint_key = &(*hint_node.as_ptr()).key;
        let (dir, neighbour) = if less(key, hint_key) {
            (Dir::Left, predecessor(hint_node))
        } else if less(hint_key, key) {
            (Dir::Right, successor(hint_node))
        } else {
            return Some(Found(hint_node));
        };

        match neighbour {
            // hint is the extreme on that side, so it has no child there
            None => Some(PotentialParentForInsertion(Some(hint_node), dir)),
            Some(neighbour) => {
                let neighbour_key = &(*neighbour.as_ptr()).key;
                let fits = match dir {
                    Dir::Left => less(neighbour_key, key),
                    Dir::Right => less(key, neighbour_key),
                };
                if !fits {
                    return None;
                }
                // either the hint has a free slot facing the key, or the
                // neighbour is the extreme of that subtree and has one facing back
                Some(match (*hint_node.as_ptr()).child(dir) {
                    None => PotentialParentForInsertion(Some(hint_node), dir),
                    Some(_) => PotentialParentForInsertion(Some(neighbour), !dir),
                })
            }
        }
    }

    /// Hangs a new red node under `parent` on side `dir` and rebalances.
    fn link_new(&mut self, parent: Link<K, V>, dir: Dir, key: K, val: V) -> Result<NodePtr<K, V>> {
        let max = self.max_size();
        if self.len >= max {
            return Err(Error::LengthExceeded {
                requested: self.len.saturating_add(1),
                max,
            });
        }

        let new_node = allocate_node(&self.alloc, Node::new(parent, key, val))?;

        unsafe {
            // update parent's left or right child to the new node
            match parent {
                Some(parent) => *(*parent.as_ptr()).child_mut(dir) = Some(new_node),
                None => self.root = Some(new_node), // tree was empty
            }

            // hanging off the outer side of an extreme makes a new extreme
            if parent.is_none() || (dir == Dir::Left && parent == self.leftmost) {
                self.leftmost = Some(new_node);
            }
            if parent.is_none() || (dir == Dir::Right && parent == self.boundary.last) {
                self.boundary.last = Some(new_node);
            }

            self.insert_fixup(new_node);
        }

        self.len += 1;

        Ok(new_node)
    }

    //
    //     g                  g
    //     |                  |
    //     n         -->      c
    //    / \                / \
    //  a    c              n   z
    //      / \            / \
    //     i   z          a   i
    //
    // Rotating `n` towards `dir` (left above): the child `c` on the other side
    // takes n's place, n becomes c's `dir` child and c's inner subtree `i`
    // moves across to n.
    unsafe fn rotate_towards(&mut self, node: NodePtr<K, V>, dir: Dir) {
        // rotation is not possible without a child on the other side
        let Some(pivot) = (*node.as_ptr()).child(!dir) else {
            return;
        };

        let inner = (*pivot.as_ptr()).child(dir);
        *(*node.as_ptr()).child_mut(!dir) = inner;
        if let Some(inner) = inner {
            (*inner.as_ptr()).parent = Some(node);
        }

        // pivot's parent becomes node's parent
        self.transplant(node, Some(pivot));

        *(*pivot.as_ptr()).child_mut(dir) = Some(node);
        (*node.as_ptr()).parent = Some(pivot);
    }

    unsafe fn rotate_left(&mut self, node: NodePtr<K, V>) {
        self.rotate_towards(node, Dir::Left)
    }

    unsafe fn rotate_right(&mut self, node: NodePtr<K, V>) {
        self.rotate_towards(node, Dir::Right)
    }

    unsafe fn rotate(&mut self, node: NodePtr<K, V>, dir: Dir) {
        match dir {
            Dir::Left => self.rotate_left(node),
            Dir::Right => self.rotate_right(node),
        }
    }

    unsafe fn insert_fixup(&mut self, mut node: NodePtr<K, V>) {
        while let Some(mut parent) = (*node.as_ptr()).parent {
            // loop invariant: node is red

            // if parent is black, we are done
            if (*parent.as_ptr()).is_black() {
                break;
            }

            // since parent is red and root is always black, grandparent will exist
            let gparent = (*parent.as_ptr())
                .parent
                .expect("where are you grandparent?");
            let side = dir_of(parent, gparent);
            let uncle_option = (*gparent.as_ptr()).child(!side);

            match uncle_option {
                Some(uncle) if (*uncle.as_ptr()).is_red() => {
                    // case 1: node's uncle is red.
                    //
                    // action: flip colors
                    //
                    // indicate color with case: black is uppercase and red is lowercase
                    //
                    //       G            g
                    //      / \          / \
                    //     p   u  -->   P   U
                    //    /            /
                    //   n            n
                    //
                    // since g's parent might be red, need to recurse at g
                    (*parent.as_ptr()).color = Color::Black;
                    (*uncle.as_ptr()).color = Color::Black;
                    (*gparent.as_ptr()).color = Color::Red;
                    node = gparent;
                }
                _ => {
                    if dir_of(node, parent) != side {
                        // case 2: uncle is black (remember nil leaves are black too)
                        // and node is an inner grandchild
                        //
                        // action: rotate at parent towards parent's side
                        //
                        //      G             G
                        //     / \           / \
                        //    p   U  -->    n   U
                        //     \           /
                        //      n         p
                        //
                        // fall through to case 3 to fix red-property
                        self.rotate(parent, side);
                        parent = node;
                    }

                    // case 3: uncle is black and node is an outer grandchild
                    //
                    // action: rotate at grandparent away from node's side
                    //
                    //        G           P
                    //       / \         / \
                    //      p   U  -->  n   g
                    //     /                 \
                    //    n                   U
                    //
                    (*parent.as_ptr()).color = Color::Black;
                    (*gparent.as_ptr()).color = Color::Red;
                    self.rotate(gparent, !side);
                    break;
                }
            }
        }

        if let Some(root) = self.root {
            (*root.as_ptr()).color = Color::Black;
        }
    }

    /// Removes the entry for `key`, returning it if it was present.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree_collections::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert(1, "a");
    /// assert_eq!(tree.remove_entry(&1), Some((1, "a")));
    /// assert_eq!(tree.remove_entry(&1), None);
    /// ```
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let node = self.find_link(key)?;
        Some(unsafe { self.remove_node(node) })
    }

    /// Removes a key from the tree, returning the value at the key if the key
    /// was previously in the tree.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.remove_entry(key).map(|(_, val)| val)
    }

    /// Removes the element for `key`, returning how many were removed.
    pub fn erase<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        usize::from(self.remove_entry(key).is_some())
    }

    /// Removes every element in `range`, returning how many were removed.
    ///
    /// A range whose start orders after its end removes nothing.
    pub fn erase_range<Q, R>(&mut self, range: R) -> usize
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
        R: RangeBounds<Q>,
    {
        match self.span(&range) {
            Some((start, end)) => self.erase_span(start, end),
            None => 0,
        }
    }

    /// Removes the nodes in `[start, end)`.
    pub(crate) fn erase_span(&mut self, start: Link<K, V>, end: Link<K, V>) -> usize {
        let mut removed = 0;
        let mut link = start;
        while link != end {
            let Some(node) = link else {
                break;
            };
            unsafe {
                link = successor(node);
                drop(self.remove_node(node));
            }
            removed += 1;
        }
        removed
    }

    /// Unlinks `node`, rebalances, and hands back its payload.
    ///
    /// When `node` has two children its in-order successor *node* is moved
    /// into its place, so no other node changes address.
    ///
    /// # Safety
    ///
    /// `node` must belong to this tree.
    pub(crate) unsafe fn remove_node(&mut self, node: NodePtr<K, V>) -> (K, V) {
        // keep the cached extremes pointing at live nodes
        if self.leftmost == Some(node) {
            self.leftmost = successor(node);
        }
        if self.boundary.last == Some(node) {
            self.boundary.last = predecessor(node);
        }

        let mut rebalance = None;

        match ((*node.as_ptr()).left, (*node.as_ptr()).right) {
            (None, child_option) | (child_option, None) => {
                // case 1: node to erase has at most 1 child
                //
                // a lone child must be red due to the black-property and
                // node must be black due to the red-property
                self.transplant(node, child_option);
                match child_option {
                    Some(child) => {
                        (*child.as_ptr()).color = Color::Black;
                    }
                    None => {
                        // no children! need to rebalance only if the node is black
                        if (*node.as_ptr()).is_black() {
                            rebalance = (*node.as_ptr()).parent;
                        }
                    }
                }
            }
            (Some(left_child), Some(right_child)) => {
                let successor = first(right_child);
                let successor_right_child_option = (*successor.as_ptr()).right;
                let successor_color = (*successor.as_ptr()).color;

                // new parent of successor's right child
                let successor_right_child_parent = if successor == right_child {
                    // case 2: node's successor is its right child
                    //
                    //     (n)          (s)
                    //     / \          / \
                    //   (x) (s)  ->  (x) (c)
                    //         \
                    //         (c)
                    //
                    successor
                } else {
                    // case 3: node's successor is leftmost under its right child subtree
                    //
                    //     (n)          (s)
                    //     / \          / \
                    //   (x) (y)  ->  (x) (y)
                    //       /            /
                    //     (p)          (p)
                    //     /            /
                    //   (s)          (c)
                    //     \
                    //     (c)
                    //
                    let successor_parent = (*successor.as_ptr())
                        .parent
                        .expect("successor below the right child has a parent");

                    // replace successor by its right child
                    self.transplant(successor, successor_right_child_option);

                    // node's right child becomes successor's right child
                    (*successor.as_ptr()).right = Some(right_child);
                    (*right_child.as_ptr()).parent = Some(successor);

                    successor_parent
                };

                // replace node by its successor
                self.transplant(node, Some(successor));

                // give node's left child to its successor
                (*successor.as_ptr()).left = Some(left_child);
                (*left_child.as_ptr()).parent = Some(successor);

                // give node's color to its successor
                (*successor.as_ptr()).color = (*node.as_ptr()).color;

                if let Some(successor_right_child) = successor_right_child_option {
                    // successor's right (and only) child must be red due to the black-property and
                    // successor must have been black due to the red-property
                    (*successor_right_child.as_ptr()).color = Color::Black;
                } else if successor_color == Color::Black {
                    // a black leaf left its old slot: that path is now one black short
                    rebalance = Some(successor_right_child_parent);
                }
            }
        }

        if let Some(rebalance_node) = rebalance {
            self.remove_fixup(rebalance_node);
        }

        self.len -= 1;

        take_node(&self.alloc, node)
    }

    unsafe fn transplant(&mut self, to_replace: NodePtr<K, V>, replacement_option: Link<K, V>) {
        if !node::replace_in_parent(to_replace, replacement_option) {
            self.root = replacement_option;
        }
    }

    // Entered when a black leaf was spliced out below `parent`, leaving a nil
    // that is one black short. The nil side is found by comparing links.
    unsafe fn remove_fixup(&mut self, mut parent: NodePtr<K, V>) {
        let mut node_option = None;
        while node_option != self.root && is_black(node_option) {
            let side = if node_option == (*parent.as_ptr()).left {
                Dir::Left
            } else {
                Dir::Right
            };

            // SAFETY: sibling must exist since all leaf paths going through
            // parent and node have 1 less black node count
            let mut sibling = (*parent.as_ptr()).child(!side).expect("missing sibling");
            if (*sibling.as_ptr()).is_red() {
                // case 1: node's sibling is red
                //
                // action: rotate at parent towards node
                //
                //     P               S
                //    / \             / \
                //   N   s    -->    p   So
                //      / \         / \
                //     Si  So      N   Si
                //
                (*sibling.as_ptr()).color = Color::Black;
                (*parent.as_ptr()).color = Color::Red;
                self.rotate(parent, side);
                // sibling must have black children, since the leaf paths through
                // parent and sibling hasn't had an extra black till now
                sibling = (*parent.as_ptr())
                    .child(!side)
                    .expect("red sibling must have black children");
            }

            if is_black((*sibling.as_ptr()).child(!side)) {
                let inner_option = (*sibling.as_ptr()).child(side);
                if is_black(inner_option) {
                    // case 2: sibling is black and both its children are black
                    //
                    // action: flip sibling's color
                    //
                    // (p could be either color here)
                    //
                    //    (p)           (p)
                    //    / \           / \
                    //   N   S    -->  N   s
                    //      / \           / \
                    //     Si  So        Si  So
                    //
                    // fix any black-property violation by flipping p to black
                    // if it was red or by recursing at p.
                    //
                    (*sibling.as_ptr()).color = Color::Red;
                    if (*parent.as_ptr()).is_red() {
                        (*parent.as_ptr()).color = Color::Black;
                    } else {
                        node_option = Some(parent);
                        if let Some(gparent) = (*parent.as_ptr()).parent {
                            parent = gparent;
                            continue;
                        }
                    }
                    break;
                }

                // case 3: sibling is black, its inner child is red and outer is black
                //
                // action: color flips & rotate at sibling away from node
                //
                //    (p)           (p)
                //    / \           / \
                //   N   S    -->  N   Si
                //      / \             \
                //     si  So            s
                //                        \
                //                         So
                //
                let inner = inner_option.expect("sibling's inner child empty!");
                (*inner.as_ptr()).color = Color::Black;
                (*sibling.as_ptr()).color = Color::Red;
                self.rotate(sibling, !side);
                // new sibling is original sibling's inner child
                sibling = inner;
            }

            // case 4: sibling is black, sibling's outer child is red
            //
            // action: color flips and rotate at parent towards node
            //
            //     (p)             (s)
            //     / \             / \
            //    N   S     -->   P   So
            //       / \         / \
            //     (si) so      N  (si)
            //
            let outer = (*sibling.as_ptr())
                .child(!side)
                .expect("sibling's outer child empty!");
            (*sibling.as_ptr()).color = (*parent.as_ptr()).color;
            (*parent.as_ptr()).color = Color::Black;
            (*outer.as_ptr()).color = Color::Black;

            self.rotate(parent, side);
            node_option = self.root;
            break;
        }

        if let Some(node) = node_option {
            (*node.as_ptr()).color = Color::Black;
        }
    }
}

impl<K: Clone, V: Clone, C: Clone, A: Allocator + Clone> RbTree<K, V, C, A> {
    /// Deep-copies the tree, preserving its exact shape and colors.
    ///
    /// Nodes are copied in pre-order and linked into the copy as soon as they
    /// exist, so a failure part way through releases everything copied so far.
    pub fn try_clone(&self) -> Result<Self> {
        let mut out = Self::with_compare_in(self.compare.clone(), self.alloc.clone());
        let Some(root) = self.root else {
            return Ok(out);
        };
        trace!(len = self.len, "cloning tree");

        unsafe {
            let new_root = out.copy_node(root, None)?;
            out.root = Some(new_root);

            let mut stack = vec![(root, new_root)];
            while let Some((src, dst)) = stack.pop() {
                // right first, so the left subtree is copied first
                for dir in [Dir::Right, Dir::Left] {
                    if let Some(src_child) = (*src.as_ptr()).child(dir) {
                        let dst_child = out.copy_node(src_child, Some(dst))?;
                        *(*dst.as_ptr()).child_mut(dir) = Some(dst_child);
                        stack.push((src_child, dst_child));
                    }
                }
            }

            out.leftmost = Some(first(new_root));
            out.boundary.last = Some(last(new_root));
        }

        Ok(out)
    }

    unsafe fn copy_node(&mut self, src: NodePtr<K, V>, parent: Link<K, V>) -> Result<NodePtr<K, V>> {
        let src = &*src.as_ptr();
        let mut node = Node::new(parent, src.key.clone(), src.val.clone());
        node.color = src.color;
        let node = allocate_node(&self.alloc, node)?;
        self.len += 1;
        Ok(node)
    }
}

impl<K: Clone, V: Clone, C: Clone, A: Allocator + Clone> Clone for RbTree<K, V, C, A> {
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(tree) => tree,
            Err(err) => raise(err),
        }
    }
}

impl<K, V, C: Default, A: Allocator + Default> Default for RbTree<K, V, C, A> {
    fn default() -> Self {
        Self::with_compare_in(C::default(), A::default())
    }
}

impl<K, V, C, A: Allocator> Drop for RbTree<K, V, C, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V, C, A: Allocator> IntoIterator for RbTree<K, V, C, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, A>;

    fn into_iter(self) -> IntoIter<K, V, A> {
        let me = ManuallyDrop::new(self);
        // SAFETY: `me` is never dropped, so each of these is moved out once
        let (compare, alloc) = unsafe { (ptr::read(&me.compare), ptr::read(&me.alloc)) };
        drop(compare);
        IntoIter::new(me.leftmost, me.boundary.last, me.len, alloc)
    }
}

impl<'a, K, V, C, A: Allocator> IntoIterator for &'a RbTree<K, V, C, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, C, A: Allocator> IntoIterator for &'a mut RbTree<K, V, C, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K, V, C: Compare<K>, A: Allocator> Extend<(K, V)> for RbTree<K, V, C, A> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, val) in iter {
            self.insert(key, val);
        }
    }
}

impl<K, V, C: Compare<K> + Default> FromIterator<(K, V)> for RbTree<K, V, C> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut tree = Self::with_compare(C::default());
        tree.extend(iter);
        tree
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C, A: Allocator> fmt::Debug for RbTree<K, V, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq, C, A: Allocator> PartialEq for RbTree<K, V, C, A> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, C, A: Allocator> Eq for RbTree<K, V, C, A> {}

impl<K: PartialOrd, V: PartialOrd, C, A: Allocator> PartialOrd for RbTree<K, V, C, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K: Ord, V: Ord, C, A: Allocator> Ord for RbTree<K, V, C, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

#[cfg(test)]
impl<K, V, C: Compare<K>, A: Allocator> RbTree<K, V, C, A> {
    /// Asserts every red-black and bookkeeping invariant, returning the black
    /// height (nil leaves included).
    pub(crate) fn check_invariants(&self) -> usize {
        unsafe fn walk<K, V>(
            node_option: Link<K, V>,
            parent: Link<K, V>,
            count: &mut usize,
        ) -> usize {
            let Some(node) = node_option else {
                return 1;
            };
            let n = &*node.as_ptr();
            assert!(n.parent == parent, "broken parent link");
            if n.is_red() {
                assert!(is_black(n.left) && is_black(n.right), "red node with a red child");
            }
            *count += 1;
            let left_height = walk(n.left, node_option, count);
            let right_height = walk(n.right, node_option, count);
            assert_eq!(left_height, right_height, "black heights differ");
            left_height + usize::from(n.is_black())
        }

        unsafe {
            assert!(is_black(self.root), "red root");
            let mut count = 0;
            let height = walk(self.root, None, &mut count);
            assert_eq!(count, self.len, "len out of sync");
            assert_eq!(self.leftmost, self.root.map(|root| first(root)), "stale leftmost");
            assert_eq!(self.boundary.last, self.root.map(|root| last(root)), "stale maximum");

            let mut link = self.leftmost;
            let mut prev: Option<&K> = None;
            while let Some(node) = link {
                let key = &(*node.as_ptr()).key;
                if let Some(prev) = prev {
                    assert!(self.compare.less(prev, key), "keys out of order");
                }
                prev = Some(key);
                link = successor(node);
            }
            height
        }
    }
}

#[cfg(test)]
mod test {
    use super::RbTree;
    use crate::compare::Greater;
    use crate::node::Color;

    use rand::seq::SliceRandom;
    use rand::thread_rng;

    fn tree_of<K: Ord, V>(items: impl IntoIterator<Item = (K, V)>) -> RbTree<K, V> {
        items.into_iter().collect()
    }

    fn keys<C, A: allocator_api2::alloc::Allocator>(tree: &RbTree<i32, i32, C, A>) -> Vec<i32> {
        tree.keys().copied().collect()
    }

    // from https://github.com/rust-lang/rust/blob/master/library/alloc/src/collections/btree/map/tests.rs
    #[test]
    fn test_iter() {
        // Miri is too slow
        let size = if cfg!(miri) { 200 } else { 10000 };
        let mut tree = tree_of::<usize, usize>((0..size).map(|i| (i, i)));

        fn test<T>(size: usize, mut iter: T)
        where
            T: Iterator<Item = (usize, usize)>,
        {
            for i in 0..size {
                assert_eq!(iter.size_hint(), (size - i, Some(size - i)));
                assert_eq!(iter.next().unwrap(), (i, i));
            }
            assert_eq!(iter.size_hint(), (0, Some(0)));
            assert_eq!(iter.next(), None);
        }
        test(size, tree.iter().map(|(&k, &v)| (k, v)));
        test(size, tree.iter_mut().map(|(&k, &mut v)| (k, v)));
        test(size, tree.into_iter());
    }

    #[test]
    fn test_iter_rev() {
        // Miri is too slow
        let size = if cfg!(miri) { 200 } else { 10000 };
        let mut tree = tree_of::<usize, usize>((0..size).map(|i| (i, i)));

        fn test<T>(size: usize, mut iter: T)
        where
            T: Iterator<Item = (usize, usize)>,
        {
            for i in 0..size {
                assert_eq!(iter.size_hint(), (size - i, Some(size - i)));
                assert_eq!(iter.next().unwrap(), (size - i - 1, size - i - 1));
            }
            assert_eq!(iter.size_hint(), (0, Some(0)));
            assert_eq!(iter.next(), None);
        }
        test(size, tree.iter().rev().map(|(&k, &v)| (k, v)));
        test(size, tree.iter_mut().rev().map(|(&k, &mut v)| (k, v)));
        test(size, tree.into_iter().rev());
    }

    #[test]
    fn into_iter_from_both_ends() {
        let tree = tree_of::<i32, i32>((0..100).map(|i| (i, -i)));
        let mut iter = tree.into_iter();
        let mut seen = vec![];
        loop {
            match (iter.next(), iter.next_back()) {
                (Some(front), Some(back)) => {
                    seen.push(front.0);
                    seen.push(back.0);
                }
                (Some(front), None) => seen.push(front.0),
                (None, _) => break,
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn partially_consumed_into_iter_frees_the_rest() {
        let tree = tree_of::<String, Vec<u8>>((0..50).map(|i| (i.to_string(), vec![0; i])));
        let mut iter = tree.into_iter();
        iter.next();
        iter.next_back();
        assert_eq!(iter.len(), 48);
        drop(iter);
    }

    #[test]
    fn ascending_descending_and_shuffled_inserts_stay_balanced() {
        let mut ascending = RbTree::new();
        let mut descending = RbTree::new();
        let mut shuffled = RbTree::new();
        let mut order: Vec<i32> = (0..512).collect();
        order.shuffle(&mut thread_rng());

        for i in 0..512 {
            ascending.insert(i, i);
            descending.insert(511 - i, i);
            shuffled.insert(order[i as usize], i);
            ascending.check_invariants();
            descending.check_invariants();
            shuffled.check_invariants();
        }

        // 2 * log2(n + 1) bounds the height, so the black height is at most ~log2(n + 1) + 1
        assert!(ascending.check_invariants() <= 11);
        assert_eq!(keys(&ascending), (0..512).collect::<Vec<_>>());
        assert_eq!(keys(&descending), (0..512).collect::<Vec<_>>());
        assert_eq!(keys(&shuffled), (0..512).collect::<Vec<_>>());
    }

    #[test]
    fn duplicate_insert_keeps_the_original() {
        let mut tree = RbTree::new();
        assert!(tree.insert(1, "first").1);
        let (cursor, inserted) = tree.insert(1, "second");
        assert!(!inserted);
        assert_eq!(cursor.key_value(), Some((&1, &"first")));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn erase_every_shape() {
        let mut order: Vec<i32> = (0..300).collect();
        for _ in 0..5 {
            let mut tree = tree_of((0..300).map(|i| (i, i)));
            order.shuffle(&mut thread_rng());
            for (removed, key) in order.iter().enumerate() {
                assert_eq!(tree.remove(key), Some(*key));
                assert_eq!(tree.len(), 300 - removed - 1);
                tree.check_invariants();
            }
            assert!(tree.is_empty());
            assert!(tree.cursor_front().is_end());
        }
    }

    #[test]
    fn erasing_missing_key_changes_nothing() {
        let mut tree = tree_of([(1, 1), (2, 2), (3, 3)]);
        assert_eq!(tree.erase(&7), 0);
        assert_eq!(keys(&tree), [1, 2, 3]);
        assert_eq!(tree.erase(&2), 1);
        assert_eq!(keys(&tree), [1, 3]);
    }

    #[test]
    fn extremes_track_inserts_and_removals() {
        let mut tree = RbTree::new();
        for key in [50, 30, 70, 20, 80, 10, 90] {
            tree.insert(key, ());
            tree.check_invariants();
        }
        assert_eq!(tree.first_key_value(), Some((&10, &())));
        assert_eq!(tree.last_key_value(), Some((&90, &())));
        assert_eq!(tree.pop_first(), Some((10, ())));
        assert_eq!(tree.pop_last(), Some((90, ())));
        tree.check_invariants();
        assert_eq!(tree.first_key_value(), Some((&20, &())));
        assert_eq!(tree.last_key_value(), Some((&80, &())));
        assert_eq!(tree.cursor_end().peek_prev().key(), Some(&80));
    }

    #[test]
    fn bounds_descend_instead_of_scanning() {
        let tree = tree_of((0..100).map(|i| (i * 2, i)));
        assert_eq!(tree.lower_bound(&10).key(), Some(&10));
        assert_eq!(tree.lower_bound(&11).key(), Some(&12));
        assert_eq!(tree.upper_bound(&10).key(), Some(&12));
        assert_eq!(tree.lower_bound(&-5).key(), Some(&0));
        assert!(tree.lower_bound(&199).is_end());
        assert!(tree.upper_bound(&198).is_end());

        let (lo, hi) = tree.equal_range(&40);
        assert_eq!(lo.key(), Some(&40));
        assert_eq!(hi.key(), Some(&42));
        let (lo, hi) = tree.equal_range(&41);
        assert_eq!(lo, hi);
    }

    #[test]
    fn ranges() {
        let tree = tree_of((1..=10).map(|i| (i, i)));
        let collect = |r: super::Range<'_, i32, i32>| r.map(|(k, _)| *k).collect::<Vec<_>>();
        assert_eq!(collect(tree.range(3..6)), [3, 4, 5]);
        assert_eq!(collect(tree.range(3..=6)), [3, 4, 5, 6]);
        assert_eq!(collect(tree.range(..3)), [1, 2]);
        assert_eq!(collect(tree.range(8..)), [8, 9, 10]);
        assert_eq!(collect(tree.range(..)), (1..=10).collect::<Vec<_>>());
        assert_eq!(collect(tree.range(5..5)), Vec::<i32>::new());
        assert_eq!(collect(tree.range(5..=5)), [5]);
        assert_eq!(collect(tree.range(7..3)), Vec::<i32>::new());
        assert_eq!(collect(tree.range(20..30)), Vec::<i32>::new());
        assert_eq!(tree.range(2..9).rev().map(|(k, _)| *k).collect::<Vec<_>>(), [8, 7, 6, 5, 4, 3, 2]);

        use core::ops::Bound::{Excluded, Included};
        assert_eq!(collect(tree.range((Excluded(3), Excluded(6)))), [4, 5]);
        assert_eq!(collect(tree.range((Excluded(5), Included(5)))), Vec::<i32>::new());
    }

    #[test]
    fn erase_range_removes_the_span() {
        let mut tree = tree_of((1..=10).map(|i| (i, i)));
        assert_eq!(tree.erase_range(3..7), 4);
        tree.check_invariants();
        assert_eq!(keys(&tree), [1, 2, 7, 8, 9, 10]);
        assert_eq!(tree.erase_range(9..2), 0);
        assert_eq!(tree.erase_range(..), 6);
        assert!(tree.is_empty());
    }

    #[test]
    fn clone_copies_shape_and_colors() {
        let tree = tree_of((0..200).map(|i| (i, i.to_string())));
        let copy = tree.clone();
        copy.check_invariants();

        fn shape<V>(tree: &RbTree<i32, V>) -> Vec<(i32, Option<i32>, Color)> {
            let mut out = vec![];
            let mut link = tree.leftmost;
            while let Some(node) = link {
                unsafe {
                    let n = &*node.as_ptr();
                    out.push((n.key, n.parent.map(|p| (*p.as_ptr()).key), n.color));
                    link = crate::node::successor(node);
                }
            }
            out
        }
        assert_eq!(shape(&tree), shape(&copy));
        assert_ne!(tree.root, copy.root);
    }

    #[test]
    fn clone_is_independent() {
        let mut tree = tree_of((0..10).map(|i| (i, i)));
        let copy = tree.clone();
        tree.remove(&4);
        tree.insert(42, 42);
        assert_eq!(keys(&copy), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn clear_then_reuse() {
        let mut tree = tree_of((0..64).map(|i| (i, vec![i; 3])));
        tree.clear();
        tree.check_invariants();
        assert!(tree.is_empty());
        assert!(tree.first_key_value().is_none());
        tree.insert(3, vec![]);
        tree.check_invariants();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn swap_exchanges_everything() {
        let mut a = tree_of([(1, 1), (2, 2)]);
        let mut b = tree_of([(9, 9)]);
        a.swap(&mut b);
        assert_eq!(keys(&a), [9]);
        assert_eq!(keys(&b), [1, 2]);
        a.check_invariants();
        b.check_invariants();
    }

    #[test]
    fn custom_ordering() {
        let mut tree = RbTree::with_compare(Greater);
        for i in 0..20 {
            tree.insert(i, ());
        }
        tree.check_invariants();
        assert_eq!(tree.keys().copied().collect::<Vec<_>>(), (0..20).rev().collect::<Vec<_>>());
        assert_eq!(tree.lower_bound(&5).key(), Some(&5));
        assert_eq!(tree.upper_bound(&5).key(), Some(&4));

        let mut by_len = RbTree::with_compare(|l: &&str, r: &&str| l.len() < r.len());
        by_len.insert("ccc", 3);
        by_len.insert("a", 1);
        assert!(!by_len.insert("zzz", 0).1, "same length is an equivalent key");
        assert_eq!(by_len.keys().copied().collect::<Vec<_>>(), ["a", "ccc"]);
    }

    #[test]
    fn heterogeneous_lookup() {
        let tree = tree_of([("b".to_string(), 2), ("a".to_string(), 1)]);
        assert_eq!(tree.get("a"), Some(&1));
        assert!(tree.contains_key("b"));
        assert_eq!(tree.count("c"), 0);
    }

    #[test]
    fn hinted_inserts() {
        let mut tree = RbTree::new();
        for i in (0..100).step_by(10) {
            tree.insert(i, ());
        }

        let mut cursor = tree.find_mut(&50);
        assert!(cursor.insert_hinted(45, ()).unwrap());
        assert_eq!(cursor.key(), Some(&45));
        assert!(cursor.insert_hinted(47, ()).unwrap());
        assert!(!cursor.insert_hinted(50, ()).unwrap());
        assert_eq!(cursor.key(), Some(&50));
        // a useless hint still inserts in the right place
        assert!(cursor.insert_hinted(5, ()).unwrap());

        let mut end = tree.cursor_end_mut();
        for i in 100..120 {
            assert!(end.insert_hinted(i, ()).unwrap());
            end.move_next();
        }
        tree.check_invariants();
        assert_eq!(tree.len(), 33);
        assert_eq!(tree.last_key_value(), Some((&119, &())));
    }

    #[test]
    fn rotations_preserve_order() {
        let mut tree = tree_of((0..15).map(|i| (i, ())));
        let root = tree.root.unwrap();
        unsafe {
            tree.rotate_left(root);
            assert_ne!(tree.root, Some(root));
            assert_eq!(tree.keys().copied().collect::<Vec<_>>(), (0..15).collect::<Vec<_>>());
            tree.rotate_right(tree.root.unwrap());
        }
        assert_eq!(tree.root, Some(root));
        tree.check_invariants();
    }

    mod proptests {
        use super::super::RbTree;
        use proptest::prelude::*;
        use rand::seq::SliceRandom;
        use rand::thread_rng;

        #[cfg(not(miri))]
        const TREE_SIZE: usize = 500;
        #[cfg(miri)]
        const TREE_SIZE: usize = 30;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(if cfg!(miri) { 8 } else { 256 }))]

            #[test]
            fn inserts_keep_invariants(keys in proptest::collection::vec(0..2000i32, 0..TREE_SIZE)) {
                let mut tree = RbTree::new();
                for key in &keys {
                    tree.insert(*key, ());
                }
                tree.check_invariants();

                let mut expected = keys.clone();
                expected.sort_unstable();
                expected.dedup();
                prop_assert_eq!(tree.keys().copied().collect::<Vec<_>>(), expected);
                prop_assert_eq!(tree.len(), tree.iter().count());
            }

            #[test]
            fn insert_then_erase_all(keys in proptest::collection::hash_set(0..5000i32, 0..TREE_SIZE)) {
                let mut tree = RbTree::new();
                for key in &keys {
                    tree.insert(*key, *key);
                }
                let mut keys: Vec<_> = keys.into_iter().collect();
                keys.shuffle(&mut thread_rng());
                for key in &keys {
                    prop_assert_eq!(tree.remove(key), Some(*key));
                    tree.check_invariants();
                }
                prop_assert!(tree.is_empty());
                prop_assert!(tree.cursor_front() == tree.cursor_end());
            }

            #[test]
            fn mixed_operations(ops in proptest::collection::vec((any::<bool>(), 0..200i32), 0..TREE_SIZE)) {
                let mut tree = RbTree::new();
                let mut model = std::collections::BTreeMap::new();
                for (insert, key) in ops {
                    if insert {
                        let inserted = tree.insert(key, key).1;
                        prop_assert_eq!(inserted, model.insert(key, key).is_none());
                    } else {
                        prop_assert_eq!(tree.remove(&key), model.remove(&key));
                    }
                    tree.check_invariants();
                }
                prop_assert!(tree.iter().map(|(k, v)| (*k, *v)).eq(model.into_iter()));
            }

            #[test]
            fn cursors_survive_unrelated_changes(
                keys in proptest::collection::hash_set(0..1000i32, 1..TREE_SIZE),
                noise in proptest::collection::vec(1000..2000i32, 0..50),
            ) {
                let mut tree = RbTree::new();
                for key in &keys {
                    tree.insert(*key, *key * 2);
                }
                let target = *keys.iter().next().unwrap();
                let mut cursor = tree.find_mut(&target);
                for key in &noise {
                    cursor.insert(*key, 0).unwrap();
                }
                for key in keys.iter().filter(|k| **k != target) {
                    cursor.remove(key);
                }
                prop_assert_eq!(cursor.key_value(), Some((&target, &(target * 2))));
                drop(cursor);
                tree.check_invariants();
            }
        }
    }
}
