//! Positions within a tree.
//!
//! A cursor points at an element or at the end position, which sits between
//! the last and the first element: moving forward from the last element or
//! backward from the first lands on it, and moving on from it wraps around.

use core::borrow::Borrow;
use core::fmt;

use allocator_api2::alloc::{Allocator, Global};

use crate::compare::{Compare, Less};
use crate::error::Result;
use crate::node::{successor, Link};
use crate::tree::RbTree;

/// A read-only cursor over an [`RbTree`].
///
/// Cursors are `Copy`: any number of them can point into the same tree.
pub struct Cursor<'a, K, V, C = Less, A: Allocator = Global> {
    pub(crate) current: Link<K, V>,
    pub(crate) tree: &'a RbTree<K, V, C, A>,
}

impl<K, V, C, A: Allocator> Clone for Cursor<'_, K, V, C, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, C, A: Allocator> Copy for Cursor<'_, K, V, C, A> {}

impl<'a, K, V, C, A: Allocator> Cursor<'a, K, V, C, A> {
    pub(crate) fn new(current: Link<K, V>, tree: &'a RbTree<K, V, C, A>) -> Self {
        Self { current, tree }
    }

    /// Returns `true` if the cursor is at the end position.
    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }

    pub fn key(&self) -> Option<&'a K> {
        self.current.map(|node| unsafe { &(*node.as_ptr()).key })
    }

    pub fn value(&self) -> Option<&'a V> {
        self.current.map(|node| unsafe { &(*node.as_ptr()).val })
    }

    pub fn key_value(&self) -> Option<(&'a K, &'a V)> {
        self.current
            .map(|node| unsafe { (&(*node.as_ptr()).key, &(*node.as_ptr()).val) })
    }

    /// Moves to the next element in order. From the last element this
    /// reaches the end position, and from the end position the first element.
    pub fn move_next(&mut self) {
        self.current = self.tree.next_link(self.current);
    }

    /// Moves to the previous element in order. From the first element this
    /// reaches the end position, and from the end position the last element.
    pub fn move_prev(&mut self) {
        self.current = self.tree.prev_link(self.current);
    }

    /// A cursor at the position after this one.
    pub fn peek_next(&self) -> Self {
        let mut next = *self;
        next.move_next();
        next
    }

    /// A cursor at the position before this one.
    pub fn peek_prev(&self) -> Self {
        let mut prev = *self;
        prev.move_prev();
        prev
    }
}

impl<K, V, C, A: Allocator> PartialEq for Cursor<'_, K, V, C, A> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.tree, other.tree) && self.current == other.current
    }
}

impl<K, V, C, A: Allocator> Eq for Cursor<'_, K, V, C, A> {}

impl<K: fmt::Debug, V: fmt::Debug, C, A: Allocator> fmt::Debug for Cursor<'_, K, V, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.key_value()).finish()
    }
}

/// A cursor over an [`RbTree`] that can also edit it.
///
/// Inserting or removing other elements through the cursor leaves it where
/// it is. Removing the element under the cursor moves it to the successor.
pub struct CursorMut<'a, K, V, C = Less, A: Allocator = Global> {
    pub(crate) current: Link<K, V>,
    pub(crate) tree: &'a mut RbTree<K, V, C, A>,
}

impl<'a, K, V, C, A: Allocator> CursorMut<'a, K, V, C, A> {
    pub(crate) fn new(current: Link<K, V>, tree: &'a mut RbTree<K, V, C, A>) -> Self {
        Self { current, tree }
    }

    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }

    pub fn key(&self) -> Option<&K> {
        self.current.map(|node| unsafe { &(*node.as_ptr()).key })
    }

    pub fn value(&self) -> Option<&V> {
        self.current.map(|node| unsafe { &(*node.as_ptr()).val })
    }

    pub fn value_mut(&mut self) -> Option<&mut V> {
        self.current.map(|node| unsafe { &mut (*node.as_ptr()).val })
    }

    pub fn key_value(&self) -> Option<(&K, &V)> {
        self.current
            .map(|node| unsafe { (&(*node.as_ptr()).key, &(*node.as_ptr()).val) })
    }

    /// The key stays shared: changing it could break the ordering.
    pub fn key_value_mut(&mut self) -> Option<(&K, &mut V)> {
        self.current
            .map(|node| unsafe { (&(*node.as_ptr()).key, &mut (*node.as_ptr()).val) })
    }

    /// Gives up the cursor for a reference to the current value that lives as
    /// long as the tree borrow.
    pub fn into_value_mut(self) -> Option<&'a mut V> {
        self.current.map(|node| unsafe { &mut (*node.as_ptr()).val })
    }

    pub fn into_key_value_mut(self) -> Option<(&'a K, &'a mut V)> {
        self.current
            .map(|node| unsafe { (&(*node.as_ptr()).key, &mut (*node.as_ptr()).val) })
    }

    /// A read-only view of this cursor.
    pub fn as_cursor(&self) -> Cursor<'_, K, V, C, A> {
        Cursor::new(self.current, &*self.tree)
    }

    pub fn move_next(&mut self) {
        self.current = self.tree.next_link(self.current);
    }

    pub fn move_prev(&mut self) {
        self.current = self.tree.prev_link(self.current);
    }

    pub fn peek_next(&self) -> Cursor<'_, K, V, C, A> {
        self.as_cursor().peek_next()
    }

    pub fn peek_prev(&self) -> Cursor<'_, K, V, C, A> {
        self.as_cursor().peek_prev()
    }

    /// Removes the current element and moves to its successor.
    ///
    /// Returns `None`, and does nothing, at the end position.
    pub fn remove_current(&mut self) -> Option<(K, V)> {
        let node = self.current?;
        unsafe {
            self.current = successor(node);
            Some(self.tree.remove_node(node))
        }
    }

    /// Inserts a pair without moving the cursor; returns whether it was new.
    pub fn insert(&mut self, key: K, val: V) -> Result<bool>
    where
        C: Compare<K>,
    {
        self.tree
            .insert_node(key, val)
            .map(|(_, inserted)| inserted)
    }

    /// Inserts a pair using the current position as a hint, then moves to the
    /// element with that key, new or existing.
    ///
    /// When the key belongs right before or right after the current position
    /// no search from the root is needed.
    pub fn insert_hinted(&mut self, key: K, val: V) -> Result<bool>
    where
        C: Compare<K>,
    {
        let (node, inserted) = self.tree.insert_hinted_node(self.current, key, val)?;
        self.current = Some(node);
        Ok(inserted)
    }

    /// Removes the element for `key`. If that is the current element, the
    /// cursor moves to its successor first; otherwise it stays put.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let node = self.tree.find_link(key)?;
        unsafe {
            if self.current == Some(node) {
                self.current = successor(node);
            }
            Some(self.tree.remove_node(node))
        }
    }
}

impl<'a, K, V, C, A: Allocator> From<CursorMut<'a, K, V, C, A>> for Cursor<'a, K, V, C, A> {
    fn from(cursor: CursorMut<'a, K, V, C, A>) -> Self {
        Cursor::new(cursor.current, cursor.tree)
    }
}

impl<K, V, C, A: Allocator> PartialEq<Cursor<'_, K, V, C, A>> for CursorMut<'_, K, V, C, A> {
    fn eq(&self, other: &Cursor<'_, K, V, C, A>) -> bool {
        self.as_cursor() == *other
    }
}

impl<K, V, C, A: Allocator> PartialEq<CursorMut<'_, K, V, C, A>> for Cursor<'_, K, V, C, A> {
    fn eq(&self, other: &CursorMut<'_, K, V, C, A>) -> bool {
        *self == other.as_cursor()
    }
}

impl<K, V, C, A: Allocator> PartialEq for CursorMut<'_, K, V, C, A> {
    fn eq(&self, other: &Self) -> bool {
        self.as_cursor() == other.as_cursor()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C, A: Allocator> fmt::Debug for CursorMut<'_, K, V, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CursorMut").field(&self.key_value()).finish()
    }
}
