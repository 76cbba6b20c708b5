//! Node storage.
//!
//! The tree never touches `Box` or the global heap directly: every node is
//! obtained from, and handed back to, the container's [`Allocator`].

use core::alloc::Layout;
use core::mem;
use core::ptr;

use allocator_api2::alloc::Allocator;

use crate::error::{Error, Result};
use crate::node::{Node, NodePtr};

/// The largest number of nodes of this shape an allocator can hand out.
pub(crate) fn max_len<K, V>() -> usize {
    isize::MAX as usize / mem::size_of::<Node<K, V>>().max(1)
}

/// Allocates storage for one node and moves `node` into it.
///
/// On failure `node` is dropped and nothing has been allocated.
pub(crate) fn allocate_node<K, V, A: Allocator>(alloc: &A, node: Node<K, V>) -> Result<NodePtr<K, V>> {
    let layout = Layout::new::<Node<K, V>>();
    let ptr = alloc
        .allocate(layout)
        .map_err(|_| Error::AllocFailed {
            size: layout.size(),
            align: layout.align(),
        })?
        .cast::<Node<K, V>>();
    // SAFETY: freshly allocated with the layout of `Node<K, V>`
    unsafe { ptr.as_ptr().write(node) };
    Ok(ptr)
}

/// Moves the payload out of `node` and releases its storage.
///
/// # Safety
///
/// `node` must have come from [`allocate_node`] with the same allocator, must
/// be unlinked from any tree, and must not be used afterwards.
pub(crate) unsafe fn take_node<K, V, A: Allocator>(alloc: &A, node: NodePtr<K, V>) -> (K, V) {
    let Node { key, val, .. } = ptr::read(node.as_ptr());
    alloc.deallocate(node.cast(), Layout::new::<Node<K, V>>());
    (key, val)
}

/// Drops the payload of `node` in place and releases its storage.
///
/// # Safety
///
/// Same as [`take_node`].
pub(crate) unsafe fn destroy_node<K, V, A: Allocator>(alloc: &A, node: NodePtr<K, V>) {
    let guard = DeallocOnDrop { alloc, node };
    ptr::drop_in_place(guard.node.as_ptr());
}

// Releases the storage even when dropping the payload unwinds.
struct DeallocOnDrop<'a, K, V, A: Allocator> {
    alloc: &'a A,
    node: NodePtr<K, V>,
}

impl<K, V, A: Allocator> Drop for DeallocOnDrop<'_, K, V, A> {
    fn drop(&mut self) {
        unsafe {
            self.alloc
                .deallocate(self.node.cast(), Layout::new::<Node<K, V>>());
        }
    }
}
