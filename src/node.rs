use core::ops::Not;
use core::ptr::NonNull;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// The side of a parent a child hangs on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Dir {
    Left,
    Right,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Dir {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

pub(crate) type NodePtr<K, V> = NonNull<Node<K, V>>;

/// `None` stands for the nil leaf: no child, and black for coloring purposes.
pub(crate) type Link<K, V> = Option<NodePtr<K, V>>;

pub(crate) struct Node<K, V> {
    // todo: store color with parent like in linux kernel
    pub(crate) parent: Link<K, V>,
    pub(crate) left: Link<K, V>,
    pub(crate) right: Link<K, V>,
    pub(crate) key: K,
    pub(crate) val: V,
    pub(crate) color: Color,
}

impl<K, V> Node<K, V> {
    /// A fresh, unlinked red node.
    pub(crate) fn new(parent: Link<K, V>, key: K, val: V) -> Self {
        Self {
            parent,
            left: None,
            right: None,
            key,
            val,
            color: Color::Red,
        }
    }

    pub(crate) fn is_black(&self) -> bool {
        self.color == Color::Black
    }

    pub(crate) fn is_red(&self) -> bool {
        self.color == Color::Red
    }

    pub(crate) fn child(&self, dir: Dir) -> Link<K, V> {
        match dir {
            Dir::Left => self.left,
            Dir::Right => self.right,
        }
    }

    pub(crate) fn child_mut(&mut self, dir: Dir) -> &mut Link<K, V> {
        match dir {
            Dir::Left => &mut self.left,
            Dir::Right => &mut self.right,
        }
    }
}

/// Nil links count as black.
///
/// # Safety
///
/// `link` must be `None` or point to a live node.
pub(crate) unsafe fn is_black<K, V>(link: Link<K, V>) -> bool {
    link.map_or(true, |node| (*node.as_ptr()).is_black())
}

/// Which side of `parent` the child `node` hangs on.
///
/// # Safety
///
/// `parent` must be live and be `node`'s parent.
pub(crate) unsafe fn dir_of<K, V>(node: NodePtr<K, V>, parent: NodePtr<K, V>) -> Dir {
    if (*parent.as_ptr()).left == Some(node) {
        Dir::Left
    } else {
        Dir::Right
    }
}

/// Points `to_replace`'s parent at `replacement` instead and gives
/// `replacement` that parent. Returns `false` if `to_replace` had no parent,
/// in which case the caller owns the root link.
///
/// # Safety
///
/// `to_replace` and `replacement` must be live.
pub(crate) unsafe fn replace_in_parent<K, V>(
    to_replace: NodePtr<K, V>,
    replacement: Link<K, V>,
) -> bool {
    let parent_option = (*to_replace.as_ptr()).parent;
    if let Some(replacement) = replacement {
        (*replacement.as_ptr()).parent = parent_option;
    }
    match parent_option {
        Some(parent) => {
            let dir = dir_of(to_replace, parent);
            *(*parent.as_ptr()).child_mut(dir) = replacement;
            true
        }
        None => false,
    }
}

/// The minimum of the subtree rooted at `node`.
///
/// # Safety
///
/// `node` must be live, and so must every node below it.
pub(crate) unsafe fn first<K, V>(mut node: NodePtr<K, V>) -> NodePtr<K, V> {
    while let Some(left_node) = (*node.as_ptr()).left {
        node = left_node;
    }
    node
}

/// The maximum of the subtree rooted at `node`.
///
/// # Safety
///
/// Same as [`first`].
pub(crate) unsafe fn last<K, V>(mut node: NodePtr<K, V>) -> NodePtr<K, V> {
    while let Some(right_node) = (*node.as_ptr()).right {
        node = right_node;
    }
    node
}

/// The in-order successor of `node`, or `None` if `node` is the maximum.
///
/// # Safety
///
/// `node` must belong to a well-linked tree.
pub(crate) unsafe fn successor<K, V>(node: NodePtr<K, V>) -> Link<K, V> {
    step(node, Dir::Right)
}

/// The in-order predecessor of `node`, or `None` if `node` is the minimum.
///
/// # Safety
///
/// `node` must belong to a well-linked tree.
pub(crate) unsafe fn predecessor<K, V>(node: NodePtr<K, V>) -> Link<K, V> {
    step(node, Dir::Left)
}

// Moving towards `dir`: if there is a subtree on that side, its extreme on the
// opposite side is next. Otherwise climb until we arrive from the `!dir` side.
unsafe fn step<K, V>(node: NodePtr<K, V>, dir: Dir) -> Link<K, V> {
    if let Some(child) = (*node.as_ptr()).child(dir) {
        return Some(match dir {
            Dir::Right => first(child),
            Dir::Left => last(child),
        });
    }

    let mut curr = node;
    while let Some(parent) = (*curr.as_ptr()).parent {
        if (*parent.as_ptr()).child(!dir) == Some(curr) {
            return Some(parent);
        }
        curr = parent;
    }
    None
}
