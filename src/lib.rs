//! Ordered maps and sets on a red-black tree, with stable cursors, a runtime
//! ordering predicate and a pluggable node allocator.
//!
//! ```
//! use rbtree_collections::RbTreeMap;
//!
//! let mut map = RbTreeMap::new();
//! map.insert(3, "c");
//! map.insert(1, "a");
//! map.insert(2, "b");
//!
//! let mut cursor = map.find_mut(&2);
//! cursor.insert(4, "d").unwrap();
//! cursor.remove(&1);
//! assert_eq!(cursor.key(), Some(&2));
//!
//! assert_eq!(map.keys().copied().collect::<Vec<_>>(), [2, 3, 4]);
//! ```

mod alloc;
pub mod compare;
mod cursor;
mod error;
pub mod iter;
pub mod map;
mod node;
pub mod set;
mod tree;

pub use allocator_api2::alloc::{AllocError, Allocator, Global};

pub use compare::{Compare, Greater, Less};
pub use cursor::{Cursor, CursorMut};
pub use error::{Error, Result};
pub use map::{RbTreeMap, ValueCompare};
pub use set::RbTreeSet;
pub use tree::RbTree;
