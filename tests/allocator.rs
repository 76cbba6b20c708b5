use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;
use std::rc::Rc;

use rbtree_collections::{AllocError, Allocator, Error, Global, RbTreeMap, RbTreeSet};

/// Counts live allocations and can be told to start refusing.
#[derive(Clone, Default)]
struct Counting {
    live: Rc<Cell<usize>>,
    allocations: Rc<Cell<usize>>,
    budget: Rc<Cell<Option<usize>>>,
}

impl Counting {
    fn live(&self) -> usize {
        self.live.get()
    }

    fn refuse_after(&self, allocations: usize) {
        self.budget.set(Some(allocations));
    }
}

unsafe impl Allocator for Counting {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if let Some(budget) = self.budget.get() {
            if budget == 0 {
                return Err(AllocError);
            }
            self.budget.set(Some(budget - 1));
        }
        let ptr = Global.allocate(layout)?;
        self.live.set(self.live.get() + 1);
        self.allocations.set(self.allocations.get() + 1);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live.set(self.live.get() - 1);
        Global.deallocate(ptr, layout)
    }
}

#[test]
fn every_node_is_released() {
    let alloc = Counting::default();
    {
        let mut map = RbTreeMap::new_in(alloc.clone());
        for i in 0..100 {
            map.insert(i, i.to_string());
        }
        assert_eq!(alloc.live(), 100);
        for i in (0..100).step_by(3) {
            map.remove(&i);
        }
        assert_eq!(alloc.live(), map.len());
    }
    assert_eq!(alloc.live(), 0);
    assert_eq!(alloc.allocations.get(), 100);
}

#[test]
fn duplicate_inserts_do_not_allocate() {
    let alloc = Counting::default();
    let mut set = RbTreeSet::new_in(alloc.clone());
    set.insert(1);
    set.insert(1);
    assert_eq!(alloc.allocations.get(), 1);
}

#[test]
fn clear_and_into_iter_release_nodes() {
    let alloc = Counting::default();
    let mut map = RbTreeMap::new_in(alloc.clone());
    map.extend((0..50).map(|i| (i, vec![i; 4])));
    map.clear();
    assert_eq!(alloc.live(), 0);

    map.extend((0..50).map(|i| (i, vec![i; 4])));
    let mut iter = map.into_iter();
    iter.next();
    iter.next_back();
    assert_eq!(alloc.live(), 48);
    drop(iter);
    assert_eq!(alloc.live(), 0);
}

#[test]
fn clones_allocate_from_a_clone_of_the_allocator() {
    let alloc = Counting::default();
    let mut map = RbTreeMap::new_in(alloc.clone());
    map.extend((0..20).map(|i| (i, i)));
    let copy = map.clone();
    assert_eq!(alloc.live(), 40);
    drop(map);
    assert_eq!(alloc.live(), 20);
    assert_eq!(copy.keys().count(), 20);
    drop(copy);
    assert_eq!(alloc.live(), 0);
}

#[test]
fn refused_insert_leaves_the_map_unchanged() {
    let alloc = Counting::default();
    let mut map = RbTreeMap::new_in(alloc.clone());
    map.extend((0..10).map(|i| (i, i)));
    alloc.refuse_after(0);

    let err = map.try_insert(99, 99).map(|(_, inserted)| inserted).unwrap_err();
    assert!(matches!(err, Error::AllocFailed { .. }));
    assert_eq!(map.len(), 10);
    assert!(!map.contains_key(&99));
    assert_eq!(map.keys().copied().collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());

    // an existing key needs no allocation
    assert!(!map.try_insert(3, 0).map(|(_, inserted)| inserted).unwrap());
    assert!(map.try_get_or_insert_default(42).is_err());
    assert_eq!(alloc.live(), 10);
}

#[test]
fn failed_clone_frees_the_partial_copy() {
    let alloc = Counting::default();
    let mut map = RbTreeMap::new_in(alloc.clone());
    map.extend((0..30).map(|i| (i, i)));
    alloc.refuse_after(12);

    assert!(matches!(map.try_clone(), Err(Error::AllocFailed { .. })));
    assert_eq!(alloc.live(), 30);
}

#[test]
fn panicking_key_clone_leaks_nothing() {
    #[derive(PartialEq, Eq, PartialOrd, Ord)]
    struct Fragile(u32);

    impl Clone for Fragile {
        fn clone(&self) -> Self {
            if self.0 == 7 {
                panic!("refusing to clone 7");
            }
            Fragile(self.0)
        }
    }

    let alloc = Counting::default();
    let mut set = RbTreeSet::new_in(alloc.clone());
    set.extend((0..16).map(Fragile));

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| set.clone()));
    assert!(result.is_err());
    assert_eq!(alloc.live(), 16);
}
