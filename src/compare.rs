//! Ordering predicates.
//!
//! The containers only ever ask "is `l` strictly less than `r`?". Two keys are
//! equivalent when neither is less than the other, so a predicate must be a
//! strict weak ordering: irreflexive, transitive, and with transitive
//! incomparability.

/// A strict "less than" predicate between an `L` and an `R`.
pub trait Compare<L: ?Sized, R: ?Sized = L> {
    /// Returns `true` if `l` orders strictly before `r`.
    fn less(&self, l: &L, r: &R) -> bool;

    /// Returns `true` if neither argument orders before the other.
    fn equivalent(&self, l: &L, r: &R) -> bool
    where
        Self: Compare<R, L>,
    {
        !Compare::<L, R>::less(self, l, r) && !Compare::<R, L>::less(self, r, l)
    }
}

/// Orders values by their natural `Ord` order. This is the default predicate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Less;

impl<T: Ord + ?Sized> Compare<T> for Less {
    #[inline]
    fn less(&self, l: &T, r: &T) -> bool {
        l < r
    }
}

/// Orders values by the reverse of their natural `Ord` order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Greater;

impl<T: Ord + ?Sized> Compare<T> for Greater {
    #[inline]
    fn less(&self, l: &T, r: &T) -> bool {
        r < l
    }
}

impl<L: ?Sized, R: ?Sized, F> Compare<L, R> for F
where
    F: Fn(&L, &R) -> bool,
{
    #[inline]
    fn less(&self, l: &L, r: &R) -> bool {
        self(l, r)
    }
}
