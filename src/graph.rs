use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

pub trait GetIndex {
    fn index(&self) -> usize;
}

/// Typed handle into an arena of `W` values.
pub struct GenericIndex<W> {
    index: usize,
    marker: PhantomData<W>,
}

impl<W> GenericIndex<W> {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            marker: PhantomData,
        }
    }
}

impl<W> Clone for GenericIndex<W> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<W> Copy for GenericIndex<W> {}

impl<W> fmt::Debug for GenericIndex<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

impl<W> Hash for GenericIndex<W> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state)
    }
}

impl<W> PartialEq for GenericIndex<W> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<W> Eq for GenericIndex<W> {}

impl<W> PartialOrd for GenericIndex<W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<W> Ord for GenericIndex<W> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl<W> GetIndex for GenericIndex<W> {
    fn index(&self) -> usize {
        self.index
    }
}
