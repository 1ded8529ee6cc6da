//! Arena storage addressed by typed handles.
//!
//! Every AST node kind lives in its own [`Arena`] inside the shader module.
//! Nodes refer to each other through [`Handle`]s, so passes can rewrite a
//! node in place without invalidating references held elsewhere.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A typed index into an [`Arena`] or [`UniqueArena`].
pub struct Handle<T> {
    index: u32,
    marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn from_usize(index: usize) -> Self {
        let index = u32::try_from(index)
            .unwrap_or_else(|_| panic!("arena holds more than u32::MAX nodes ({index})"));
        Self {
            index,
            marker: PhantomData,
        }
    }

    /// Zero-based position of the node in its arena.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

// Manual impls: derives would put bounds on `T`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Append-only node storage.
#[derive(Clone, Debug)]
pub struct Arena<T> {
    nodes: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stores `value` and returns its handle.
    pub fn append(&mut self, value: T) -> Handle<T> {
        let handle = Handle::from_usize(self.nodes.len());
        self.nodes.push(value);
        handle
    }

    pub fn try_get(&self, handle: Handle<T>) -> Option<&T> {
        self.nodes.get(handle.index())
    }

    /// Iterates over every node together with its handle, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (Handle::from_usize(i), node))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.nodes
            .iter_mut()
            .enumerate()
            .map(|(i, node)| (Handle::from_usize(i), node))
    }

    /// Every handle currently allocated, in insertion order.
    pub fn handles(&self) -> impl Iterator<Item = Handle<T>> + use<T> {
        (0..self.nodes.len()).map(Handle::from_usize)
    }
}

impl<T> Index<Handle<T>> for Arena<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        &self.nodes[handle.index()]
    }
}

impl<T> IndexMut<Handle<T>> for Arena<T> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        &mut self.nodes[handle.index()]
    }
}

/// Storage that hands out one handle per distinct value.
///
/// Resolved types live here, so two handles to structurally equal types
/// always compare equal.
#[derive(Clone, Debug)]
pub struct UniqueArena<T> {
    nodes: Vec<T>,
    lookup: HashMap<T, u32>,
}

impl<T> Default for UniqueArena<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            lookup: HashMap::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> UniqueArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the handle of `value`, storing it first if it is new.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        if let Some(&index) = self.lookup.get(&value) {
            return Handle::from_usize(index as usize);
        }
        let handle = Handle::from_usize(self.nodes.len());
        self.lookup.insert(value.clone(), handle.index);
        self.nodes.push(value);
        handle
    }

    /// Returns the handle of `value` without storing anything.
    pub fn find(&self, value: &T) -> Option<Handle<T>> {
        self.lookup
            .get(value)
            .map(|&index| Handle::from_usize(index as usize))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (Handle::from_usize(i), node))
    }
}

impl<T> Index<Handle<T>> for UniqueArena<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        &self.nodes[handle.index()]
    }
}
