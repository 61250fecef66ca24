//! Dense ordered list of ids.
//!
//! Ranks are 0-based positions with no gaps; every structural change re-ranks
//! the items after the change point. Boards hold tens of items per column, so
//! this is cheap.

use crate::error::{Result, SyncError};
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

/// Sequence of unique ids with an O(1) id → rank index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedList<T>
where
    T: Clone + Eq + Hash,
{
    items: Vec<T>,
    ranks: HashMap<T, usize>,
}

impl<T> Default for OrderedList<T>
where
    T: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self {
            items: Vec::new(),
            ranks: HashMap::new(),
        }
    }
}

impl<T> OrderedList<T>
where
    T: Clone + Eq + Hash + Display,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from ids in order; fails on the first repeated id
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Result<Self> {
        let mut list = Self::new();
        for item in items {
            let end = list.len();
            list.insert_at(item, end)?;
        }
        Ok(list)
    }

    /// Insert `id` at `index` (clamped to `[0, len]`) and return the index used
    pub fn insert_at(&mut self, id: T, index: usize) -> Result<usize> {
        if self.ranks.contains_key(&id) {
            return Err(SyncError::duplicate_item(&id));
        }
        let index = index.min(self.items.len());
        self.items.insert(index, id);
        self.rerank_from(index);
        Ok(index)
    }

    /// Remove `id`, returning its former rank. Absent ids are a no-op.
    pub fn remove(&mut self, id: &T) -> Option<usize> {
        let rank = self.ranks.remove(id)?;
        self.items.remove(rank);
        self.rerank_from(rank);
        Some(rank)
    }

    /// Move a present `id` to `index` (clamped) and return the index used
    pub fn move_to(&mut self, id: &T, index: usize) -> Result<usize> {
        let from = self
            .rank(id)
            .ok_or_else(|| SyncError::unknown_item(id))?;
        let to = index.min(self.items.len() - 1);
        if from == to {
            return Ok(to);
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        self.rerank_from(from.min(to));
        Ok(to)
    }

    /// Replace `old` with `new` at the same rank
    pub fn replace(&mut self, old: &T, new: T) -> Result<usize> {
        if old != &new && self.ranks.contains_key(&new) {
            return Err(SyncError::duplicate_item(&new));
        }
        let rank = self
            .ranks
            .remove(old)
            .ok_or_else(|| SyncError::unknown_item(old))?;
        self.items[rank] = new.clone();
        self.ranks.insert(new, rank);
        Ok(rank)
    }

    pub fn rank(&self, id: &T) -> Option<usize> {
        self.ranks.get(id).copied()
    }

    pub fn contains(&self, id: &T) -> bool {
        self.ranks.contains_key(id)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// The ids in rank order
    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }

    fn rerank_from(&mut self, start: usize) {
        for (rank, item) in self.items.iter().enumerate().skip(start) {
            self.ranks.insert(item.clone(), rank);
        }
    }
}

impl<'a, T> IntoIterator for &'a OrderedList<T>
where
    T: Clone + Eq + Hash + Display,
{
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
