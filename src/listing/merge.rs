use std::collections::{HashMap, HashSet};

use crate::catalog::Item;

/// Append `incoming` to `existing`, keeping one entry per id.
///
/// An id keeps the position where it first appeared and the value it was
/// last seen with.
pub fn merge_unique(existing: Vec<Item>, incoming: Vec<Item>) -> Vec<Item> {
    let mut slots: HashMap<i64, usize> = HashMap::with_capacity(existing.len() + incoming.len());
    let mut merged: Vec<Item> = Vec::with_capacity(existing.len() + incoming.len());

    for item in existing.into_iter().chain(incoming) {
        match slots.get(&item.id) {
            Some(&slot) => merged[slot] = item,
            None => {
                slots.insert(item.id, merged.len());
                merged.push(item);
            }
        }
    }

    merged
}

/// Drop every item whose id was already seen earlier in the list.
pub fn dedupe_keep_first(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::with_capacity(items.len());
    items.into_iter().filter(|item| seen.insert(item.id)).collect()
}
