//! Per-view attribute bookkeeping
//!
//! The registry is a side table keyed by [`ViewId`]. It never owns views; a
//! destroyed view's list is dropped by [`AttributeRegistry::prune`]. Each list
//! is kept in declaration order, and a replacement takes the position of the
//! attribute it evicts.
//!
//! Every stored entry is stamped with a registry-wide sequence number, so the
//! order in which one view's declarations reached the engine survives them
//! being spread over several lists. A replacement counts as a new declaration
//! and gets a fresh number.

use std::collections::BTreeMap;

use crate::attribute::Attribute;
use crate::platform::{NativeAttribute, ViewId};

/// What makes two declarations compete for the same native constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConflictKey {
    /// The element that declared the attribute
    pub owner: ViewId,
    /// Native attribute of the declaring element
    pub family: NativeAttribute,
    /// Element holding the native constraint, `None` while unresolved
    pub anchor: Option<ViewId>,
    pub related: Option<ViewId>,
    pub related_attribute: Option<NativeAttribute>,
}

/// One registry slot
#[derive(Debug, Clone)]
pub struct Entry {
    pub attribute: Attribute,
    pub key: ConflictKey,
    /// Whether the engine accepted a constraint for this declaration
    pub installed: bool,
    seq: u64,
}

impl Entry {
    pub fn new(attribute: Attribute, key: ConflictKey, installed: bool) -> Self {
        Self {
            attribute,
            key,
            installed,
            seq: 0,
        }
    }

    /// Position in the registry-wide declaration order.
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    pub fn owner(&self) -> ViewId {
        self.key.owner
    }

    fn is(&self, owner: ViewId, attribute: &Attribute) -> bool {
        self.key.owner == owner && self.attribute.ptr_eq(attribute)
    }

    /// Whether the declaring or related element has been destroyed.
    pub fn is_stale(&self, is_alive: impl Fn(ViewId) -> bool) -> bool {
        !is_alive(self.key.owner) || self.key.related.is_some_and(|related| !is_alive(related))
    }
}

#[derive(Debug, Default)]
pub struct AttributeRegistry {
    entries: BTreeMap<ViewId, Vec<Entry>>,
    next_seq: u64,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries registered on `view`, in declaration order.
    pub fn entries(&self, view: ViewId) -> &[Entry] {
        self.entries.get(&view).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn attributes_for(&self, view: ViewId) -> Vec<Attribute> {
        self.entries(view)
            .iter()
            .map(|entry| entry.attribute.clone())
            .collect()
    }

    pub fn len(&self, view: ViewId) -> usize {
        self.entries(view).len()
    }

    fn stamp(&mut self, mut entry: Entry) -> Entry {
        entry.seq = self.next_seq;
        self.next_seq += 1;
        entry
    }

    pub fn append(&mut self, view: ViewId, entry: Entry) {
        let entry = self.stamp(entry);
        self.entries.entry(view).or_default().push(entry);
    }

    /// Swap the entry `owner` registered for `old` on `view` for `new`, at the
    /// same position. Returns false when there is no such entry.
    ///
    /// One handle may be declared by several views; only `owner`'s entry is
    /// touched.
    pub fn replace(&mut self, view: ViewId, owner: ViewId, old: &Attribute, new: Entry) -> bool {
        let new = self.stamp(new);
        let Some(list) = self.entries.get_mut(&view) else {
            return false;
        };
        match list.iter().position(|entry| entry.is(owner, old)) {
            Some(index) => {
                list[index] = new;
                true
            }
            None => false,
        }
    }

    /// The entry on `view` whose key matches.
    pub fn find(&self, view: ViewId, key: &ConflictKey) -> Option<&Entry> {
        self.entries(view).iter().find(|entry| entry.key == *key)
    }

    /// Remove the entry `owner` registered for `attribute` on `view`.
    pub fn remove(&mut self, view: ViewId, owner: ViewId, attribute: &Attribute) -> Option<Entry> {
        let list = self.entries.get_mut(&view)?;
        let index = list.iter().position(|entry| entry.is(owner, attribute))?;
        let entry = list.remove(index);
        if list.is_empty() {
            self.entries.remove(&view);
        }
        Some(entry)
    }

    /// Move an entry from `from` back to its owner's list under `key`, marked
    /// as not installed. The entry keeps its sequence number.
    pub fn rehome(&mut self, from: ViewId, attribute: &Attribute, key: ConflictKey) -> bool {
        let Some(mut entry) = self.remove(from, key.owner, attribute) else {
            return false;
        };
        entry.key = key;
        entry.installed = false;
        self.entries.entry(key.owner).or_default().push(entry);
        true
    }

    /// Every `(home, entry)` declared by `owner`, wherever it is registered,
    /// in declaration order.
    pub fn declared_by(&self, owner: ViewId) -> Vec<(ViewId, Entry)> {
        let mut declared: Vec<(ViewId, Entry)> = self
            .entries
            .iter()
            .flat_map(|(view, list)| list.iter().map(move |entry| (*view, entry)))
            .filter(|(_, entry)| entry.owner() == owner)
            .map(|(view, entry)| (view, entry.clone()))
            .collect();
        declared.sort_by_key(|(_, entry)| entry.seq);
        declared
    }

    /// Drop lists of dead views and entries declared by, or related to, dead
    /// views.
    ///
    /// Returns how many entries were dropped.
    pub fn prune(&mut self, is_alive: impl Fn(ViewId) -> bool) -> usize {
        let before: usize = self.entries.values().map(Vec::len).sum();
        self.entries.retain(|view, list| {
            if !is_alive(*view) {
                return false;
            }
            list.retain(|entry| !entry.is_stale(&is_alive));
            !list.is_empty()
        });
        let after: usize = self.entries.values().map(Vec::len).sum();
        before - after
    }

    /// Views that currently have at least one entry.
    pub fn views(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.entries.keys().copied()
    }
}
