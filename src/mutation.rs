//! Structural edits on a collection adapter.
//!
//! Local edits patch `keys` and the loaded metadata in lockstep and record
//! the change in the adapter's changeset. Remote edits are forwarded to the
//! provider and followed by a full reload, since the owning context may
//! have changed for other reasons too.

use crate::adapter::{describe_in_order, CollectionAdapter};
use crate::changeset::AdapterChange;
use crate::collection::CollectionKind;
use crate::display::display_to_value;
use crate::error::{Error, Result};
use crate::provider::Metadata;
use crate::value::{Key, Value};
use std::collections::HashSet;

/// Side of the anchor row a new sequence element goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Above,
    Below,
}

/// Where `insert` puts a new entry
#[derive(Debug, Clone, PartialEq)]
pub enum InsertAt {
    /// Next to a loaded row (sequences)
    Row(usize, Placement),
    /// After the last element (sequences)
    End,
    /// Under this key (mappings); an existing key is reassigned
    Key(Key),
}

impl CollectionAdapter {
    fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly {
                what: self.provider.type_name(),
            });
        }
        Ok(())
    }

    fn position_of(&self, key: &Key) -> Result<usize> {
        self.keys
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| Error::KeyNotFound { key: key.clone() })
    }

    /// Reloads from the provider when it owns the truth
    fn reload_if_remote(&mut self) -> Result<bool> {
        if !self.provider.is_remote() {
            return Ok(false);
        }
        log::debug!("remote mutation applied, reloading");
        self.refresh()?;
        Ok(true)
    }

    fn describe_one(&self, key: &Key) -> Result<Metadata> {
        Ok(describe_in_order(self.provider.as_ref(), std::slice::from_ref(key))?
            .into_iter()
            .next()
            .unwrap_or_else(Metadata::placeholder))
    }

    /// Sequence keys are positions; keep them dense after a splice
    fn renumber_sequence(&mut self) {
        self.original_keys = (0..self.keys.len()).map(Key::from).collect();
    }

    /// Places a new key at `row`, loading its metadata when the row is
    /// inside (or directly after a fully loaded) prefix
    fn splice_row(&mut self, row: usize, key: Key) -> Result<()> {
        let fully_loaded = self.meta.len() == self.keys.len();
        let meta = self.describe_one(&key)?;
        self.keys.insert(row, key);
        if row < self.meta.len() || fully_loaded {
            self.meta.insert(row, meta);
            self.changeset.push(AdapterChange::RowInserted { index: row });
        }
        Ok(())
    }

    fn refresh_row(&mut self, row: usize) -> Result<()> {
        if row < self.meta.len() {
            self.meta[row] = self.describe_one(&self.keys[row])?;
            self.changeset.push(AdapterChange::RowUpdated { index: row });
        }
        Ok(())
    }

    /// Assigns a new value to an existing key
    pub fn set_value(&mut self, key: &Key, value: Value) -> Result<()> {
        self.ensure_writable()?;
        let row = self.position_of(key)?;
        self.provider.set_value(key, value)?;
        if self.reload_if_remote()? {
            return Ok(());
        }
        self.refresh_row(row)
    }

    /// Applies editor text to a row, keeping the old value's type when the
    /// text parses as that type and the old value otherwise
    pub fn set_value_from_text(&mut self, row: usize, text: &str) -> Result<()> {
        let key = self.get_key(row)?;
        let old = self.provider.get_value(&key)?;
        let value = display_to_value(text, &old, true);
        self.set_value(&key, value)
    }

    /// Adds an entry and returns its key
    pub fn insert(&mut self, at: InsertAt, value: Value) -> Result<Key> {
        match self.kind {
            CollectionKind::Set | CollectionKind::Object => return Err(Error::unsupported("insert", self.kind)),
            CollectionKind::Sequence | CollectionKind::Mapping => {}
        }
        self.ensure_writable()?;

        match (self.kind, at) {
            (CollectionKind::Mapping, InsertAt::Key(key)) => self.insert_key(key, value),
            (CollectionKind::Mapping, _) => Err(Error::unsupported("positional insert", self.kind)),
            (_, at) => self.insert_position(at, value),
        }
    }

    fn insert_position(&mut self, at: InsertAt, value: Value) -> Result<Key> {
        let (position, row) = match at {
            InsertAt::End => (self.keys.len(), self.keys.len()),
            InsertAt::Row(row, placement) => {
                let key = self.row_key(row)?;
                let position = key.as_index().ok_or_else(|| Error::KeyNotFound { key: key.clone() })?;
                match placement {
                    Placement::Above => (position, row),
                    Placement::Below => (position + 1, row + 1),
                }
            }
            InsertAt::Key(key) => {
                let row = self.position_of(&key)?;
                let position = key.as_index().ok_or(Error::KeyNotFound { key })?;
                (position, row)
            }
        };

        self.provider.insert_at(position, value)?;
        let key = Key::from(position);
        if self.reload_if_remote()? {
            return Ok(key);
        }

        for k in self.keys.iter_mut() {
            if let Some(i) = k.as_index().filter(|&i| i >= position) {
                *k = Key::from(i + 1);
            }
        }
        self.splice_row(row, key.clone())?;
        self.renumber_sequence();
        self.rescore();
        Ok(key)
    }

    fn insert_key(&mut self, key: Key, value: Value) -> Result<Key> {
        if self.keys.contains(&key) {
            self.set_value(&key, value)?;
            return Ok(key);
        }
        self.provider.new_value(&key, value)?;
        if self.reload_if_remote()? {
            return Ok(key);
        }
        self.original_keys.push(key.clone());
        self.splice_row(self.keys.len(), key.clone())?;
        self.rescore();
        Ok(key)
    }

    /// Deletes every given key; argument order does not matter
    pub fn remove(&mut self, keys: &[Key]) -> Result<()> {
        if self.kind == CollectionKind::Object {
            return Err(Error::unsupported("remove", self.kind));
        }
        self.ensure_writable()?;

        let mut seen = HashSet::new();
        let unique: Vec<Key> = keys.iter().filter(|k| seen.insert(*k)).cloned().collect();
        let mut rows = unique.iter().map(|k| self.position_of(k)).collect::<Result<Vec<_>>>()?;

        self.provider.remove_values(&unique)?;
        if self.reload_if_remote()? {
            return Ok(());
        }

        let loaded = self.meta.len();
        rows.sort_unstable();
        for &row in rows.iter().rev() {
            self.keys.remove(row);
            if row < self.meta.len() {
                self.meta.remove(row);
            }
        }

        if self.kind == CollectionKind::Sequence {
            let mut positions: Vec<usize> = unique.iter().filter_map(Key::as_index).collect();
            positions.sort_unstable();
            for k in self.keys.iter_mut() {
                if let Some(i) = k.as_index() {
                    let below = positions.partition_point(|&p| p < i);
                    *k = Key::from(i - below);
                }
            }
            self.renumber_sequence();
        } else {
            self.original_keys.retain(|k| !seen.contains(k));
        }

        let indexes: Vec<usize> = rows.into_iter().filter(|&r| r < loaded).collect();
        if !indexes.is_empty() {
            self.changeset.push(AdapterChange::RowsRemoved { indexes });
        }
        self.rescore();
        Ok(())
    }

    /// Duplicates `source` under `target` and returns the key written.
    /// Sequences append the copy and ignore `target`.
    pub fn copy(&mut self, source: &Key, target: &Key) -> Result<Key> {
        if self.kind == CollectionKind::Object {
            return Err(Error::unsupported("copy", self.kind));
        }
        if self.kind == CollectionKind::Mapping && !source.is_textual() {
            return Err(Error::InvalidKeyType {
                operation: "duplicate",
                key: source.clone(),
            });
        }
        self.ensure_writable()?;
        self.position_of(source)?;
        if self.kind == CollectionKind::Mapping && source == target {
            return Ok(source.clone());
        }

        let existing = self.keys.iter().position(|k| k == target);
        let written = self.provider.copy_value(source, target)?;
        if self.reload_if_remote()? {
            return Ok(written);
        }

        match existing.filter(|_| self.kind == CollectionKind::Mapping) {
            Some(row) => self.refresh_row(row)?,
            None => {
                if self.kind == CollectionKind::Mapping {
                    self.original_keys.push(written.clone());
                }
                self.splice_row(self.keys.len(), written.clone())?;
                if self.kind == CollectionKind::Sequence {
                    self.renumber_sequence();
                }
            }
        }
        self.rescore();
        Ok(written)
    }

    /// Moves `source` to `target` (copy, then remove the original)
    pub fn rename(&mut self, source: &Key, target: &Key) -> Result<Key> {
        match self.kind {
            CollectionKind::Mapping if source.is_textual() => {}
            CollectionKind::Mapping | CollectionKind::Sequence => {
                return Err(Error::InvalidKeyType {
                    operation: "rename",
                    key: source.clone(),
                })
            }
            kind => return Err(Error::unsupported("rename", kind)),
        }
        self.ensure_writable()?;
        self.position_of(source)?;
        if source == target {
            return Ok(target.clone());
        }

        if self.provider.is_remote() {
            self.provider.copy_value(source, target)?;
            self.provider.remove_values(std::slice::from_ref(source))?;
            self.refresh()?;
            return Ok(target.clone());
        }

        let written = self.copy(source, target)?;
        self.remove(std::slice::from_ref(source))?;
        Ok(written)
    }
}
