//! Edit sessions.
//!
//! A session edits a detached working copy of a collection and hands it
//! back on `commit`. Values that cannot be copied faithfully (uncopyable
//! objects, or a copy that comes back as a different type) open read-only
//! so the original is never silently replaced.

use crate::adapter::CollectionAdapter;
use crate::config::AdapterOptions;
use crate::error::{Error, Result};
use crate::provider::LocalProvider;
use crate::value::{Mapping, Value};

/// Re-reads the edited variable from wherever it lives
pub type DataFunction = Box<dyn Fn() -> Result<Value>>;

pub struct EditSession {
    adapter: CollectionAdapter,
    original_type: String,
    read_only: bool,
    dirty: bool,
    closed: bool,
    data_function: Option<DataFunction>,
}

/// Copy that shares nothing mutable with `value`, if one can be made
fn detached_copy(value: &Value) -> Option<Value> {
    Some(match value {
        Value::Object(obj) => Value::Object(obj.duplicate()?),
        Value::List(items) => Value::List(items.iter().map(detached_copy).collect::<Option<_>>()?),
        Value::Tuple(items) => Value::Tuple(items.iter().map(detached_copy).collect::<Option<_>>()?),
        Value::Set(items) => Value::Set(items.iter().map(detached_copy).collect::<Option<_>>()?),
        Value::Dict(mapping) => Value::Dict(
            mapping
                .iter()
                .map(|(k, v)| detached_copy(v).map(|v| (k.clone(), v)))
                .collect::<Option<Mapping>>()?,
        ),
        other => other.clone(),
    })
}

impl EditSession {
    pub fn open(value: &Value, options: AdapterOptions) -> Result<Self> {
        let original_type = value.type_name();
        let (working, read_only) = match detached_copy(value) {
            Some(copy) if copy.type_name() == original_type => (copy, false),
            Some(copy) => {
                log::warn!(
                    "copy of {} came back as {}, opening read-only",
                    original_type,
                    copy.type_name()
                );
                (value.clone(), true)
            }
            None => {
                log::warn!("{} cannot be copied, opening read-only", original_type);
                (value.clone(), true)
            }
        };

        Ok(EditSession {
            adapter: CollectionAdapter::from_value(working, options)?,
            original_type,
            read_only,
            dirty: false,
            closed: false,
            data_function: None,
        })
    }

    pub fn with_data_function(mut self, function: DataFunction) -> Self {
        self.data_function = Some(function);
        self
    }

    pub fn adapter(&self) -> &CollectionAdapter {
        &self.adapter
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only || self.closed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.is_read_only() {
            return Err(Error::ReadOnly {
                what: format!("edit session for {}", self.original_type),
            });
        }
        Ok(())
    }

    /// Runs one adapter mutation against the working copy
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut CollectionAdapter) -> Result<R>) -> Result<R> {
        self.ensure_editable()?;
        let result = f(&mut self.adapter)?;
        self.dirty = true;
        Ok(result)
    }

    /// Returns the edited collection; a top-level type change makes the
    /// session read-only instead
    pub fn commit(&mut self) -> Result<Value> {
        self.ensure_editable()?;
        let value = self.adapter.provider().snapshot()?;
        let found = value.type_name();
        if found != self.original_type {
            self.read_only = true;
            return Err(Error::TypeMismatchOnCommit {
                expected: self.original_type.clone(),
                found,
            });
        }
        self.dirty = false;
        log::info!("committed {} ({} rows)", found, self.adapter.total_row_count());
        Ok(value)
    }

    /// Reloads the working copy from the data function. Unsaved edits are
    /// kept unless `force` is set; returns whether a reload happened.
    pub fn refresh(&mut self, force: bool) -> Result<bool> {
        let Some(function) = &self.data_function else {
            return Err(Error::unsupported("refresh", "an edit session without a data source"));
        };
        if self.dirty && !force {
            return Ok(false);
        }

        let value = match function() {
            Ok(value) => value,
            Err(Error::KeyNotFound { .. }) | Err(Error::IndexOutOfRange { .. }) | Err(Error::VariableGone) => {
                self.closed = true;
                return Err(Error::VariableGone);
            }
            Err(e) => return Err(e),
        };
        self.adapter.reset(Box::new(LocalProvider::from_value(value)?))?;
        self.dirty = false;
        Ok(true)
    }
}
