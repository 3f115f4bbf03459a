//! In-memory resource provider.

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use resq_core::{Error, Request, Resource, ResourceProvider, Result};

/// A resource provider backed by a guarded in-memory row store.
///
/// Entity identity comes from a caller-supplied key extractor, since
/// the provider contract itself carries no identity notion. By default
/// the provider natively applies the translatable condition subset, the
/// way a real storage backend would; [`apply_none`](MemoryProvider::apply_none)
/// switches it to the contract's other legal mode, leaving all
/// filtering to the orchestrator.
pub struct MemoryProvider<T> {
    rows: RwLock<Vec<T>>,
    key: fn(&T) -> Value,
    native_conditions: bool,
    native_count: bool,
    fail_with: Mutex<Option<Error>>,
}

impl<T: Resource + Clone> MemoryProvider<T> {
    /// Creates an empty provider with the given identity extractor.
    pub fn new(key: fn(&T) -> Value) -> Self {
        MemoryProvider {
            rows: RwLock::new(Vec::new()),
            key,
            native_conditions: true,
            native_count: false,
            fail_with: Mutex::new(None),
        }
    }

    /// Creates a provider seeded with rows.
    pub fn with_rows(key: fn(&T) -> Value, rows: Vec<T>) -> Self {
        let provider = Self::new(key);
        *provider.rows.write() = rows;
        provider
    }

    /// Switches to the apply-none mode: `select` returns every row and
    /// the orchestrator post-filters everything.
    #[must_use]
    pub fn apply_none(mut self) -> Self {
        self.native_conditions = false;
        self
    }

    /// Declares native counting capability.
    #[must_use]
    pub fn with_native_count(mut self) -> Self {
        self.native_count = true;
        self
    }

    /// Makes the next provider call fail with the given error.
    pub fn fail_next(&self, error: Error) {
        *self.fail_with.lock() = Some(error);
    }

    /// Snapshot of the stored rows.
    pub fn rows(&self) -> Vec<T> {
        self.rows.read().clone()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn check_failure(&self) -> Result<()> {
        match self.fail_with.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn matching_rows(&self, request: &Request<T>) -> Vec<T> {
        let rows = self.rows.read();
        if !self.native_conditions {
            return rows.clone();
        }
        let conditions = request.translatable_conditions();
        rows.iter()
            .filter(|row| {
                let value = row_value(*row);
                conditions.iter().all(|c| c.holds_for(&value))
            })
            .cloned()
            .collect()
    }
}

impl<T: Resource + Clone> ResourceProvider<T> for MemoryProvider<T> {
    fn select<'a>(
        &'a self,
        request: &'a Request<T>,
    ) -> Result<Box<dyn Iterator<Item = T> + 'a>> {
        self.check_failure()?;
        Ok(Box::new(self.matching_rows(request).into_iter()))
    }

    fn insert(&self, _request: &Request<T>, entities: Vec<T>) -> Result<u64> {
        self.check_failure()?;
        let count = entities.len() as u64;
        self.rows.write().extend(entities);
        Ok(count)
    }

    fn update(&self, _request: &Request<T>, entities: Vec<T>) -> Result<u64> {
        self.check_failure()?;
        let mut rows = self.rows.write();
        let mut updated = 0;
        for entity in entities {
            let key = (self.key)(&entity);
            if let Some(slot) = rows.iter_mut().find(|row| (self.key)(row) == key) {
                *slot = entity;
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn delete(&self, _request: &Request<T>, entities: Vec<T>) -> Result<u64> {
        self.check_failure()?;
        let keys: Vec<Value> = entities.iter().map(|e| (self.key)(e)).collect();
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|row| !keys.contains(&(self.key)(row)));
        Ok((before - rows.len()) as u64)
    }

    fn count(&self, request: &Request<T>) -> Result<Option<u64>> {
        self.check_failure()?;
        if !self.native_count {
            return Ok(None);
        }
        Ok(Some(self.matching_rows(request).len() as u64))
    }

    fn applies_conditions(&self) -> bool {
        self.native_conditions
    }
}

/// The serialized value form of a row.
pub fn row_value<T: Resource>(row: &T) -> Value {
    serde_json::to_value(row).unwrap_or(Value::Null)
}
