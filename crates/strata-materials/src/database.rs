//! Named registry of material providers.
//!
//! A [`MaterialDatabase`] is built once (from embedded data, parsed files
//! or analytic models), then shared read-only by every solve that needs to
//! resolve a material by name. Nothing is cached globally: callers own the
//! database and pass it where it is needed.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::constant::ConstantIndex;
use crate::provider::{MaterialError, MaterialProvider};

/// Name → provider lookup table.
#[derive(Clone, Default)]
pub struct MaterialDatabase {
    entries: BTreeMap<String, Arc<dyn MaterialProvider>>,
}

impl MaterialDatabase {
    /// An empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// A database pre-populated with `vacuum` / `air`.
    pub fn with_ambient() -> Self {
        let mut db = Self::new();
        let vacuum: Arc<dyn MaterialProvider> = Arc::new(ConstantIndex::vacuum());
        db.entries.insert("vacuum".into(), Arc::clone(&vacuum));
        db.entries.insert("air".into(), vacuum);
        db
    }

    /// Register a provider under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, provider: Arc<dyn MaterialProvider>) {
        let name = name.into();
        if self.entries.insert(name.clone(), provider).is_some() {
            log::debug!("material '{}' redefined", name);
        }
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn MaterialProvider>, MaterialError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| MaterialError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for MaterialDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialDatabase")
            .field("materials", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
