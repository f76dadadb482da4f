//! Named filter registry
//!
//! Administrative code holds a handle to a registry and reaches filters
//! through it. The registry is an ordinary value, not process-global state.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::OverrideError;
use crate::filter::StrategyFilter;
use crate::strategy::OverrideStrategy;

/// Map from filter name to live filter
#[derive(Debug, Default)]
pub struct FilterRegistry {
    filters: DashMap<String, Arc<StrategyFilter>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a filter and make it reachable by name, replacing any filter of the same name
    pub fn register(&self, filter: Arc<StrategyFilter>) -> Result<(), OverrideError> {
        filter.start()?;
        let name = filter.name().to_string();
        if let Some(previous) = self.filters.insert(name.clone(), Arc::clone(&filter)) {
            // Registering the same filter again must leave it running
            if !Arc::ptr_eq(&previous, &filter) {
                previous.stop();
            }
        }
        debug!(filter = %name, "Registered filter");
        Ok(())
    }

    /// Stop and remove a filter
    pub fn unregister(&self, name: &str) -> Result<Arc<StrategyFilter>, OverrideError> {
        let (_, filter) = self
            .filters
            .remove(name)
            .ok_or_else(|| OverrideError::FilterNotFound(name.to_string()))?;
        filter.stop();
        debug!(filter = %name, "Unregistered filter");
        Ok(filter)
    }

    pub fn get(&self, name: &str) -> Result<Arc<StrategyFilter>, OverrideError> {
        self.filters
            .get(name)
            .map(|filter| Arc::clone(&filter))
            .ok_or_else(|| OverrideError::FilterNotFound(name.to_string()))
    }

    pub fn strategy(&self, name: &str) -> Result<Option<Arc<dyn OverrideStrategy>>, OverrideError> {
        Ok(self.get(name)?.strategy())
    }

    pub fn set_strategy(
        &self,
        name: &str,
        strategy: Arc<dyn OverrideStrategy>,
    ) -> Result<(), OverrideError> {
        self.get(name)?.set_strategy(strategy);
        Ok(())
    }

    pub fn remove_strategy(&self, name: &str) -> Result<(), OverrideError> {
        self.get(name)?.remove_strategy();
        Ok(())
    }

    /// Registered filter names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.filters.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}
