use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use levelgate_types::{Level, Verdict};

use crate::error::OverrideError;
use crate::strategy::OverrideStrategy;

/// Named filter delegating decisions to a swappable strategy
pub struct StrategyFilter {
    /// Filter name, must be non-empty to start
    name: String,

    /// Whether the filter is taking part in decisions
    started: AtomicBool,

    /// Current strategy (None = no opinion)
    strategy: RwLock<Option<Arc<dyn OverrideStrategy>>>,
}

impl StrategyFilter {
    /// Create a stopped filter with no strategy
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: AtomicBool::new(false),
            strategy: RwLock::new(None),
        }
    }

    /// Set the initial strategy
    pub fn with_strategy(self, strategy: Arc<dyn OverrideStrategy>) -> Self {
        self.set_strategy(strategy);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> Result<(), OverrideError> {
        if self.name.is_empty() {
            return Err(OverrideError::UnnamedFilter);
        }
        self.started.store(true, Ordering::Release);
        debug!(filter = %self.name, "Started filter");
        Ok(())
    }

    pub fn stop(&self) {
        self.started.store(false, Ordering::Release);
        debug!(filter = %self.name, "Stopped filter");
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn set_strategy(&self, strategy: Arc<dyn OverrideStrategy>) {
        *self.strategy.write() = Some(strategy);
    }

    pub fn remove_strategy(&self) {
        *self.strategy.write() = None;
    }

    pub fn strategy(&self) -> Option<Arc<dyn OverrideStrategy>> {
        self.strategy.read().clone()
    }

    /// Decide for one event; neutral while stopped or without a strategy
    pub fn decide(&self, logger: &str, level: Level) -> Result<Verdict, OverrideError> {
        if !self.is_started() {
            return Ok(Verdict::Neutral);
        }
        match self.strategy() {
            Some(strategy) => strategy.decide(logger, level),
            None => Ok(Verdict::Neutral),
        }
    }
}

impl std::fmt::Debug for StrategyFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyFilter")
            .field("name", &self.name)
            .field("started", &self.is_started())
            .field("has_strategy", &self.strategy.read().is_some())
            .finish()
    }
}
