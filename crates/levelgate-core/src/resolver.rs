//! Prefix override resolution
//!
//! The resolver owns a table of logger-name prefixes to override levels and a
//! cache of full logger names to the level resolved from that table.
//!
//! # Consistency
//!
//! Every table mutation takes the table write lock and evicts affected cache
//! entries before releasing it. Cache misses compute and store their result
//! while holding the table read lock, so a stale result can never be stored
//! after an invalidation pass has run. Cache hits touch only the cache.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use levelgate_types::{Level, Verdict};

use crate::error::OverrideError;
use crate::gate::Gate;

/// Runtime log level override engine
pub struct OverrideResolver {
    /// Level seeded under the root prefix on construction and reset
    default_root: Level,

    /// Gate enabling the whole mechanism (None = disabled)
    gate: RwLock<Option<Arc<dyn Gate>>>,

    /// Prefix -> override level
    overrides: RwLock<HashMap<String, Level>>,

    /// Full logger name -> resolved level (None = no override applies)
    cache: DashMap<String, Option<Level>>,
}

impl OverrideResolver {
    /// Create a resolver with only the root override set, and no gate
    pub fn new(default_root: Level) -> Self {
        let mut overrides = HashMap::new();
        overrides.insert(String::new(), default_root);

        Self {
            default_root,
            gate: RwLock::new(None),
            overrides: RwLock::new(overrides),
            cache: DashMap::new(),
        }
    }

    /// Builder-style gate for construction
    pub fn with_gate(self, gate: impl Gate + 'static) -> Self {
        self.set_gate(gate);
        self
    }

    /// Decide the verdict for one log event
    pub fn decide(&self, logger: &str, level: Level) -> Result<Verdict, OverrideError> {
        let Some(gate) = self.gate.read().clone() else {
            return Ok(Verdict::Neutral);
        };
        if !gate.evaluate()? {
            return Ok(Verdict::Neutral);
        }

        Ok(match self.resolve(logger) {
            None => Verdict::Neutral,
            Some(threshold) if level.is_at_least(threshold) => Verdict::Accept,
            Some(_) => Verdict::Deny,
        })
    }

    /// Resolve a logger name to its override level, consulting the cache first
    pub fn resolve(&self, logger: &str) -> Option<Level> {
        if let Some(hit) = self.cache.get(logger) {
            return *hit;
        }

        let overrides = self.overrides.read();
        let resolved = longest_prefix_match(overrides.iter(), logger);
        trace!(logger, ?resolved, "Override cache miss");
        self.cache.insert(logger.to_string(), resolved);
        resolved
    }

    /// Set the override level for a prefix
    pub fn set_override(&self, prefix: impl Into<String>, level: Level) {
        let prefix = prefix.into();
        let mut overrides = self.overrides.write();
        let evicted = self.invalidate(&prefix);
        debug!(prefix = %prefix, %level, evicted, "Set level override");
        overrides.insert(prefix, level);
    }

    /// Set an override from a level name, failing on unrecognized names
    pub fn set_override_named(
        &self,
        prefix: impl Into<String>,
        level: &str,
    ) -> Result<(), OverrideError> {
        let level = level.parse::<Level>()?;
        self.set_override(prefix, level);
        Ok(())
    }

    /// Remove the override for a prefix, returning its level if it existed
    pub fn remove_override(&self, prefix: &str) -> Option<Level> {
        let mut overrides = self.overrides.write();
        let removed = overrides.remove(prefix);
        let evicted = self.invalidate(prefix);
        debug!(prefix, ?removed, evicted, "Removed level override");
        removed
    }

    /// Set the override applying to every logger
    pub fn set_root_override(&self, level: Level) {
        self.set_override(String::new(), level);
    }

    /// Swap in a new gate for subsequent decisions
    pub fn set_gate(&self, gate: impl Gate + 'static) {
        debug!(gate = %gate.describe(), "Set override gate");
        *self.gate.write() = Some(Arc::new(gate));
    }

    /// Disable overriding until a gate is set again
    pub fn remove_gate(&self) {
        debug!("Removed override gate");
        *self.gate.write() = None;
    }

    /// Whether a gate is configured
    pub fn has_gate(&self) -> bool {
        self.gate.read().is_some()
    }

    /// Drop the gate, all overrides and the cache, then reseed the root override
    pub fn reset(&self) {
        *self.gate.write() = None;
        let mut overrides = self.overrides.write();
        overrides.clear();
        self.cache.clear();
        overrides.insert(String::new(), self.default_root);
        debug!(root = %self.default_root, "Reset level overrides");
    }

    /// Snapshot of the override table
    pub fn overrides(&self) -> BTreeMap<String, Level> {
        self.overrides
            .read()
            .iter()
            .map(|(prefix, level)| (prefix.clone(), *level))
            .collect()
    }

    /// Cached resolution for a logger name, `None` if not cached
    pub fn cached(&self, logger: &str) -> Option<Option<Level>> {
        self.cache.get(logger).map(|entry| *entry)
    }

    /// Number of cached logger names
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn default_root(&self) -> Level {
        self.default_root
    }

    /// Evict cached names starting with `prefix` (caller holds the table write lock)
    fn invalidate(&self, prefix: &str) -> usize {
        let before = self.cache.len();
        if prefix.is_empty() {
            self.cache.clear();
        } else {
            self.cache.retain(|logger, _| !logger.starts_with(prefix));
        }
        before.saturating_sub(self.cache.len())
    }
}

impl fmt::Debug for OverrideResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideResolver")
            .field("default_root", &self.default_root)
            .field("has_gate", &self.has_gate())
            .field("overrides", &self.overrides())
            .field("cached", &self.cache_len())
            .finish()
    }
}

/// Level of the longest prefix of `logger` in `overrides`
///
/// Keys are unique, so at most one matching prefix has the maximal length.
pub fn longest_prefix_match<'a, I>(overrides: I, logger: &str) -> Option<Level>
where
    I: IntoIterator<Item = (&'a String, &'a Level)>,
{
    overrides
        .into_iter()
        .filter(|(prefix, _)| logger.starts_with(prefix.as_str()))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, level)| *level)
}
