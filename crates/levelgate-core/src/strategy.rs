use levelgate_types::{Level, Verdict};

use crate::context;
use crate::error::OverrideError;
use crate::resolver::OverrideResolver;

/// Pluggable decision function for log events
pub trait OverrideStrategy: Send + Sync {
    fn decide(&self, logger: &str, level: Level) -> Result<Verdict, OverrideError>;
}

impl OverrideStrategy for OverrideResolver {
    fn decide(&self, logger: &str, level: Level) -> Result<Verdict, OverrideError> {
        OverrideResolver::decide(self, logger, level)
    }
}

/// Overrides the level for the current thread from a diagnostic context key
///
/// Useful for turning up logging for a single request. The logger name is
/// ignored; a missing or unrecognized level name gives no opinion.
#[derive(Clone, Debug)]
pub struct ContextOverride {
    key: String,
}

impl ContextOverride {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl OverrideStrategy for ContextOverride {
    fn decide(&self, _logger: &str, level: Level) -> Result<Verdict, OverrideError> {
        let threshold = context::get(&self.key).and_then(|name| Level::from_name(&name));
        let Some(threshold) = threshold else {
            return Ok(Verdict::Neutral);
        };
        if level.is_at_least(threshold) {
            Ok(Verdict::Accept)
        } else {
            Ok(Verdict::Deny)
        }
    }
}
