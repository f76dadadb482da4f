//! Log level override engine for levelgate
//!
//! This crate decides, per log event, whether the event should be forced
//! through, forced out, or left to normal processing, based on a table of
//! logger-name-prefix overrides and a validity gate.

pub mod context;
mod error;
mod filter;
mod gate;
mod registry;
mod resolver;
mod strategy;

pub use error::{GateError, OverrideError};
pub use filter::StrategyFilter;
pub use gate::{Gate, ValidityGate};
pub use registry::FilterRegistry;
pub use resolver::{OverrideResolver, longest_prefix_match};
pub use strategy::{ContextOverride, OverrideStrategy};

// Re-export types used in our public API
pub use levelgate_types::{Level, ParseLevelError, Verdict};
