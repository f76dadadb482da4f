//! Per-thread diagnostic context
//!
//! A small key/value map scoped to the current thread, used to carry
//! request-specific settings such as a level override down to the decision
//! point without threading them through every call.

use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static CONTEXT: RefCell<HashMap<String, String>> = RefCell::new(HashMap::new());
}

/// Restores the previous value of a context key when dropped
#[must_use = "the context value is removed when the guard is dropped"]
#[derive(Debug)]
pub struct ContextGuard {
    key: String,
    previous: Option<String>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CONTEXT.with(|context| {
            let mut context = context.borrow_mut();
            match previous {
                Some(value) => context.insert(self.key.clone(), value),
                None => context.remove(&self.key),
            };
        });
    }
}

/// Set a context value for the current thread until the guard is dropped
pub fn insert(key: impl Into<String>, value: impl Into<String>) -> ContextGuard {
    let key = key.into();
    let previous = CONTEXT.with(|context| context.borrow_mut().insert(key.clone(), value.into()));
    ContextGuard { key, previous }
}

/// Get a context value for the current thread
pub fn get(key: &str) -> Option<String> {
    CONTEXT.with(|context| context.borrow().get(key).cloned())
}

/// Remove every context value for the current thread
pub fn clear() {
    CONTEXT.with(|context| context.borrow_mut().clear());
}
