use crate::events::EventLog;
use domain_objects_core::{Provider, ProviderError, ProviderRef, TypeTag};
use std::cell::Cell;
use std::rc::Rc;

/// Provider that records each `get()` in an [`EventLog`] as `"get:{label}"`.
///
/// It does not memoize, so every call the collection makes shows up in the
/// log. It can be told to fail a number of times before succeeding.
pub struct RecordingProvider<T> {
    label: String,
    value: T,
    declared: Option<&'static TypeTag>,
    failures_left: Cell<usize>,
    calls: Cell<usize>,
    log: EventLog,
}

impl<T: Clone + 'static> RecordingProvider<T> {
    pub fn new(log: &EventLog, label: impl Into<String>, value: T) -> Self {
        Self {
            label: label.into(),
            value,
            declared: None,
            failures_left: Cell::new(0),
            calls: Cell::new(0),
            log: log.clone(),
        }
    }

    pub fn declared(mut self, declared: &'static TypeTag) -> Self {
        self.declared = Some(declared);
        self
    }

    /// Fails the next `failures` calls with `"{label} failed"`.
    pub fn failing(self, failures: usize) -> Self {
        self.failures_left.set(failures);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn into_ref(self) -> ProviderRef<T> {
        Rc::new(self)
    }
}

impl<T: Clone + 'static> Provider<T> for RecordingProvider<T> {
    fn declared_type(&self) -> Option<&'static TypeTag> {
        self.declared
    }

    fn get(&self) -> Result<T, ProviderError> {
        self.calls.set(self.calls.get() + 1);
        self.log.push(format!("get:{}", self.label));
        let failures = self.failures_left.get();
        if failures > 0 {
            self.failures_left.set(failures - 1);
            log::debug!("provider {} failing on purpose", self.label);
            return Err(ProviderError::new(format!("{} failed", self.label)));
        }
        Ok(self.value.clone())
    }
}
