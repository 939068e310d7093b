use crate::{Provider, ProviderError, ProviderRef, TypeTag, Typed};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

pub(crate) type CallLog = Rc<RefCell<Vec<String>>>;

pub(crate) fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub(crate) fn entries(log: &CallLog) -> Vec<String> {
    log.borrow().clone()
}

/// Provider that records every `get()` and does not memoize, so a second call
/// by the collection would show up in the log.
pub(crate) struct Probe<T> {
    label: &'static str,
    value: T,
    declared: Option<&'static TypeTag>,
    failures: Cell<usize>,
    log: CallLog,
}

impl<T: Clone + 'static> Probe<T> {
    pub(crate) fn new(log: &CallLog, label: &'static str, value: T) -> ProviderRef<T> {
        Self::build(log, label, value, None, 0)
    }

    pub(crate) fn typed(
        log: &CallLog,
        label: &'static str,
        declared: &'static TypeTag,
        value: T,
    ) -> ProviderRef<T> {
        Self::build(log, label, value, Some(declared), 0)
    }

    pub(crate) fn failing(
        log: &CallLog,
        label: &'static str,
        failures: usize,
        value: T,
    ) -> ProviderRef<T> {
        Self::build(log, label, value, None, failures)
    }

    fn build(
        log: &CallLog,
        label: &'static str,
        value: T,
        declared: Option<&'static TypeTag>,
        failures: usize,
    ) -> ProviderRef<T> {
        Rc::new(Self {
            label,
            value,
            declared,
            failures: Cell::new(failures),
            log: Rc::clone(log),
        })
    }
}

impl<T: Clone + 'static> Provider<T> for Probe<T> {
    fn declared_type(&self) -> Option<&'static TypeTag> {
        self.declared
    }

    fn get(&self) -> Result<T, ProviderError> {
        self.log.borrow_mut().push(self.label.to_string());
        let failures = self.failures.get();
        if failures > 0 {
            self.failures.set(failures - 1);
            return Err(ProviderError::new(format!("{} failed", self.label)));
        }
        Ok(self.value.clone())
    }
}

/// Listener action appending `"{prefix}:{value}"` to `log`.
pub(crate) fn recorder<T: fmt::Display + 'static>(
    log: &CallLog,
    prefix: &'static str,
) -> impl Fn(&T) + 'static {
    let log = Rc::clone(log);
    move |value: &T| log.borrow_mut().push(format!("{prefix}:{value}"))
}

pub(crate) static TASK: TypeTag = TypeTag::root("Task");
pub(crate) static COMPILE: TypeTag = TypeTag::extends("Compile", &TASK);
pub(crate) static JAVA_COMPILE: TypeTag = TypeTag::extends("JavaCompile", &COMPILE);
pub(crate) static TEST: TypeTag = TypeTag::extends("Test", &TASK);

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Node {
    pub(crate) name: &'static str,
    pub(crate) tag: &'static TypeTag,
}

impl Node {
    pub(crate) fn new(name: &'static str, tag: &'static TypeTag) -> Self {
        Self { name, tag }
    }
}

impl Typed for Node {
    fn type_tag(&self) -> &'static TypeTag {
        self.tag
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
