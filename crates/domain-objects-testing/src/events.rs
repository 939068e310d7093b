use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Ordered record of provider calls and listener notifications, shared by
/// cloning.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    /// Listener action recording `"{prefix}:{value}"` for every element it
    /// sees.
    pub fn listener<T: fmt::Display + 'static>(
        &self,
        prefix: &'static str,
    ) -> impl Fn(&T) + 'static {
        let log = self.clone();
        move |value: &T| log.push(format!("{prefix}:{value}"))
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    /// Returns the recorded events and starts over.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|recorded| recorded.as_str() == event)
            .count()
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.events.borrow().iter()).finish()
    }
}
