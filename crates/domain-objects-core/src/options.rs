//! Per-collection behaviour switches.

/// What happens to a pending entry whose provider fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Failures are not memoized: the next operation that needs the entry
    /// calls the provider again.
    #[default]
    Retry,
    /// The first failure is cached on the entry and reported by every later
    /// operation without calling the provider again.
    Poison,
}

/// Whether equal values may occupy more than one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    #[default]
    Allow,
    /// `add` of a value equal to a realized entry is ignored, and a realized
    /// provider whose value is already present is dropped without notifying
    /// listeners.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollectionOptions {
    pub failure_policy: FailurePolicy,
    pub duplicates: DuplicatePolicy,
}

impl CollectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }
}
