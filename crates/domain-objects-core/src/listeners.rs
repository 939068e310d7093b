//! Listener registry shared by a collection and all of its views.
//!
//! Each registration remembers the filter chain of the collection or view it
//! was made on; dispatch skips values the chain rejects.

use crate::filter::{ChainRef, Verdict};
use crate::type_tag::TypeTag;
use smallvec::SmallVec;
use std::rc::Rc;

pub(crate) type Action<T> = Rc<dyn Fn(&T)>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ListenerKind {
    /// Replays realized elements and forces pending ones.
    All,
    /// Replays realized elements, observes later realizations.
    ConfigureEach,
    /// Observes later realizations only.
    WhenAdded,
    WhenRemoved,
}

pub(crate) struct Registration<T> {
    kind: ListenerKind,
    chain: ChainRef<T>,
    action: Action<T>,
}

impl<T> Registration<T> {
    pub(crate) fn new(kind: ListenerKind, chain: ChainRef<T>, action: Action<T>) -> Rc<Self> {
        Rc::new(Self {
            kind,
            chain,
            action,
        })
    }

    pub(crate) fn kind(&self) -> ListenerKind {
        self.kind
    }

    /// Invokes the action if `value` passes this registration's filters.
    pub(crate) fn fire(&self, value: &T) {
        if self.chain.accepts(value) {
            (self.action)(value);
        }
    }
}

pub(crate) type Snapshot<T> = SmallVec<[Rc<Registration<T>>; 8]>;

pub(crate) struct ListenerRegistry<T> {
    eager: Vec<Rc<Registration<T>>>,
    deferred: Vec<Rc<Registration<T>>>,
    removed: Vec<Rc<Registration<T>>>,
}

impl<T> ListenerRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            eager: Vec::new(),
            deferred: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub(crate) fn register(&mut self, registration: Rc<Registration<T>>) {
        match registration.kind {
            ListenerKind::All => self.eager.push(registration),
            ListenerKind::ConfigureEach | ListenerKind::WhenAdded => {
                self.deferred.push(registration)
            }
            ListenerKind::WhenRemoved => self.removed.push(registration),
        }
    }

    /// Whether a newly added provider must be realized right away because an
    /// `all` registration might want its value.
    pub(crate) fn wants_eager(&self, declared: Option<&'static TypeTag>) -> bool {
        self.eager
            .iter()
            .any(|registration| registration.chain.verdict(declared) != Verdict::Excluded)
    }

    /// Registrations to notify when an element becomes realized: every `all`
    /// registration first, then the deferred ones, each in registration order.
    pub(crate) fn added_snapshot(&self) -> Snapshot<T> {
        self.eager
            .iter()
            .chain(self.deferred.iter())
            .cloned()
            .collect()
    }

    pub(crate) fn removed_snapshot(&self) -> Snapshot<T> {
        self.removed.iter().cloned().collect()
    }

    pub(crate) fn has_removed_listeners(&self) -> bool {
        !self.removed.is_empty()
    }
}
