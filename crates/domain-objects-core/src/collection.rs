//! The collection facade and the shared state behind it and its views.

use crate::collections::map::HashSet;
use crate::entry::{Claim, Entry, EntryId, EntryStore, PendingState, RealizedEntry, Removed};
use crate::error::CollectionError;
use crate::filter::{ChainRef, Filter, FilterChain, Verdict};
use crate::iter::Iter;
use crate::listeners::{Action, ListenerKind, ListenerRegistry, Registration};
use crate::options::{CollectionOptions, DuplicatePolicy, FailurePolicy};
use crate::provider::{ProviderId, ProviderRef};
use crate::type_tag::{TypeTag, Typed};
use crate::view::FilteredView;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// An element or provider named in a bulk removal.
pub enum Member<T> {
    /// Matches realized entries equal to the value.
    Value(T),
    /// Matches the pending entry backed by this provider, or the realized
    /// entry it produced.
    Provider(ProviderRef<T>),
}

impl<T> Member<T> {
    pub fn provider(provider: &ProviderRef<T>) -> Self {
        Member::Provider(Rc::clone(provider))
    }
}

/// Outcome of one realization attempt.
pub(crate) enum Step<T> {
    Realized(T),
    /// The provider ran but its entry went away (removed during `get()`, or a
    /// rejected duplicate).
    Discarded,
    /// No pending entry is left to realize.
    Exhausted,
}

/// State shared by a collection, its views and their cursors.
///
/// No `RefCell` borrow is held while providers, predicates or listeners run,
/// so all of them may call back into the collection.
pub(crate) struct Shared<T> {
    pub(crate) entries: RefCell<EntryStore<T>>,
    listeners: RefCell<ListenerRegistry<T>>,
    options: CollectionOptions,
}

impl<T: Clone + PartialEq + 'static> Shared<T> {
    fn new(options: CollectionOptions) -> Rc<Self> {
        Rc::new(Self {
            entries: RefCell::new(EntryStore::new()),
            listeners: RefCell::new(ListenerRegistry::new()),
            options,
        })
    }

    fn rejects_duplicates(&self) -> bool {
        self.options.duplicates == DuplicatePolicy::Reject
    }

    fn append(&self, value: T) -> bool {
        {
            let mut entries = self.entries.borrow_mut();
            if self.rejects_duplicates() && entries.realized_contains(&value) {
                log::trace!("ignoring duplicate element");
                return false;
            }
            let id = entries.push_realized(value.clone(), None);
            log::trace!("appended realized entry {id:?}");
        }
        self.notify_added(&value);
        true
    }

    fn append_later(&self, provider: ProviderRef<T>) -> Result<(), CollectionError> {
        let declared = provider.declared_type();
        let id = self.entries.borrow_mut().push_pending(provider, declared);
        log::trace!(
            "appended pending entry {id:?} declared as {}",
            declared.map_or("<unknown>", TypeTag::name)
        );
        let eager = self.listeners.borrow().wants_eager(declared);
        if eager {
            log::debug!("realizing entry {id:?} eagerly for an `all` listener");
            self.realize(id)?;
        }
        Ok(())
    }

    /// The `Pending -> Realized` transition for one entry, including listener
    /// dispatch.
    pub(crate) fn realize(&self, id: EntryId) -> Result<Step<T>, CollectionError> {
        let claim = self.entries.borrow_mut().claim(id);
        let (provider, provider_id) = match claim {
            Claim::Ready(provider, provider_id) => (provider, provider_id),
            Claim::Poisoned(provider, source) => {
                return Err(CollectionError::Poisoned { provider, source })
            }
            Claim::Busy | Claim::Gone => return Ok(Step::Discarded),
        };

        log::debug!("realizing entry {id:?} from provider {provider_id}");
        match provider.get() {
            Ok(value) => {
                let accepted = {
                    let mut entries = self.entries.borrow_mut();
                    if self.rejects_duplicates() && entries.realized_contains(&value) {
                        entries.discard(id);
                        false
                    } else {
                        entries.complete(id, value.clone())
                    }
                };
                if !accepted {
                    log::trace!("dropping value of entry {id:?}");
                    return Ok(Step::Discarded);
                }
                self.notify_added(&value);
                Ok(Step::Realized(value))
            }
            Err(source) => {
                log::warn!("provider {provider_id} failed for entry {id:?}: {source}");
                let poison = match self.options.failure_policy {
                    FailurePolicy::Retry => None,
                    FailurePolicy::Poison => Some(source.clone()),
                };
                self.entries.borrow_mut().fail(id, poison);
                Err(CollectionError::Provider {
                    provider: provider_id,
                    source,
                })
            }
        }
    }

    /// Realizes the first pending entry registered after `*cursor` that
    /// `chain` cannot exclude, and moves `*cursor` past every entry it looked
    /// at. Entries passed over, including one whose provider fails, are not
    /// visited again by the same scan.
    pub(crate) fn realize_next(
        &self,
        chain: &FilterChain<T>,
        cursor: &mut Option<EntryId>,
    ) -> Result<Step<T>, CollectionError> {
        let mut candidate = None;
        for entry in self.entries.borrow().pending_after(*cursor) {
            *cursor = Some(entry.id);
            if !matches!(entry.state, PendingState::Realizing)
                && chain.verdict(entry.declared) != Verdict::Excluded
            {
                candidate = Some(entry.id);
                break;
            }
        }
        match candidate {
            Some(id) => self.realize(id),
            None => Ok(Step::Exhausted),
        }
    }

    fn force_pending(&self, chain: &FilterChain<T>) -> Result<(), CollectionError> {
        let mut cursor = None;
        loop {
            if let Step::Exhausted = self.realize_next(chain, &mut cursor)? {
                return Ok(());
            }
        }
    }

    pub(crate) fn contains(
        &self,
        chain: &FilterChain<T>,
        value: &T,
    ) -> Result<bool, CollectionError> {
        if !chain.accepts(value) {
            return Ok(false);
        }
        if self.entries.borrow().realized_contains(value) {
            return Ok(true);
        }
        let mut cursor = None;
        loop {
            match self.realize_next(chain, &mut cursor)? {
                Step::Realized(realized) if realized == *value => return Ok(true),
                Step::Exhausted => return Ok(self.entries.borrow().realized_contains(value)),
                _ => {}
            }
        }
    }

    pub(crate) fn realized_values(&self, chain: &FilterChain<T>) -> Vec<T> {
        let values: Vec<T> = self
            .entries
            .borrow()
            .realized()
            .iter()
            .map(|entry| entry.value.clone())
            .collect();
        values
            .into_iter()
            .filter(|value| chain.accepts(value))
            .collect()
    }

    /// Upper bound on the members of `chain` that needs no realization.
    pub(crate) fn estimated_len(&self, chain: &FilterChain<T>) -> usize {
        let undecided = self
            .entries
            .borrow()
            .pending()
            .filter(|entry| chain.verdict(entry.declared) != Verdict::Excluded)
            .count();
        self.realized_values(chain).len() + undecided
    }

    pub(crate) fn remove_value(&self, chain: &FilterChain<T>, value: &T) -> bool {
        if !chain.accepts(value) {
            return false;
        }
        let removed = self.entries.borrow_mut().remove_realized_value(value);
        match removed {
            Some(entry) => {
                log::trace!("removed realized entry {:?}", entry.id);
                self.notify_removed(&entry.value);
                true
            }
            None => false,
        }
    }

    /// Removes a realized entry by identity, returning the position it held.
    pub(crate) fn remove_entry(&self, id: EntryId) -> Option<usize> {
        let (index, entry) = self.entries.borrow_mut().remove_realized(id)?;
        log::trace!("removed realized entry {id:?} at {index}");
        self.notify_removed(&entry.value);
        Some(index)
    }

    fn remove_provider(&self, provider: &ProviderRef<T>) -> bool {
        let provider_id = ProviderId::of(provider);
        let removed = self.entries.borrow_mut().remove_by_provider(provider_id);
        match removed {
            Removed::Pending => {
                log::trace!("removed pending entry of provider {provider_id}");
                true
            }
            Removed::Realized(entry) => {
                log::trace!(
                    "removed entry {:?} realized from provider {provider_id}",
                    entry.id
                );
                self.notify_removed(&entry.value);
                true
            }
            Removed::Nothing => false,
        }
    }

    /// Bulk removal. With `retain` set, entries matching `members` are the
    /// ones kept.
    fn remove_members(&self, members: Vec<Member<T>>, retain: bool) -> bool {
        let mut providers: HashSet<ProviderId> = HashSet::default();
        let mut values = Vec::new();
        for member in members {
            match member {
                Member::Value(value) => values.push(value),
                Member::Provider(provider) => {
                    providers.insert(ProviderId::of(&provider));
                }
            }
        }

        let matches_realized = |entry: &RealizedEntry<T>| {
            values.contains(&entry.value)
                || entry
                    .source
                    .as_ref()
                    .is_some_and(|(source, _)| providers.contains(source))
        };
        let (removed, pending_removed) = self.entries.borrow_mut().remove_where(
            |entry| matches_realized(entry) != retain,
            |entry| providers.contains(&entry.provider_id) != retain,
        );
        log::trace!(
            "bulk removal dropped {} realized and {pending_removed} pending entries",
            removed.len()
        );
        let changed = !removed.is_empty() || pending_removed > 0;
        for entry in removed {
            self.notify_removed(&entry.value);
        }
        changed
    }

    fn clear(&self) {
        let (realized, pending) = self.entries.borrow_mut().take_all();
        log::trace!(
            "cleared {} realized and {} pending entries",
            realized.len(),
            pending.len()
        );
        drop(pending);
        if !self.listeners.borrow().has_removed_listeners() {
            return;
        }
        for entry in realized {
            self.notify_removed(&entry.value);
        }
    }

    pub(crate) fn register(
        &self,
        kind: ListenerKind,
        chain: &ChainRef<T>,
        action: Action<T>,
    ) -> Result<(), CollectionError> {
        let registration = Registration::new(kind, Rc::clone(chain), action);
        let replay: Vec<(EntryId, T)> = match kind {
            ListenerKind::All | ListenerKind::ConfigureEach => self
                .entries
                .borrow()
                .realized()
                .iter()
                .map(|entry| (entry.id, entry.value.clone()))
                .collect(),
            ListenerKind::WhenAdded | ListenerKind::WhenRemoved => Vec::new(),
        };
        self.listeners
            .borrow_mut()
            .register(Rc::clone(&registration));
        log::trace!("registered {:?} listener", registration.kind());

        for (id, value) in replay {
            // Elements removed by an earlier replayed action are skipped.
            if self.entries.borrow().contains_realized(id) {
                registration.fire(&value);
            }
        }
        if kind == ListenerKind::All {
            log::debug!("forcing pending entries for an `all` listener");
            self.force_pending(chain)?;
        }
        Ok(())
    }

    fn notify_added(&self, value: &T) {
        let snapshot = self.listeners.borrow().added_snapshot();
        for registration in snapshot {
            registration.fire(value);
        }
    }

    fn notify_removed(&self, value: &T) {
        let snapshot = self.listeners.borrow().removed_snapshot();
        for registration in snapshot {
            registration.fire(value);
        }
    }
}

/// A lazy, insertion-ordered collection of domain objects.
///
/// Elements are either added directly or registered as [`Provider`]s whose
/// values are only computed when an operation needs them: iteration,
/// membership tests, views that cannot rule the provider out by its declared
/// type, or an [`all`](Self::all) listener.
///
/// Handles are cheap to clone and share the same underlying entries. All
/// methods take `&self`; listeners may call back into the collection.
///
/// [`Provider`]: crate::Provider
pub struct DomainObjectCollection<T> {
    shared: Rc<Shared<T>>,
    chain: ChainRef<T>,
}

impl<T> Clone for DomainObjectCollection<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            chain: Rc::clone(&self.chain),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Default for DomainObjectCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq + 'static> DomainObjectCollection<T> {
    pub fn new() -> Self {
        Self::with_options(CollectionOptions::default())
    }

    pub fn with_options(options: CollectionOptions) -> Self {
        Self {
            shared: Shared::new(options),
            chain: FilterChain::unfiltered(),
        }
    }

    pub fn options(&self) -> CollectionOptions {
        self.shared.options
    }

    /// Appends a realized element and notifies listeners.
    ///
    /// Returns `false` only when duplicates are rejected and an equal element
    /// is already realized.
    pub fn add(&self, value: T) -> bool {
        self.shared.append(value)
    }

    pub fn add_all(&self, values: impl IntoIterator<Item = T>) -> bool {
        values
            .into_iter()
            .fold(false, |changed, value| self.add(value) || changed)
    }

    /// Appends a pending entry backed by `provider`.
    ///
    /// Only `declared_type()` is read, unless an [`all`](Self::all) listener
    /// may want the value, in which case it is realized immediately.
    pub fn add_later(&self, provider: ProviderRef<T>) -> Result<(), CollectionError> {
        self.shared.append_later(provider)
    }

    /// Realized entries are checked first; pending entries are then realized
    /// in registration order until an equal value shows up.
    pub fn contains(&self, value: &T) -> Result<bool, CollectionError> {
        self.shared.contains(&self.chain, value)
    }

    /// Removes the first realized entry equal to `value`. Pending entries are
    /// never realized to look for it.
    pub fn remove(&self, value: &T) -> bool {
        self.shared.remove_value(&self.chain, value)
    }

    /// Removes the entry backed by `provider`, matched by identity.
    ///
    /// If the provider was realized already, its value is removed and
    /// `when_object_removed` listeners see it; `get()` is never called.
    pub fn remove_provider(&self, provider: &ProviderRef<T>) -> bool {
        self.shared.remove_provider(provider)
    }

    pub fn remove_all(&self, members: impl IntoIterator<Item = Member<T>>) -> bool {
        self.shared
            .remove_members(members.into_iter().collect(), false)
    }

    /// Keeps only entries matching `members`. Pending entries survive only if
    /// their provider is named.
    pub fn retain_all(&self, members: impl IntoIterator<Item = Member<T>>) -> bool {
        self.shared
            .remove_members(members.into_iter().collect(), true)
    }

    /// Removes every entry without realizing any.
    pub fn clear(&self) {
        self.shared.clear();
    }

    /// Number of entries, pending ones included.
    pub fn len(&self) -> usize {
        self.shared.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.entries.borrow().is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.shared.entries.borrow().pending_len()
    }

    pub fn iter(&self) -> Iter<T> {
        Iter::new(Rc::clone(&self.shared), Rc::clone(&self.chain))
    }

    /// Realizes everything and returns the elements in canonical order.
    pub fn to_vec(&self) -> Result<Vec<T>, CollectionError> {
        self.iter().collect()
    }

    /// Elements already realized, without realizing anything.
    pub fn realized(&self) -> Vec<T> {
        self.shared.realized_values(&self.chain)
    }

    pub fn matching(&self, predicate: impl Fn(&T) -> bool + 'static) -> FilteredView<T> {
        FilteredView::new(
            Rc::clone(&self.shared),
            self.chain.then(Filter::Predicate(Rc::new(predicate))),
        )
    }

    /// Eager snapshot of the elements accepted by `predicate`.
    pub fn find_all(
        &self,
        predicate: impl Fn(&T) -> bool + 'static,
    ) -> Result<Vec<T>, CollectionError> {
        self.matching(predicate).to_vec()
    }

    /// Runs `action` for every element, now and in the future.
    ///
    /// Pending entries are realized before this returns, and providers added
    /// afterwards are realized as soon as they are added.
    pub fn all(&self, action: impl Fn(&T) + 'static) -> Result<(), CollectionError> {
        self.shared
            .register(ListenerKind::All, &self.chain, Rc::new(action))
    }

    /// Runs `action` for every element once it is realized, without forcing
    /// realization.
    pub fn configure_each(&self, action: impl Fn(&T) + 'static) {
        self.register_deferred(ListenerKind::ConfigureEach, Rc::new(action));
    }

    /// Runs `action` for elements realized from now on.
    pub fn when_object_added(&self, action: impl Fn(&T) + 'static) {
        self.register_deferred(ListenerKind::WhenAdded, Rc::new(action));
    }

    /// Runs `action` for every realized element that gets removed.
    pub fn when_object_removed(&self, action: impl Fn(&T) + 'static) {
        self.register_deferred(ListenerKind::WhenRemoved, Rc::new(action));
    }

    fn register_deferred(&self, kind: ListenerKind, action: Action<T>) {
        // Only `all` registrations realize anything, so these cannot fail.
        if let Err(error) = self.shared.register(kind, &self.chain, action) {
            log::warn!("unexpected failure registering {kind:?} listener: {error}");
        }
    }
}

impl<T: Typed + Clone + PartialEq + 'static> DomainObjectCollection<T> {
    /// Live view of the elements whose runtime type is `target` or a subtype.
    ///
    /// Providers whose declared type is incompatible with `target` are never
    /// realized through the view.
    pub fn with_type(&self, target: &'static TypeTag) -> FilteredView<T> {
        FilteredView::new(
            Rc::clone(&self.shared),
            self.chain.then(Filter::Type {
                target,
                tag_of: T::type_tag,
            }),
        )
    }
}

impl<T: Clone + PartialEq + 'static> IntoIterator for &DomainObjectCollection<T> {
    type Item = Result<T, CollectionError>;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for DomainObjectCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.shared.entries.borrow();
        let mut list = f.debug_list();
        for entry in entries.entries() {
            match entry {
                Entry::Realized(entry) => list.entry(&entry.value),
                Entry::Pending(entry) => list.entry(&format_args!(
                    "<pending {}>",
                    entry.declared.map_or("?", TypeTag::name)
                )),
            };
        }
        list.finish()
    }
}
