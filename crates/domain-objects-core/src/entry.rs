//! Entry store: the canonical sequence of realized and pending entries.
//!
//! Entries live in two ordered sequences. `realized` holds materialized
//! values in the order they became available; `pending` holds providers in
//! registration order. Realizing a pending entry moves it to the end of
//! `realized`, so canonical order is always `realized ++ pending`.
//!
//! Ids are allocated in increasing order, so keying `pending` by id keeps it
//! in registration order and lets a scan resume after the last id it saw.
//!
//! Nothing in here calls out to providers or listeners; the collection drives
//! the transitions and performs dispatch once its borrow is released.

use crate::collections::map::HashSet;
use crate::error::ProviderError;
use crate::provider::{ProviderId, ProviderRef};
use crate::type_tag::TypeTag;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Stable identity of an entry, unchanged by realization.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

pub(crate) enum PendingState {
    Idle,
    /// `get()` is running for this entry further up the stack.
    Realizing,
    Poisoned(ProviderError),
}

pub(crate) struct PendingEntry<T> {
    pub(crate) id: EntryId,
    pub(crate) provider: ProviderRef<T>,
    pub(crate) provider_id: ProviderId,
    pub(crate) declared: Option<&'static TypeTag>,
    pub(crate) state: PendingState,
}

pub(crate) struct RealizedEntry<T> {
    pub(crate) id: EntryId,
    pub(crate) value: T,
    /// The provider this value came from. Retained so the entry can still be
    /// removed by provider identity after realization.
    pub(crate) source: Option<(ProviderId, ProviderRef<T>)>,
}

/// One slot of the canonical order.
pub(crate) enum Entry<'a, T> {
    Pending(&'a PendingEntry<T>),
    Realized(&'a RealizedEntry<T>),
}

/// Result of trying to start realizing a pending entry.
pub(crate) enum Claim<T> {
    Ready(ProviderRef<T>, ProviderId),
    Poisoned(ProviderId, ProviderError),
    /// Already being realized further up the stack.
    Busy,
    Gone,
}

pub(crate) struct EntryStore<T> {
    realized: Vec<RealizedEntry<T>>,
    /// Ids of `realized`, for membership checks by identity.
    realized_ids: HashSet<EntryId>,
    pending: BTreeMap<EntryId, PendingEntry<T>>,
    next_id: u64,
}

impl<T> EntryStore<T> {
    pub(crate) fn new() -> Self {
        Self {
            realized: Vec::new(),
            realized_ids: HashSet::default(),
            pending: BTreeMap::new(),
            next_id: 0,
        }
    }

    fn allocate_id(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn len(&self) -> usize {
        self.realized.len() + self.pending.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.realized.is_empty() && self.pending.is_empty()
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Entries in canonical order.
    pub(crate) fn entries(&self) -> impl Iterator<Item = Entry<'_, T>> {
        self.realized
            .iter()
            .map(Entry::Realized)
            .chain(self.pending.values().map(Entry::Pending))
    }

    pub(crate) fn realized(&self) -> &[RealizedEntry<T>] {
        &self.realized
    }

    /// Pending entries in registration order.
    pub(crate) fn pending(&self) -> impl Iterator<Item = &PendingEntry<T>> {
        self.pending.values()
    }

    /// Pending entries registered after `after`, in registration order.
    pub(crate) fn pending_after(
        &self,
        after: Option<EntryId>,
    ) -> impl Iterator<Item = &PendingEntry<T>> {
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        self.pending
            .range((lower, Bound::Unbounded))
            .map(|(_, entry)| entry)
    }

    pub(crate) fn realized_at(&self, index: usize) -> Option<&RealizedEntry<T>> {
        self.realized.get(index)
    }

    pub(crate) fn contains_realized(&self, id: EntryId) -> bool {
        self.realized_ids.contains(&id)
    }

    fn push_realized_entry(&mut self, entry: RealizedEntry<T>) {
        self.realized_ids.insert(entry.id);
        self.realized.push(entry);
    }

    pub(crate) fn push_realized(
        &mut self,
        value: T,
        source: Option<(ProviderId, ProviderRef<T>)>,
    ) -> EntryId {
        let id = self.allocate_id();
        self.push_realized_entry(RealizedEntry { id, value, source });
        id
    }

    /// Appends a pending entry; `declared` is the provider's declared type,
    /// read by the caller before the store was borrowed.
    pub(crate) fn push_pending(
        &mut self,
        provider: ProviderRef<T>,
        declared: Option<&'static TypeTag>,
    ) -> EntryId {
        let id = self.allocate_id();
        let provider_id = ProviderId::of(&provider);
        self.pending.insert(
            id,
            PendingEntry {
                id,
                provider,
                provider_id,
                declared,
                state: PendingState::Idle,
            },
        );
        id
    }

    /// Marks a pending entry as realizing and hands out its provider.
    pub(crate) fn claim(&mut self, id: EntryId) -> Claim<T> {
        let Some(entry) = self.pending.get_mut(&id) else {
            return Claim::Gone;
        };
        match &entry.state {
            PendingState::Idle => {
                entry.state = PendingState::Realizing;
                Claim::Ready(entry.provider.clone(), entry.provider_id)
            }
            PendingState::Realizing => Claim::Busy,
            PendingState::Poisoned(error) => Claim::Poisoned(entry.provider_id, error.clone()),
        }
    }

    /// Moves a claimed entry to the end of the realized sequence.
    ///
    /// Returns `false` when the entry was removed while its provider ran.
    pub(crate) fn complete(&mut self, id: EntryId, value: T) -> bool {
        let Some(entry) = self.pending.remove(&id) else {
            return false;
        };
        self.push_realized_entry(RealizedEntry {
            id: entry.id,
            value,
            source: Some((entry.provider_id, entry.provider)),
        });
        true
    }

    /// Drops a claimed entry that will not become realized.
    pub(crate) fn discard(&mut self, id: EntryId) {
        self.pending.remove(&id);
    }

    /// Returns a claimed entry to the pending state after its provider failed.
    pub(crate) fn fail(&mut self, id: EntryId, poison: Option<ProviderError>) {
        if let Some(entry) = self.pending.get_mut(&id) {
            entry.state = match poison {
                Some(error) => PendingState::Poisoned(error),
                None => PendingState::Idle,
            };
        }
    }

    fn take_realized(&mut self, index: usize) -> RealizedEntry<T> {
        let entry = self.realized.remove(index);
        self.realized_ids.remove(&entry.id);
        entry
    }

    pub(crate) fn remove_realized(&mut self, id: EntryId) -> Option<(usize, RealizedEntry<T>)> {
        if !self.realized_ids.contains(&id) {
            return None;
        }
        let index = self.realized.iter().position(|entry| entry.id == id)?;
        Some((index, self.take_realized(index)))
    }

    /// Removes the pending entry backed by `provider`, or the realized entry
    /// it produced.
    pub(crate) fn remove_by_provider(&mut self, provider: ProviderId) -> Removed<T> {
        let pending = self
            .pending
            .values()
            .find(|entry| entry.provider_id == provider)
            .map(|entry| entry.id);
        if let Some(id) = pending {
            self.pending.remove(&id);
            return Removed::Pending;
        }
        let realized = self.realized.iter().position(|entry| {
            entry
                .source
                .as_ref()
                .is_some_and(|(source, _)| *source == provider)
        });
        match realized {
            Some(index) => Removed::Realized(self.take_realized(index)),
            None => Removed::Nothing,
        }
    }

    /// Removes every entry selected by the two predicates, returning the
    /// removed realized entries in canonical order and the number of removed
    /// pending entries.
    pub(crate) fn remove_where(
        &mut self,
        mut realized: impl FnMut(&RealizedEntry<T>) -> bool,
        mut pending: impl FnMut(&PendingEntry<T>) -> bool,
    ) -> (Vec<RealizedEntry<T>>, usize) {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.realized.len());
        for entry in self.realized.drain(..) {
            if realized(&entry) {
                self.realized_ids.remove(&entry.id);
                removed.push(entry);
            } else {
                kept.push(entry);
            }
        }
        self.realized = kept;

        let before = self.pending.len();
        self.pending.retain(|_, entry| !pending(entry));
        (removed, before - self.pending.len())
    }

    pub(crate) fn take_all(&mut self) -> (Vec<RealizedEntry<T>>, Vec<PendingEntry<T>>) {
        self.realized_ids.clear();
        (
            std::mem::take(&mut self.realized),
            std::mem::take(&mut self.pending).into_values().collect(),
        )
    }
}

impl<T: PartialEq> EntryStore<T> {
    pub(crate) fn realized_contains(&self, value: &T) -> bool {
        self.realized.iter().any(|entry| entry.value == *value)
    }

    pub(crate) fn remove_realized_value(&mut self, value: &T) -> Option<RealizedEntry<T>> {
        let index = self.realized.iter().position(|entry| entry.value == *value)?;
        Some(self.take_realized(index))
    }
}

pub(crate) enum Removed<T> {
    Pending,
    Realized(RealizedEntry<T>),
    Nothing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Deferred;

    fn pending_ids<T>(store: &EntryStore<T>) -> Vec<EntryId> {
        store.pending().map(|entry| entry.id).collect()
    }

    #[test]
    fn realization_moves_entry_to_realized_tail() {
        let mut store = EntryStore::new();
        let b = store.push_realized("b", None);
        let p1 = store.push_pending(Deferred::of("a").into_ref(), None);
        let p2 = store.push_pending(Deferred::of("d").into_ref(), None);
        let c = store.push_realized("c", None);

        assert!(matches!(store.claim(p1), Claim::Ready(..)));
        assert!(store.complete(p1, "a"));

        let order: Vec<EntryId> = store
            .entries()
            .map(|entry| match entry {
                Entry::Realized(entry) => entry.id,
                Entry::Pending(entry) => entry.id,
            })
            .collect();
        assert_eq!(order, vec![b, c, p1, p2]);
        assert_eq!(store.len(), 4);
        assert_eq!(store.pending_len(), 1);
    }

    #[test]
    fn claimed_entry_reports_busy() {
        let mut store = EntryStore::new();
        let id = store.push_pending(Deferred::of(1).into_ref(), None);
        assert!(matches!(store.claim(id), Claim::Ready(..)));
        assert!(matches!(store.claim(id), Claim::Busy));
        store.fail(id, None);
        assert!(matches!(store.claim(id), Claim::Ready(..)));
    }

    #[test]
    fn poisoned_entry_keeps_its_error() {
        let mut store = EntryStore::new();
        let id = store.push_pending(Deferred::of(1).into_ref(), None);
        let _ = store.claim(id);
        store.fail(id, Some(ProviderError::new("boom")));
        match store.claim(id) {
            Claim::Poisoned(_, error) => assert_eq!(error.message(), "boom"),
            _ => panic!("expected poisoned claim"),
        }
        assert_eq!(pending_ids(&store), vec![id]);
    }

    #[test]
    fn completing_a_removed_entry_is_rejected() {
        let mut store = EntryStore::new();
        let provider = Deferred::of(7).into_ref();
        let id = store.push_pending(provider.clone(), None);
        let _ = store.claim(id);
        assert!(matches!(
            store.remove_by_provider(ProviderId::of(&provider)),
            Removed::Pending
        ));
        assert!(!store.complete(id, 7));
        assert!(store.is_empty());
    }

    #[test]
    fn provider_removal_finds_realized_value() {
        let mut store = EntryStore::new();
        let provider = Deferred::of(3).into_ref();
        let id = store.push_pending(provider.clone(), None);
        let _ = store.claim(id);
        assert!(store.complete(id, 3));
        match store.remove_by_provider(ProviderId::of(&provider)) {
            Removed::Realized(entry) => assert_eq!(entry.value, 3),
            _ => panic!("expected realized removal"),
        }
        assert!(matches!(
            store.remove_by_provider(ProviderId::of(&provider)),
            Removed::Nothing
        ));
    }

    #[test]
    fn pending_scan_resumes_after_the_last_seen_id() {
        let mut store = EntryStore::new();
        let p1 = store.push_pending(Deferred::of(1).into_ref(), None);
        let p2 = store.push_pending(Deferred::of(2).into_ref(), None);
        store.push_realized(9, None);
        let p3 = store.push_pending(Deferred::of(3).into_ref(), None);

        let after_p1: Vec<EntryId> = store.pending_after(Some(p1)).map(|entry| entry.id).collect();
        assert_eq!(after_p1, vec![p2, p3]);
        assert_eq!(store.pending_after(None).count(), 3);
        assert_eq!(store.pending_after(Some(p3)).count(), 0);

        let _ = store.claim(p2);
        assert!(store.complete(p2, 2));
        let after_p1: Vec<EntryId> = store.pending_after(Some(p1)).map(|entry| entry.id).collect();
        assert_eq!(after_p1, vec![p3]);
    }

    #[test]
    fn realized_ids_follow_every_removal_path() {
        let mut store = EntryStore::new();
        let a = store.push_realized("a", None);
        let b = store.push_realized("b", None);
        let c = store.push_realized("c", None);
        assert!(store.contains_realized(a));

        assert!(store.remove_realized_value(&"a").is_some());
        assert!(!store.contains_realized(a));
        assert_eq!(store.remove_realized(b).map(|(index, _)| index), Some(0));
        assert!(store.remove_realized(b).is_none());
        let (removed, _) = store.remove_where(|entry| entry.id == c, |_| false);
        assert_eq!(removed.len(), 1);
        assert!(!store.contains_realized(c));

        let d = store.push_realized("d", None);
        let _ = store.take_all();
        assert!(!store.contains_realized(d));
        assert!(store.is_empty());
    }
}
