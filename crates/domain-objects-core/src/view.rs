//! Live filtered projections of a collection.

use crate::collection::Shared;
use crate::error::CollectionError;
use crate::filter::{ChainRef, Filter};
use crate::iter::Iter;
use crate::listeners::{Action, ListenerKind};
use crate::type_tag::{TypeTag, Typed};
use std::fmt;
use std::rc::Rc;

/// A live, non-copying view of the elements of a collection that pass a type
/// test or predicate.
///
/// Views hold no entries of their own. Additions and removals on the parent
/// are visible immediately, and removals through the view land in the
/// parent. Listeners registered on a view only see elements that pass its
/// filters, and belong to the underlying collection: dropping the view
/// handle does not unregister them.
pub struct FilteredView<T> {
    shared: Rc<Shared<T>>,
    chain: ChainRef<T>,
}

impl<T> Clone for FilteredView<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            chain: Rc::clone(&self.chain),
        }
    }
}

impl<T: Clone + PartialEq + 'static> FilteredView<T> {
    pub(crate) fn new(shared: Rc<Shared<T>>, chain: ChainRef<T>) -> Self {
        Self { shared, chain }
    }

    pub fn iter(&self) -> Iter<T> {
        Iter::new(Rc::clone(&self.shared), Rc::clone(&self.chain))
    }

    pub fn to_vec(&self) -> Result<Vec<T>, CollectionError> {
        self.iter().collect()
    }

    /// Returns false without realizing anything when `value` itself does not
    /// pass the view's filters.
    pub fn contains(&self, value: &T) -> Result<bool, CollectionError> {
        self.shared.contains(&self.chain, value)
    }

    /// Removes `value` from the underlying collection if it is a realized
    /// member of this view.
    pub fn remove(&self, value: &T) -> bool {
        self.shared.remove_value(&self.chain, value)
    }

    /// Number of members. Realizes every entry the filters cannot rule out.
    pub fn len(&self) -> Result<usize, CollectionError> {
        self.iter().try_fold(0, |count, item| item.map(|_| count + 1))
    }

    /// Stops realizing at the first member found.
    pub fn is_empty(&self) -> Result<bool, CollectionError> {
        match self.iter().next() {
            None => Ok(true),
            Some(Ok(_)) => Ok(false),
            Some(Err(error)) => Err(error),
        }
    }

    /// Realized members plus pending entries not ruled out by declared type.
    pub fn estimated_len(&self) -> usize {
        self.shared.estimated_len(&self.chain)
    }

    pub fn realized(&self) -> Vec<T> {
        self.shared.realized_values(&self.chain)
    }

    pub fn matching(&self, predicate: impl Fn(&T) -> bool + 'static) -> FilteredView<T> {
        FilteredView::new(
            Rc::clone(&self.shared),
            self.chain.then(Filter::Predicate(Rc::new(predicate))),
        )
    }

    pub fn find_all(
        &self,
        predicate: impl Fn(&T) -> bool + 'static,
    ) -> Result<Vec<T>, CollectionError> {
        self.matching(predicate).to_vec()
    }

    /// Runs `action` for every member, now and in the future, realizing the
    /// entries this view cannot rule out.
    pub fn all(&self, action: impl Fn(&T) + 'static) -> Result<(), CollectionError> {
        self.shared
            .register(ListenerKind::All, &self.chain, Rc::new(action))
    }

    pub fn configure_each(&self, action: impl Fn(&T) + 'static) {
        self.register_deferred(ListenerKind::ConfigureEach, Rc::new(action));
    }

    pub fn when_object_added(&self, action: impl Fn(&T) + 'static) {
        self.register_deferred(ListenerKind::WhenAdded, Rc::new(action));
    }

    pub fn when_object_removed(&self, action: impl Fn(&T) + 'static) {
        self.register_deferred(ListenerKind::WhenRemoved, Rc::new(action));
    }

    fn register_deferred(&self, kind: ListenerKind, action: Action<T>) {
        if let Err(error) = self.shared.register(kind, &self.chain, action) {
            log::warn!("unexpected failure registering {kind:?} listener: {error}");
        }
    }
}

impl<T: Typed + Clone + PartialEq + 'static> FilteredView<T> {
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

impl<T: Clone + PartialEq + 'static> IntoIterator for &FilteredView<T> {
    type Item = Result<T, CollectionError>;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> fmt::Debug for FilteredView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredView")
            .field("unfiltered", &self.chain.is_unfiltered())
            .finish_non_exhaustive()
    }
}
