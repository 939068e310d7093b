//! Filters that narrow a collection into a view.

use crate::type_tag::TypeTag;
use std::rc::Rc;

pub(crate) type Predicate<T> = Rc<dyn Fn(&T) -> bool>;

pub(crate) enum Filter<T> {
    /// Keeps values whose runtime tag is `target` or one of its subtypes.
    Type {
        target: &'static TypeTag,
        tag_of: fn(&T) -> &'static TypeTag,
    },
    Predicate(Predicate<T>),
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        match self {
            Filter::Type { target, tag_of } => Filter::Type {
                target: *target,
                tag_of: *tag_of,
            },
            Filter::Predicate(predicate) => Filter::Predicate(Rc::clone(predicate)),
        }
    }
}

impl<T> Filter<T> {
    fn accepts(&self, value: &T) -> bool {
        match self {
            Filter::Type { target, tag_of } => tag_of(value).is_subtype_of(target),
            Filter::Predicate(predicate) => predicate(value),
        }
    }

    fn excludes_declared(&self, declared: Option<&'static TypeTag>) -> bool {
        match (self, declared) {
            (Filter::Type { target, .. }, Some(declared)) => !declared.is_compatible_with(target),
            _ => false,
        }
    }
}

/// What a filter chain can tell about a pending entry without realizing it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// The entry can never be a member.
    Excluded,
    /// The entry has to be realized to decide.
    Undecided,
}

/// Conjunction of the filters of a view and all of its ancestors, outermost
/// first.
pub(crate) struct FilterChain<T> {
    filters: Vec<Filter<T>>,
}

pub(crate) type ChainRef<T> = Rc<FilterChain<T>>;

impl<T> FilterChain<T> {
    pub(crate) fn unfiltered() -> ChainRef<T> {
        Rc::new(Self {
            filters: Vec::new(),
        })
    }

    pub(crate) fn then(&self, filter: Filter<T>) -> ChainRef<T> {
        let mut filters = self.filters.clone();
        filters.push(filter);
        Rc::new(Self { filters })
    }

    pub(crate) fn is_unfiltered(&self) -> bool {
        self.filters.is_empty()
    }

    /// Evaluated in chain order, so a type filter guards the predicates of
    /// views derived from it.
    pub(crate) fn accepts(&self, value: &T) -> bool {
        self.filters.iter().all(|filter| filter.accepts(value))
    }

    pub(crate) fn verdict(&self, declared: Option<&'static TypeTag>) -> Verdict {
        if self
            .filters
            .iter()
            .any(|filter| filter.excludes_declared(declared))
        {
            Verdict::Excluded
        } else {
            Verdict::Undecided
        }
    }
}
