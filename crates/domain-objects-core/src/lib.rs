#![doc = r"Lazy, order-aware, listener-driven collections for build-time object models.

A [`DomainObjectCollection`] stores elements that are either realized values
or pending [`Provider`]s. Providers are only asked for their value when an
operation needs it, so expensive objects are not built unless something
iterates over them, tests membership, or registers an eager [`all`] listener.

Views created with [`with_type`] and [`matching`] are live projections of the
same entries. A type view uses each provider's declared [`TypeTag`] to leave
incompatible providers untouched.

[`all`]: DomainObjectCollection::all
[`with_type`]: DomainObjectCollection::with_type
[`matching`]: DomainObjectCollection::matching"]

pub mod collections;
mod collection;
mod entry;
mod error;
mod filter;
mod iter;
mod listeners;
pub mod options;
mod provider;
mod type_tag;
mod view;

pub use collection::{DomainObjectCollection, Member};
pub use error::{CollectionError, ProviderError};
pub use iter::Iter;
pub use options::{CollectionOptions, DuplicatePolicy, FailurePolicy};
pub use provider::{Deferred, Provider, ProviderId, ProviderRef};
pub use type_tag::{TypeTag, Typed};
pub use view::FilteredView;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/collection_tests.rs"]
mod collection_tests;

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod view_tests;

#[cfg(test)]
#[path = "tests/listener_tests.rs"]
mod listener_tests;
